pub mod client;
pub mod filter;
pub mod service;

pub use service::MemoryStore;
