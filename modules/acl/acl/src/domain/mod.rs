pub mod context;
pub mod controller;
pub mod generators;
pub mod service;
pub mod subdocs;
