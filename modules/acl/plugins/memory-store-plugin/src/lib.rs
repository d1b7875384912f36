//! In-memory [`DataStore`](acl_sdk::DataStore) for the ACL engine.
//!
//! Collections are seeded from [`MemoryStoreConfig`] and queried with a
//! Mongo-style filter subset (see [`domain::filter`]).
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;

pub use config::{IdStrategy, MemoryStoreConfig};
pub use domain::MemoryStore;
