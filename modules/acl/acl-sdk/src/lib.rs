//! ACL SDK
//!
//! This crate provides the public contract of the document ACL engine:
//!
//! - [`DataStore`] - Adapter trait implemented by document store backends
//! - [`FindRequest`], [`FindOneRequest`], [`Populate`] - Store call shapes
//! - [`ListRequest`], [`ReadRequest`], [`ListResult`] - Controller inputs/outputs
//! - [`Projection`] - Caller-supplied field selection
//! - [`Sort`] - Ordered multi-key sort specification
//! - [`AclError`], [`StoreError`] - Error types
//!
//! ## Usage
//!
//! ```ignore
//! use acl_sdk::{DataStore, FindRequest};
//!
//! let docs = store
//!     .find("User", FindRequest::new(query).select(fields).paginate(pagination))
//!     .await?;
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod error;
pub mod models;
pub mod projection;
pub mod sort;

pub use api::DataStore;
pub use error::{AclError, StoreError};
pub use models::{
    CountRequest, CreateInput, DistinctRequest, Document, FindOneRequest, FindRequest, ID_FIELD,
    ListOptions, ListRequest, ListResult, OneOrMany, Pagination, Populate, PopulateSpec,
    ReadOptions, ReadRequest, SubRequest,
};
pub use projection::{FieldSelection, Projection};
pub use sort::{Sort, SortKey};
