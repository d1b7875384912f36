//! Document ACL engine.
//!
//! Field- and document-level access control for a document store, with
//! query generation and an axum REST shell:
//!
//! - [`ModelConfigRegistry`] - Per-model permission schemas, base queries,
//!   route guards and hooks
//! - [`RequestContext`] - Per-request permissions plus the query, select,
//!   populate and field generators
//! - [`Controller`] - List, read, create, update, delete, distinct, count
//!   and sub-document operations
//! - [`router`] - REST routes for every registered model
//!
//! ## Usage
//!
//! ```ignore
//! let registry = Arc::new(ModelConfigRegistry::from_config(&cfg));
//! registry.set_model_options("User", user_options())?;
//! let service = Arc::new(AclService::new(registry, store));
//! let app = acl::router(service)?;
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod domain;
pub mod hooks;
pub mod registry;

#[cfg(test)]
mod test_support;

pub use api::rest::router;
pub use config::AclConfig;
pub use domain::context::{MiddlewareContext, RequestContext};
pub use domain::controller::Controller;
pub use domain::generators::{SelectMode, gen_pagination, pick};
pub use domain::service::AclService;
pub use registry::{
    BaseUrl, FieldPermissions, Identifier, ModelConfigRegistry, ModelOption, ModelOptions,
    PermissionSchema, RegistrySnapshot, RootOption, RootOptions,
};
