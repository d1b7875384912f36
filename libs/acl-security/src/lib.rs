//! Security primitives for the document ACL engine.
//!
//! - [`PermissionSet`] - read-only capability lookup computed once per request
//! - [`DocPermissions`] - per-document capability map produced by `docPermissions`
//! - [`PermissionRule`] / [`RouteGuard`] - field and route level rules
//! - [`QueryScope`] - result of base-query evaluation, including the deny sentinel
//! - [`Access`] / [`GuardKey`] - access types and route guard keys
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod access;
pub mod permission;
pub mod query_scope;
pub mod rule;

pub use access::{Access, AccessParseError, GuardKey};
pub use permission::{DocPermissions, PermissionSet, is_truthy};
pub use query_scope::QueryScope;
pub use rule::{GuardPredicate, PermissionRule, RouteGuard, RulePredicate, resolve_rule};
