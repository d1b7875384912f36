//! Extension points consulted by the generators.
//!
//! Every hook is an async trait object so implementations may perform I/O.
//! The `fn`-style constructors wrap synchronous closures for the common case:
//!
//! ```ignore
//! let opts = ModelOptions::new()
//!     .with_base_query(Access::List, hooks::base_query(|p| {
//!         if p.has("isAdmin") { json!({}) } else { json!({ "public": true }) }
//!     }))
//!     .with_decorate(hooks::doc_hook(|mut doc, _, _| {
//!         doc.insert("decorated".to_owned(), json!(true));
//!         doc
//!     }));
//! ```

use acl_sdk::{AclError, Document};
use acl_security::{DocPermissions, PermissionSet, QueryScope};
use async_trait::async_trait;
use http::HeaderMap;
use serde_json::{Map, Value};

use crate::domain::context::MiddlewareContext;

/// Row-level filter for one access type.
#[async_trait]
pub trait BaseQuery: Send + Sync {
    async fn scope(&self, permissions: &PermissionSet) -> QueryScope;
}

/// Computes the capability map of a single document.
#[async_trait]
pub trait DocPermissionsHook: Send + Sync {
    async fn compute(
        &self,
        doc: &Document,
        permissions: &PermissionSet,
        context: &MiddlewareContext,
    ) -> DocPermissions;
}

/// Per-document hook used for `decorate`, `prepare` and `transform`.
#[async_trait]
pub trait DocHook: Send + Sync {
    /// # Errors
    ///
    /// Any error aborts the operation and is surfaced to the caller unchanged.
    async fn apply(
        &self,
        doc: Document,
        permissions: &PermissionSet,
        context: &MiddlewareContext,
    ) -> Result<Document, AclError>;
}

/// Hook over a whole result page (`decorateAll`).
#[async_trait]
pub trait CollectionHook: Send + Sync {
    /// # Errors
    ///
    /// Any error aborts the operation and is surfaced to the caller unchanged.
    async fn apply(
        &self,
        docs: Vec<Document>,
        permissions: &PermissionSet,
    ) -> Result<Vec<Document>, AclError>;
}

/// Result of a `validate` hook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    Pass,
    Fail(Vec<String>),
}

impl From<bool> for ValidationOutcome {
    fn from(valid: bool) -> Self {
        if valid { Self::Pass } else { Self::Fail(Vec::new()) }
    }
}

/// An empty list passes; any message fails.
impl From<Vec<String>> for ValidationOutcome {
    fn from(errors: Vec<String>) -> Self {
        if errors.is_empty() {
            Self::Pass
        } else {
            Self::Fail(errors)
        }
    }
}

impl From<Vec<&str>> for ValidationOutcome {
    fn from(errors: Vec<&str>) -> Self {
        errors
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>()
            .into()
    }
}

/// Validates a document before it is persisted.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(
        &self,
        doc: &Document,
        permissions: &PermissionSet,
        context: &MiddlewareContext,
    ) -> ValidationOutcome;
}

/// A fixed outcome applies to every document.
#[async_trait]
impl Validator for ValidationOutcome {
    async fn validate(
        &self,
        _doc: &Document,
        _permissions: &PermissionSet,
        _context: &MiddlewareContext,
    ) -> ValidationOutcome {
        self.clone()
    }
}

/// Maps a route id to a lookup query.
#[async_trait]
pub trait IdentifierQuery: Send + Sync {
    /// # Errors
    ///
    /// Returns [`AclError::Configuration`] if no query object can be produced.
    async fn query(&self, id: &str) -> Result<Map<String, Value>, AclError>;
}

/// Derives the caller's [`PermissionSet`] from the inbound request headers.
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the caller identity cannot be established.
    async fn resolve(&self, headers: &HeaderMap) -> Result<PermissionSet, AclError>;
}

// ── Closure adapters ────────────────────────────────────────────────

struct FnBaseQuery<F>(F);

#[async_trait]
impl<F> BaseQuery for FnBaseQuery<F>
where
    F: Fn(&PermissionSet) -> Value + Send + Sync,
{
    async fn scope(&self, permissions: &PermissionSet) -> QueryScope {
        QueryScope::from_value((self.0)(permissions))
    }
}

/// Base query from a closure returning `false`, `true`, `{}` or a filter object.
#[must_use]
pub fn base_query<F>(f: F) -> impl BaseQuery + 'static
where
    F: Fn(&PermissionSet) -> Value + Send + Sync + 'static,
{
    FnBaseQuery(f)
}

struct FnDocPermissions<F>(F);

#[async_trait]
impl<F> DocPermissionsHook for FnDocPermissions<F>
where
    F: Fn(&Document, &PermissionSet) -> DocPermissions + Send + Sync,
{
    async fn compute(
        &self,
        doc: &Document,
        permissions: &PermissionSet,
        _context: &MiddlewareContext,
    ) -> DocPermissions {
        (self.0)(doc, permissions)
    }
}

#[must_use]
pub fn doc_permissions<F>(f: F) -> impl DocPermissionsHook + 'static
where
    F: Fn(&Document, &PermissionSet) -> DocPermissions + Send + Sync + 'static,
{
    FnDocPermissions(f)
}

struct FnDocHook<F>(F);

#[async_trait]
impl<F> DocHook for FnDocHook<F>
where
    F: Fn(Document, &PermissionSet, &MiddlewareContext) -> Document + Send + Sync,
{
    async fn apply(
        &self,
        doc: Document,
        permissions: &PermissionSet,
        context: &MiddlewareContext,
    ) -> Result<Document, AclError> {
        Ok((self.0)(doc, permissions, context))
    }
}

#[must_use]
pub fn doc_hook<F>(f: F) -> impl DocHook + 'static
where
    F: Fn(Document, &PermissionSet, &MiddlewareContext) -> Document + Send + Sync + 'static,
{
    FnDocHook(f)
}

struct FnCollectionHook<F>(F);

#[async_trait]
impl<F> CollectionHook for FnCollectionHook<F>
where
    F: Fn(Vec<Document>, &PermissionSet) -> Vec<Document> + Send + Sync,
{
    async fn apply(
        &self,
        docs: Vec<Document>,
        permissions: &PermissionSet,
    ) -> Result<Vec<Document>, AclError> {
        Ok((self.0)(docs, permissions))
    }
}

#[must_use]
pub fn collection_hook<F>(f: F) -> impl CollectionHook + 'static
where
    F: Fn(Vec<Document>, &PermissionSet) -> Vec<Document> + Send + Sync + 'static,
{
    FnCollectionHook(f)
}

struct FnValidator<F>(F);

#[async_trait]
impl<F> Validator for FnValidator<F>
where
    F: Fn(&Document, &PermissionSet) -> ValidationOutcome + Send + Sync,
{
    async fn validate(
        &self,
        doc: &Document,
        permissions: &PermissionSet,
        _context: &MiddlewareContext,
    ) -> ValidationOutcome {
        (self.0)(doc, permissions)
    }
}

#[must_use]
pub fn validator<F>(f: F) -> impl Validator + 'static
where
    F: Fn(&Document, &PermissionSet) -> ValidationOutcome + Send + Sync + 'static,
{
    FnValidator(f)
}

struct FnIdentifier<F>(F);

#[async_trait]
impl<F> IdentifierQuery for FnIdentifier<F>
where
    F: Fn(&str) -> Value + Send + Sync,
{
    async fn query(&self, id: &str) -> Result<Map<String, Value>, AclError> {
        match (self.0)(id) {
            Value::Object(query) => Ok(query),
            _ => Err(AclError::configuration(
                "identifier query must produce an object",
            )),
        }
    }
}

/// Identifier lookup from a closure returning a query object.
#[must_use]
pub fn identifier_query<F>(f: F) -> impl IdentifierQuery + 'static
where
    F: Fn(&str) -> Value + Send + Sync + 'static,
{
    FnIdentifier(f)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn closure_base_query_maps_values_to_scopes() {
        let hook = base_query(|p| {
            if p.has("isAdmin") {
                json!({})
            } else if p.has("userId") {
                json!({"_id": p.prop("userId").cloned().unwrap_or_default()})
            } else {
                json!(false)
            }
        });

        let admin = PermissionSet::new().with("isAdmin", true);
        assert!(hook.scope(&admin).await.is_unconstrained());

        let user = PermissionSet::new().with("userId", "u-1");
        assert_eq!(
            hook.scope(&user).await.as_filter(),
            json!({"_id": "u-1"}).as_object()
        );

        assert!(hook.scope(&PermissionSet::new()).await.is_deny());
    }

    #[test]
    fn validation_outcome_from_shapes() {
        assert_eq!(ValidationOutcome::from(true), ValidationOutcome::Pass);
        assert_eq!(
            ValidationOutcome::from(false),
            ValidationOutcome::Fail(vec![])
        );
        assert_eq!(
            ValidationOutcome::from(Vec::<String>::new()),
            ValidationOutcome::Pass
        );
        assert_eq!(
            ValidationOutcome::from(vec!["error1", "error2"]),
            ValidationOutcome::Fail(vec!["error1".to_owned(), "error2".to_owned()])
        );
    }

    #[tokio::test]
    async fn identifier_query_rejects_non_objects() {
        let by_name = identifier_query(|id| json!({"name": id}));
        assert_eq!(
            by_name.query("alice").await.unwrap(),
            json!({"name": "alice"}).as_object().cloned().unwrap()
        );

        let broken = identifier_query(|_| json!("nope"));
        assert!(matches!(
            broken.query("x").await,
            Err(AclError::Configuration(_))
        ));
    }
}
