//! Field-level permission rules and route guards.
//!
//! ## Resolution
//!
//! | Rule | Result |
//! |------|--------|
//! | `Always(b)` | `b` |
//! | `Key(k)` | `permissions.has(k) \|\| doc_permissions[k] == true` |
//! | `Predicate(p)` | `p.evaluate(permissions, doc_permissions).await` |
//!
//! Route guards additionally accept `AnyOf(keys)`, granted when the caller
//! holds any of the keys. A missing guard denies.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::permission::{DocPermissions, PermissionSet};

/// Asynchronous predicate over the caller and the document capability map.
#[async_trait]
pub trait RulePredicate: Send + Sync {
    async fn evaluate(&self, permissions: &PermissionSet, doc: &DocPermissions) -> bool;
}

/// Asynchronous predicate over the caller only (route guards).
#[async_trait]
pub trait GuardPredicate: Send + Sync {
    async fn allows(&self, permissions: &PermissionSet) -> bool;
}

struct FnRule<F>(F);

#[async_trait]
impl<F> RulePredicate for FnRule<F>
where
    F: Fn(&PermissionSet, &DocPermissions) -> bool + Send + Sync,
{
    async fn evaluate(&self, permissions: &PermissionSet, doc: &DocPermissions) -> bool {
        (self.0)(permissions, doc)
    }
}

struct FnGuard<F>(F);

#[async_trait]
impl<F> GuardPredicate for FnGuard<F>
where
    F: Fn(&PermissionSet) -> bool + Send + Sync,
{
    async fn allows(&self, permissions: &PermissionSet) -> bool {
        (self.0)(permissions)
    }
}

/// A single permission rule attached to a field for one or all access types.
#[derive(Clone)]
pub enum PermissionRule {
    Always(bool),
    Key(String),
    Predicate(Arc<dyn RulePredicate>),
}

impl PermissionRule {
    /// Rule backed by a synchronous closure.
    #[must_use]
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&PermissionSet, &DocPermissions) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(FnRule(f)))
    }

    /// Rule backed by an asynchronous predicate implementation.
    #[must_use]
    pub fn predicate_async(predicate: impl RulePredicate + 'static) -> Self {
        Self::Predicate(Arc::new(predicate))
    }

    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    #[must_use]
    pub fn is_predicate(&self) -> bool {
        matches!(self, Self::Predicate(_))
    }

    /// Evaluates the rule for the caller and the document capability map.
    pub async fn resolve(&self, permissions: &PermissionSet, doc: &DocPermissions) -> bool {
        match self {
            Self::Always(allowed) => *allowed,
            Self::Key(key) => permissions.has(key) || doc.granted(key),
            Self::Predicate(predicate) => predicate.evaluate(permissions, doc).await,
        }
    }
}

impl fmt::Debug for PermissionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always(b) => f.debug_tuple("Always").field(b).finish(),
            Self::Key(k) => f.debug_tuple("Key").field(k).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<bool> for PermissionRule {
    fn from(value: bool) -> Self {
        Self::Always(value)
    }
}

impl From<&str> for PermissionRule {
    fn from(value: &str) -> Self {
        Self::Key(value.to_owned())
    }
}

impl From<String> for PermissionRule {
    fn from(value: String) -> Self {
        Self::Key(value)
    }
}

/// Resolves an optional rule; absence denies.
pub async fn resolve_rule(
    rule: Option<&PermissionRule>,
    permissions: &PermissionSet,
    doc: &DocPermissions,
) -> bool {
    match rule {
        Some(rule) => rule.resolve(permissions, doc).await,
        None => false,
    }
}

/// Route-level gate evaluated before any document logic runs.
#[derive(Clone)]
pub enum RouteGuard {
    Always(bool),
    Key(String),
    AnyOf(Vec<String>),
    Predicate(Arc<dyn GuardPredicate>),
}

impl RouteGuard {
    #[must_use]
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&PermissionSet) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(FnGuard(f)))
    }

    #[must_use]
    pub fn predicate_async(predicate: impl GuardPredicate + 'static) -> Self {
        Self::Predicate(Arc::new(predicate))
    }

    #[must_use]
    pub fn any_of<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf(keys.into_iter().map(Into::into).collect())
    }

    pub async fn is_allowed(&self, permissions: &PermissionSet) -> bool {
        match self {
            Self::Always(allowed) => *allowed,
            Self::Key(key) => permissions.has(key),
            Self::AnyOf(keys) => permissions.has_any(keys),
            Self::Predicate(predicate) => predicate.allows(permissions).await,
        }
    }
}

impl fmt::Debug for RouteGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always(b) => f.debug_tuple("Always").field(b).finish(),
            Self::Key(k) => f.debug_tuple("Key").field(k).finish(),
            Self::AnyOf(keys) => f.debug_tuple("AnyOf").field(keys).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<bool> for RouteGuard {
    fn from(value: bool) -> Self {
        Self::Always(value)
    }
}

impl From<&str> for RouteGuard {
    fn from(value: &str) -> Self {
        Self::Key(value.to_owned())
    }
}

impl From<Vec<&str>> for RouteGuard {
    fn from(value: Vec<&str>) -> Self {
        Self::any_of(value)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    struct SlowAdmin;

    #[async_trait]
    impl RulePredicate for SlowAdmin {
        async fn evaluate(&self, permissions: &PermissionSet, _doc: &DocPermissions) -> bool {
            tokio::task::yield_now().await;
            permissions.has("isAdmin")
        }
    }

    fn admin() -> PermissionSet {
        PermissionSet::new().with("isAdmin", true).with("userId", "u-1")
    }

    fn user() -> PermissionSet {
        PermissionSet::new().with("isAdmin", false).with("userId", "u-2")
    }

    #[tokio::test]
    async fn boolean_rule_is_returned_directly() {
        let doc = DocPermissions::new();
        assert!(PermissionRule::from(true).resolve(&user(), &doc).await);
        assert!(!PermissionRule::from(false).resolve(&admin(), &doc).await);
    }

    #[tokio::test]
    async fn key_rule_checks_caller_then_document() {
        let rule = PermissionRule::key("edit.name");
        let empty = DocPermissions::new();
        let granted = DocPermissions::new().with("edit.name", true);

        assert!(!rule.resolve(&user(), &empty).await);
        assert!(rule.resolve(&user(), &granted).await);

        let global = PermissionSet::new().with("edit.name", true);
        assert!(rule.resolve(&global, &empty).await);
    }

    #[tokio::test]
    async fn predicate_rules_see_both_maps() {
        let rule = PermissionRule::predicate(|p, d| p.has("isAdmin") || d.granted("owner"));
        assert!(rule.resolve(&admin(), &DocPermissions::new()).await);
        assert!(
            rule.resolve(&user(), &DocPermissions::new().with("owner", true))
                .await
        );
        assert!(!rule.resolve(&user(), &DocPermissions::new()).await);
    }

    #[tokio::test]
    async fn async_predicate_is_awaited() {
        let rule = PermissionRule::predicate_async(SlowAdmin);
        assert!(rule.is_predicate());
        assert!(rule.resolve(&admin(), &DocPermissions::new()).await);
        assert!(!rule.resolve(&user(), &DocPermissions::new()).await);
    }

    #[tokio::test]
    async fn missing_rule_denies() {
        assert!(!resolve_rule(None, &admin(), &DocPermissions::new()).await);
    }

    #[tokio::test]
    async fn route_guard_shapes() {
        assert!(RouteGuard::from(true).is_allowed(&user()).await);
        assert!(!RouteGuard::from("isAdmin").is_allowed(&user()).await);
        assert!(RouteGuard::from("isAdmin").is_allowed(&admin()).await);
        assert!(
            RouteGuard::from(vec!["isAdmin", "userId"])
                .is_allowed(&user())
                .await
        );
        assert!(
            !RouteGuard::any_of(Vec::<String>::new())
                .is_allowed(&admin())
                .await
        );
        let guard = RouteGuard::predicate(|p| p.prop("userId").is_some());
        assert!(guard.is_allowed(&user()).await);
        assert!(!guard.is_allowed(&PermissionSet::new()).await);
    }
}
