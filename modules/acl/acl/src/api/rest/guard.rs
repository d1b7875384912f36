use std::collections::HashMap;
use std::sync::Arc;

use acl_sdk::AclError;
use acl_security::GuardKey;
use http::Method;

/// What a matched route operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub model: String,
    /// Route guard key; `None` for unguarded routes such as `/new`.
    pub guard: Option<GuardKey>,
    /// Embedded collection addressed by sub-document routes.
    pub sub: Option<String>,
}

/// Route matcher for one HTTP method.
#[derive(Clone)]
struct RouteMatcher {
    matcher: matchit::Router<RouteTarget>,
}

impl RouteMatcher {
    fn new() -> Self {
        Self {
            matcher: matchit::Router::new(),
        }
    }

    fn insert(&mut self, path: &str, target: RouteTarget) -> Result<(), matchit::InsertError> {
        self.matcher.insert(path, target)
    }

    fn find(&self, path: &str) -> Option<&RouteTarget> {
        self.matcher.at(path).ok().map(|m| m.value)
    }
}

/// Converts `:param` placeholders to the `{param}` syntax used by axum and
/// matchit. An empty path becomes `/`.
#[must_use]
pub fn to_matchit_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_owned();
    }

    let mut result = String::with_capacity(path.len() + 4);
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == ':' {
            result.push('{');
            while matches!(chars.peek(), Some(c) if c.is_alphanumeric() || *c == '_') {
                if let Some(c) = chars.next() {
                    result.push(c);
                }
            }
            result.push('}');
        } else {
            result.push(ch);
        }
    }

    result
}

/// Maps `(method, path)` to the model and guard key of the route.
#[derive(Clone, Default)]
pub struct RoutePolicy {
    matchers: Arc<HashMap<Method, RouteMatcher>>,
}

impl RoutePolicy {
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Option<&RouteTarget> {
        self.matchers
            .get(method)
            .and_then(|matcher| matcher.find(path))
    }
}

/// Collects route targets while routes are built.
#[derive(Default)]
pub struct RoutePolicyBuilder {
    matchers: HashMap<Method, RouteMatcher>,
}

impl RoutePolicyBuilder {
    /// Registers a route given in `:param` syntax.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::Configuration`] if the path conflicts with an
    /// already registered route.
    pub fn insert(
        &mut self,
        method: Method,
        path: &str,
        target: RouteTarget,
    ) -> Result<(), AclError> {
        let matchit_path = to_matchit_path(path);
        self.matchers
            .entry(method.clone())
            .or_insert_with(RouteMatcher::new)
            .insert(&matchit_path, target)
            .map_err(|e| {
                AclError::configuration(format!(
                    "failed to insert route pattern {method} '{path}': {e}"
                ))
            })
    }

    #[must_use]
    pub fn build(self) -> RoutePolicy {
        RoutePolicy {
            matchers: Arc::new(self.matchers),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use acl_security::Access;

    fn target(model: &str, guard: Option<GuardKey>) -> RouteTarget {
        RouteTarget {
            model: model.to_owned(),
            guard,
            sub: None,
        }
    }

    #[test]
    fn converts_params() {
        assert_eq!(to_matchit_path("/users/:id"), "/users/{id}");
        assert_eq!(
            to_matchit_path("/users/:id/statusHistory/:subId"),
            "/users/{id}/statusHistory/{subId}"
        );
        assert_eq!(to_matchit_path("/users/new"), "/users/new");
        assert_eq!(to_matchit_path(""), "/");
    }

    #[test]
    fn static_segments_win_over_params() {
        let mut builder = RoutePolicyBuilder::default();
        builder
            .insert(Method::GET, "/users/new", target("User", None))
            .unwrap();
        builder
            .insert(
                Method::GET,
                "/users/:id",
                target("User", Some(Access::Read.into())),
            )
            .unwrap();
        let policy = builder.build();

        assert_eq!(
            policy.resolve(&Method::GET, "/users/new"),
            Some(&target("User", None))
        );
        assert_eq!(
            policy.resolve(&Method::GET, "/users/42"),
            Some(&target("User", Some(Access::Read.into())))
        );
        assert!(policy.resolve(&Method::PUT, "/users/42").is_none());
        assert!(policy.resolve(&Method::GET, "/orgs/42").is_none());
    }

    #[test]
    fn conflicting_routes_are_configuration_errors() {
        let mut builder = RoutePolicyBuilder::default();
        builder
            .insert(Method::GET, "/users/:id", target("User", None))
            .unwrap();
        let err = builder
            .insert(Method::GET, "/users/:key", target("Member", None))
            .unwrap_err();
        assert!(matches!(err, AclError::Configuration(_)));
    }
}
