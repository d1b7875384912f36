use serde_json::{Map, Value};

/// Logical operator used to conjoin a base query with a caller query.
pub const AND_OPERATOR: &str = "$and";

/// Row-level constraint produced by a base query.
///
/// A scope is either a concrete filter, "no constraint", or the deny sentinel.
/// Deny is distinct from "no constraint": a denied scope must short-circuit the
/// operation before the store is reached.
///
/// # Examples
///
/// ```
/// use acl_security::QueryScope;
/// use serde_json::json;
///
/// // deny-all (default)
/// assert!(QueryScope::default().is_deny());
///
/// // `false` from a base query denies, `true` and `{}` do not constrain
/// assert!(QueryScope::from_value(json!(false)).is_deny());
/// assert!(QueryScope::from_value(json!({})).is_unconstrained());
///
/// // a concrete base query is AND-ed with the caller query
/// let scope = QueryScope::from_value(json!({"public": true}))
///     .and(Some(json!({"name": "a"}).as_object().cloned().unwrap_or_default()));
/// assert_eq!(
///     scope.into_query().map(serde_json::Value::Object),
///     Some(json!({"$and": [{"public": true}, {"name": "a"}]}))
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum QueryScope {
    /// Operation categorically not permitted.
    #[default]
    Deny,
    /// No row-level filtering.
    Unconstrained,
    /// Concrete filter object.
    Filter(Map<String, Value>),
}

impl QueryScope {
    // ── Constructors ────────────────────────────────────────────────

    #[must_use]
    pub fn deny() -> Self {
        Self::Deny
    }

    #[must_use]
    pub fn allow_all() -> Self {
        Self::Unconstrained
    }

    /// Filter scope; an empty filter is unconstrained.
    #[must_use]
    pub fn filter(filter: Map<String, Value>) -> Self {
        if filter.is_empty() {
            Self::Unconstrained
        } else {
            Self::Filter(filter)
        }
    }

    /// Interprets a base-query result value.
    ///
    /// | Value | Scope |
    /// |-------|-------|
    /// | `false` | deny |
    /// | `true`, `null`, `{}` | unconstrained |
    /// | non-empty object | filter |
    /// | anything else | deny (fail-closed) |
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Bool(true) | Value::Null => Self::Unconstrained,
            Value::Object(map) => Self::filter(map),
            Value::Bool(false) | Value::Number(_) | Value::String(_) | Value::Array(_) => {
                Self::Deny
            }
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny)
    }

    #[inline]
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Self::Unconstrained)
    }

    #[inline]
    #[must_use]
    pub fn as_filter(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Filter(filter) => Some(filter),
            Self::Deny | Self::Unconstrained => None,
        }
    }

    // ── Composition ─────────────────────────────────────────────────

    /// Conjoins this scope with an optional caller query.
    ///
    /// - deny stays deny
    /// - unconstrained yields the caller query as-is
    /// - a filter without caller query yields the filter
    /// - otherwise `{"$and": [filter, query]}`
    #[must_use]
    pub fn and(self, query: Option<Map<String, Value>>) -> Self {
        let query = query.filter(|q| !q.is_empty());
        match (self, query) {
            (Self::Deny, _) => Self::Deny,
            (Self::Unconstrained, None) => Self::Unconstrained,
            (Self::Unconstrained, Some(q)) => Self::Filter(q),
            (Self::Filter(base), None) => Self::Filter(base),
            (Self::Filter(base), Some(q)) => {
                let mut and = Map::new();
                and.insert(
                    AND_OPERATOR.to_owned(),
                    Value::Array(vec![Value::Object(base), Value::Object(q)]),
                );
                Self::Filter(and)
            }
        }
    }

    /// Converts into the query handed to the store; `None` means deny.
    #[must_use]
    pub fn into_query(self) -> Option<Map<String, Value>> {
        match self {
            Self::Deny => None,
            Self::Unconstrained => Some(Map::new()),
            Self::Filter(filter) => Some(filter),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn deny_is_default() {
        assert!(QueryScope::default().is_deny());
        assert_eq!(QueryScope::default().into_query(), None);
    }

    #[test]
    fn malformed_values_fail_closed() {
        assert!(QueryScope::from_value(json!("public")).is_deny());
        assert!(QueryScope::from_value(json!([{"a": 1}])).is_deny());
        assert!(QueryScope::from_value(json!(1)).is_deny());
    }

    #[test]
    fn unconstrained_passes_caller_query_through() {
        let scope = QueryScope::allow_all().and(Some(obj(json!({"name": "a"}))));
        assert_eq!(scope.as_filter(), Some(&obj(json!({"name": "a"}))));

        let scope = QueryScope::allow_all().and(None);
        assert_eq!(scope.into_query(), Some(Map::new()));
    }

    #[test]
    fn filter_without_caller_query_is_base_query() {
        let base = obj(json!({"_id": "u-1"}));
        let scope = QueryScope::filter(base.clone()).and(Some(Map::new()));
        assert_eq!(scope.into_query(), Some(base));
    }

    #[test]
    fn deny_absorbs_caller_query() {
        let scope = QueryScope::deny().and(Some(obj(json!({"name": "a"}))));
        assert!(scope.is_deny());
    }
}
