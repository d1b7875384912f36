use serde_json::{Map, Value};

/// Prefix of the synthesized per-field edit capabilities (`edit.<field>`).
pub const EDIT_PREFIX: &str = "edit.";

/// Loose truthiness used for permission properties.
///
/// `null`, `false`, `0`, and `""` are falsy; every other value is truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Capability lookup for the caller of a single request.
///
/// Computed once from the caller identity and never mutated afterwards.
/// Besides boolean capabilities (`isAdmin`) it may carry arbitrary named
/// properties (`userId`) that predicate rules and base queries consult.
///
/// # Examples
///
/// ```
/// use acl_security::PermissionSet;
///
/// let perms = PermissionSet::new()
///     .with("isAdmin", false)
///     .with("userId", "u-1");
///
/// assert!(!perms.has("isAdmin"));
/// assert!(perms.has("userId"));
/// assert!(perms.has_any(["isAdmin", "userId"]));
/// assert!(perms.prop("isAdmin").is_some());
/// assert!(perms.prop("missing").is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    properties: Map<String, Value>,
}

impl PermissionSet {
    /// Empty permission set (anonymous caller).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_properties(properties: Map<String, Value>) -> Self {
        Self { properties }
    }

    /// Builds a permission set from a JSON value. Non-objects yield an empty set.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(properties) => Self { properties },
            _ => Self::default(),
        }
    }

    /// Adds a named property.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns `true` if the property exists and is truthy.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.properties.get(key).is_some_and(is_truthy)
    }

    /// Returns `true` if any of the given keys is granted.
    #[must_use]
    pub fn has_any<I, S>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter().any(|k| self.has(k.as_ref()))
    }

    /// Raw property value, if the key is known to this set.
    #[must_use]
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    #[must_use]
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }
}

/// Capability map computed for one document during one operation.
///
/// Keys share the namespace of [`PermissionSet`] keys, so a field rule such
/// as `"edit.name"` is satisfied either by the caller or by the document map.
/// Only an exact `true` grants a key.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DocPermissions {
    entries: Map<String, Value>,
}

impl DocPermissions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a document permission map from a stored value. Non-objects yield an empty map.
    #[must_use]
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(entries)) => Self {
                entries: entries.clone(),
            },
            _ => Self::default(),
        }
    }

    #[must_use]
    pub fn granted(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(Value::Bool(true)))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Marks `edit.<field>` as granted.
    pub fn grant_edit(&mut self, field: &str) {
        self.entries
            .insert(format!("{EDIT_PREFIX}{field}"), Value::Bool(true));
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.entries)
    }
}

impl From<Map<String, Value>> for DocPermissions {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_matches_loose_semantics() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn permission_set_from_non_object_is_empty() {
        let perms = PermissionSet::from_value(json!([1, 2]));
        assert!(perms.properties().is_empty());
    }

    #[test]
    fn has_any_with_no_keys_is_false() {
        let perms = PermissionSet::new().with("isAdmin", true);
        assert!(!perms.has_any(Vec::<String>::new()));
        assert!(perms.has_any(vec!["nope".to_owned(), "isAdmin".to_owned()]));
    }

    #[test]
    fn doc_permissions_only_grant_exact_true() {
        let doc = DocPermissions::from_value(Some(&json!({
            "edit.name": true,
            "edit.role": 1,
            "edit.public": "yes",
        })));
        assert!(doc.granted("edit.name"));
        assert!(!doc.granted("edit.role"));
        assert!(!doc.granted("edit.public"));
        assert!(!doc.granted("edit.orgs"));
    }

    #[test]
    fn grant_edit_synthesizes_prefixed_key() {
        let mut doc = DocPermissions::new();
        doc.grant_edit("name");
        assert!(doc.granted("edit.name"));
        assert_eq!(doc.into_value(), json!({"edit.name": true}));
    }
}
