use acl_security::Access;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::projection::Projection;
use crate::sort::Sort;

/// A stored document.
pub type Document = Map<String, Value>;

/// Identifier field of every document and embedded sub-document.
pub const ID_FIELD: &str = "_id";

/// A value given either alone or as a list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    #[must_use]
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

// ── Store call shapes ───────────────────────────────────────────────

/// Resolved populate descriptor handed to the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Populate {
    /// Reference path on the parent document.
    pub path: String,
    /// Referenced model name.
    pub model: String,
    /// Fields of the referenced documents to keep (empty keeps all).
    pub select: Vec<String>,
    /// Filter the referenced documents must match.
    #[serde(rename = "match")]
    pub filter: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindRequest {
    pub query: Map<String, Value>,
    pub select: Vec<String>,
    pub sort: Option<Sort>,
    pub populate: Vec<Populate>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

impl FindRequest {
    #[must_use]
    pub fn new(query: Map<String, Value>) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn select(mut self, select: Vec<String>) -> Self {
        self.select = select;
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: Option<Sort>) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn populate(mut self, populate: Vec<Populate>) -> Self {
        self.populate = populate;
        self
    }

    #[must_use]
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.limit = Some(pagination.limit);
        self.skip = pagination.skip;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOneRequest {
    pub query: Map<String, Value>,
    pub select: Vec<String>,
    pub populate: Vec<Populate>,
}

impl FindOneRequest {
    #[must_use]
    pub fn new(query: Map<String, Value>) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn select(mut self, select: Vec<String>) -> Self {
        self.select = select;
        self
    }

    #[must_use]
    pub fn populate(mut self, populate: Vec<Populate>) -> Self {
        self.populate = populate;
        self
    }
}

/// Limit and offset for a list call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
}

// ── Controller inputs ───────────────────────────────────────────────

/// Caller-supplied populate entry: a bare path or a detailed descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PopulateSpec {
    Path(String),
    Detailed {
        path: String,
        #[serde(default)]
        select: Option<Projection>,
        #[serde(default)]
        access: Option<Access>,
    },
}

impl PopulateSpec {
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Path(path) | Self::Detailed { path, .. } => path,
        }
    }
}

impl From<&str> for PopulateSpec {
    fn from(path: &str) -> Self {
        Self::Path(path.to_owned())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListOptions {
    pub include_permissions: bool,
    pub include_count: bool,
    pub populate_access: Access,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            include_permissions: true,
            include_count: false,
            populate_access: Access::Read,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ListRequest {
    pub query: Option<Map<String, Value>>,
    pub select: Option<Projection>,
    pub sort: Option<Sort>,
    pub populate: Option<OneOrMany<PopulateSpec>>,
    #[serde(deserialize_with = "lenient_u64")]
    pub limit: Option<u64>,
    #[serde(deserialize_with = "lenient_u64")]
    pub page: Option<u64>,
    pub options: ListOptions,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadOptions {
    pub include_permissions: bool,
    pub try_list: bool,
    pub populate_access: Access,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            include_permissions: true,
            try_list: true,
            populate_access: Access::Read,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReadRequest {
    pub select: Option<Projection>,
    pub populate: Option<OneOrMany<PopulateSpec>>,
    pub options: ReadOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CountRequest {
    pub query: Option<Map<String, Value>>,
    pub access: Option<Access>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DistinctRequest {
    pub query: Option<Map<String, Value>>,
}

/// Body of sub-document list/read queries.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SubRequest {
    pub select: Option<Projection>,
}

/// Create body: a single document or a batch.
pub type CreateInput = OneOrMany<Document>;

// ── Controller outputs ──────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListResult {
    Rows(Vec<Document>),
    Counted { count: u64, rows: Vec<Document> },
}

impl ListResult {
    #[must_use]
    pub fn rows(&self) -> &[Document] {
        match self {
            Self::Rows(rows) | Self::Counted { rows, .. } => rows,
        }
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Document> {
        match self {
            Self::Rows(rows) | Self::Counted { rows, .. } => rows,
        }
    }
}

/// Accepts a number or a numeric string; anything else is treated as absent.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_request_defaults() {
        let req: ListRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req.options, ListOptions::default());
        assert!(req.options.include_permissions);
        assert!(!req.options.include_count);
        assert_eq!(req.options.populate_access, Access::Read);
    }

    #[test]
    fn list_request_parses_body_shape() {
        let req: ListRequest = serde_json::from_value(json!({
            "query": {"public": true},
            "select": "name role",
            "sort": {"name": 1},
            "populate": [{"path": "orgs", "select": ["name"], "access": "list"}, "owner"],
            "limit": "10",
            "page": 2,
            "options": {"includePermissions": false, "includeCount": true, "populateAccess": "list"}
        }))
        .unwrap();

        assert_eq!(req.limit, Some(10));
        assert_eq!(req.page, Some(2));
        assert!(req.options.include_count);
        assert!(!req.options.include_permissions);
        let populate = req.populate.unwrap().into_vec();
        assert_eq!(populate.len(), 2);
        assert_eq!(populate[0].path(), "orgs");
        assert_eq!(populate[1], PopulateSpec::from("owner"));
    }

    #[test]
    fn non_numeric_limit_is_absent() {
        let req: ListRequest = serde_json::from_value(json!({"limit": "lots"})).unwrap();
        assert_eq!(req.limit, None);
    }

    #[test]
    fn create_input_accepts_object_or_array() {
        let one: CreateInput = serde_json::from_value(json!({"name": "a"})).unwrap();
        assert!(!one.is_many());
        let many: CreateInput = serde_json::from_value(json!([{"name": "a"}, {"name": "b"}])).unwrap();
        assert!(many.is_many());
        assert_eq!(many.into_vec().len(), 2);
    }

    #[test]
    fn counted_list_result_serializes_with_count() {
        let result = ListResult::Counted {
            count: 3,
            rows: vec![],
        };
        assert_eq!(
            serde_json::to_value(result).unwrap(),
            json!({"count": 3, "rows": []})
        );
    }
}
