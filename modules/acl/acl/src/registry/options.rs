//! Per-model configuration.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use acl_sdk::ID_FIELD;
use acl_security::{Access, GuardKey, PermissionRule, RouteGuard};

use crate::hooks::{
    BaseQuery, CollectionHook, DocHook, DocPermissionsHook, IdentifierQuery, Validator,
};

/// Value registered per access type, with an optional fallback for all
/// access types. An access-specific entry takes precedence.
#[derive(Clone)]
pub struct PerAccess<T, K = Access> {
    default: Option<T>,
    entries: HashMap<K, T>,
}

impl<T, K> Default for PerAccess<T, K> {
    fn default() -> Self {
        Self {
            default: None,
            entries: HashMap::new(),
        }
    }
}

impl<T, K: Eq + Hash> PerAccess<T, K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entry for `key`, or the fallback when `key` is `None`.
    pub fn set(&mut self, key: Option<K>, value: T) {
        match key {
            Some(key) => {
                self.entries.insert(key, value);
            }
            None => self.default = Some(value),
        }
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&T> {
        self.entries.get(key).or(self.default.as_ref())
    }

    fn slot(&mut self, key: Option<K>) -> &mut T
    where
        T: Default,
    {
        match key {
            Some(key) => self.entries.entry(key).or_default(),
            None => self.default.get_or_insert_with(T::default),
        }
    }
}

/// Rules of one schema field.
///
/// A field may carry a single rule for every access type, per-access rules,
/// or both (per-access wins). Array-of-subdocument fields carry a nested
/// schema governing their elements.
#[derive(Clone, Debug, Default)]
pub struct FieldPermissions {
    all: Option<PermissionRule>,
    rules: HashMap<Access, PermissionRule>,
    sub: Option<PermissionSchema>,
}

impl FieldPermissions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single rule applying to every access type.
    #[must_use]
    pub fn all(rule: impl Into<PermissionRule>) -> Self {
        Self {
            all: Some(rule.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn on(mut self, access: Access, rule: impl Into<PermissionRule>) -> Self {
        self.rules.insert(access, rule.into());
        self
    }

    #[must_use]
    pub fn list(self, rule: impl Into<PermissionRule>) -> Self {
        self.on(Access::List, rule)
    }

    #[must_use]
    pub fn read(self, rule: impl Into<PermissionRule>) -> Self {
        self.on(Access::Read, rule)
    }

    #[must_use]
    pub fn create(self, rule: impl Into<PermissionRule>) -> Self {
        self.on(Access::Create, rule)
    }

    #[must_use]
    pub fn update(self, rule: impl Into<PermissionRule>) -> Self {
        self.on(Access::Update, rule)
    }

    /// Declares the field as an embedded collection governed by `schema`.
    #[must_use]
    pub fn sub(mut self, schema: PermissionSchema) -> Self {
        self.sub = Some(schema);
        self
    }

    #[must_use]
    pub fn rule(&self, access: Access) -> Option<&PermissionRule> {
        self.rules.get(&access).or(self.all.as_ref())
    }

    #[must_use]
    pub fn sub_schema(&self) -> Option<&PermissionSchema> {
        self.sub.as_ref()
    }
}

/// Ordered mapping from field name to [`FieldPermissions`].
#[derive(Clone, Debug, Default)]
pub struct PermissionSchema {
    fields: Vec<(String, FieldPermissions)>,
}

impl PermissionSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field, keeping its original position on replace.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, permissions: FieldPermissions) -> Self {
        self.insert(name.into(), permissions);
        self
    }

    pub fn insert(&mut self, name: String, permissions: FieldPermissions) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = permissions,
            None => self.fields.push((name, permissions)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldPermissions> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldPermissions)> {
        self.fields.iter().map(|(n, p)| (n.as_str(), p))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// How a route id is turned into a lookup query.
#[derive(Clone)]
pub enum Identifier {
    /// `{ <field>: id }`
    Field(String),
    Query(Arc<dyn IdentifierQuery>),
}

impl Identifier {
    #[must_use]
    pub fn query(query: impl IdentifierQuery + 'static) -> Self {
        Self::Query(Arc::new(query))
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::Field(ID_FIELD.to_owned())
    }
}

impl From<&str> for Identifier {
    fn from(field: &str) -> Self {
        Self::Field(field.to_owned())
    }
}

/// Collection path under which a model's routes are mounted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BaseUrl {
    /// Pluralised, lower-cased model name (`User` -> `/users`).
    #[default]
    Default,
    /// Routes mounted directly under the API prefix.
    Root,
    Path(String),
}

impl BaseUrl {
    #[must_use]
    pub fn resolve(&self, model: &str) -> String {
        match self {
            Self::Default => format!("/{}", pluralize(&model.to_lowercase())),
            Self::Root => String::new(),
            Self::Path(path) => {
                let path = path.trim_end_matches('/');
                if path.is_empty() || path.starts_with('/') {
                    path.to_owned()
                } else {
                    format!("/{path}")
                }
            }
        }
    }
}

fn pluralize(word: &str) -> String {
    let sibilant = ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s));
    if sibilant {
        return format!("{word}es");
    }
    if let Some(stem) = word.strip_suffix('y')
        && !stem.ends_with(['a', 'e', 'i', 'o', 'u'])
        && !stem.is_empty()
    {
        return format!("{stem}ies");
    }
    format!("{word}s")
}

type DocHooks = Vec<Arc<dyn DocHook>>;
type CollectionHooks = Vec<Arc<dyn CollectionHook>>;

/// Configuration of a single model.
///
/// Built once at startup and registered with the
/// [`ModelConfigRegistry`](super::ModelConfigRegistry):
///
/// ```ignore
/// let user = ModelOptions::new()
///     .with_field("name", FieldPermissions::new().list(true).read(true).update("edit.name"))
///     .with_field("role", FieldPermissions::new().list("isAdmin").read(true))
///     .with_base_query(Access::List, hooks::base_query(|p| json!({ "public": true })))
///     .with_route_guard(Access::Delete, "isAdmin")
///     .with_reference("orgs", "Org");
/// ```
#[derive(Clone, Default)]
pub struct ModelOptions {
    schema: PermissionSchema,
    permission_field: Option<String>,
    permission_fields: Vec<String>,
    base_query: PerAccess<Arc<dyn BaseQuery>>,
    route_guard: PerAccess<RouteGuard, GuardKey>,
    doc_permissions: PerAccess<Arc<dyn DocPermissionsHook>>,
    decorate: PerAccess<DocHooks>,
    decorate_all: PerAccess<CollectionHooks>,
    prepare: PerAccess<DocHooks>,
    transform: PerAccess<DocHooks>,
    validate: PerAccess<Arc<dyn Validator>>,
    identifier: Identifier,
    list_hard_limit: Option<u64>,
    references: HashMap<String, String>,
    base_url: BaseUrl,
}

impl ModelOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Builders ────────────────────────────────────────────────────

    #[must_use]
    pub fn with_schema(mut self, schema: PermissionSchema) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, permissions: FieldPermissions) -> Self {
        self.schema.insert(name.into(), permissions);
        self
    }

    #[must_use]
    pub fn with_permission_field(mut self, field: impl Into<String>) -> Self {
        self.permission_field = Some(field.into());
        self
    }

    /// Extra output fields that are always selected.
    #[must_use]
    pub fn with_permission_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permission_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_base_query(mut self, access: Access, query: impl BaseQuery + 'static) -> Self {
        self.base_query.set(Some(access), Arc::new(query));
        self
    }

    /// Base query applied to every access type without a specific one.
    #[must_use]
    pub fn with_default_base_query(mut self, query: impl BaseQuery + 'static) -> Self {
        self.base_query.set(None, Arc::new(query));
        self
    }

    #[must_use]
    pub fn with_route_guard(mut self, key: impl Into<GuardKey>, guard: impl Into<RouteGuard>) -> Self {
        self.route_guard.set(Some(key.into()), guard.into());
        self
    }

    #[must_use]
    pub fn with_default_route_guard(mut self, guard: impl Into<RouteGuard>) -> Self {
        self.route_guard.set(None, guard.into());
        self
    }

    #[must_use]
    pub fn with_doc_permissions(mut self, hook: impl DocPermissionsHook + 'static) -> Self {
        self.doc_permissions.set(None, Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_doc_permissions_for(
        mut self,
        access: Access,
        hook: impl DocPermissionsHook + 'static,
    ) -> Self {
        self.doc_permissions.set(Some(access), Arc::new(hook));
        self
    }

    /// Appends a decorator run for every access type without its own list.
    #[must_use]
    pub fn with_decorate(mut self, hook: impl DocHook + 'static) -> Self {
        self.decorate.slot(None).push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_decorate_for(mut self, access: Access, hook: impl DocHook + 'static) -> Self {
        self.decorate.slot(Some(access)).push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_decorate_all(mut self, hook: impl CollectionHook + 'static) -> Self {
        self.decorate_all.slot(None).push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_decorate_all_for(
        mut self,
        access: Access,
        hook: impl CollectionHook + 'static,
    ) -> Self {
        self.decorate_all.slot(Some(access)).push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_prepare(mut self, hook: impl DocHook + 'static) -> Self {
        self.prepare.slot(None).push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_prepare_for(mut self, access: Access, hook: impl DocHook + 'static) -> Self {
        self.prepare.slot(Some(access)).push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_transform(mut self, hook: impl DocHook + 'static) -> Self {
        self.transform.slot(None).push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_transform_for(mut self, access: Access, hook: impl DocHook + 'static) -> Self {
        self.transform.slot(Some(access)).push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn with_validate(mut self, validator: impl Validator + 'static) -> Self {
        self.validate.set(None, Arc::new(validator));
        self
    }

    #[must_use]
    pub fn with_validate_for(mut self, access: Access, validator: impl Validator + 'static) -> Self {
        self.validate.set(Some(access), Arc::new(validator));
        self
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<Identifier>) -> Self {
        self.identifier = identifier.into();
        self
    }

    #[must_use]
    pub fn with_list_hard_limit(mut self, limit: u64) -> Self {
        self.list_hard_limit = Some(limit);
        self
    }

    /// Declares that `path` references documents of `model`.
    #[must_use]
    pub fn with_reference(mut self, path: impl Into<String>, model: impl Into<String>) -> Self {
        self.references.insert(path.into(), model.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: BaseUrl) -> Self {
        self.base_url = base_url;
        self
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[must_use]
    pub fn schema(&self) -> &PermissionSchema {
        &self.schema
    }

    /// Model-level permission field override.
    #[must_use]
    pub fn permission_field(&self) -> Option<&str> {
        self.permission_field.as_deref()
    }

    #[must_use]
    pub fn permission_fields(&self) -> &[String] {
        &self.permission_fields
    }

    #[must_use]
    pub fn base_query(&self, access: Access) -> Option<&Arc<dyn BaseQuery>> {
        self.base_query.get(&access)
    }

    #[must_use]
    pub fn route_guard(&self, key: &GuardKey) -> Option<&RouteGuard> {
        self.route_guard.get(key)
    }

    #[must_use]
    pub fn doc_permissions(&self, access: Access) -> Option<&Arc<dyn DocPermissionsHook>> {
        self.doc_permissions.get(&access)
    }

    #[must_use]
    pub fn decorate(&self, access: Access) -> &[Arc<dyn DocHook>] {
        self.decorate.get(&access).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn decorate_all(&self, access: Access) -> &[Arc<dyn CollectionHook>] {
        self.decorate_all.get(&access).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn prepare(&self, access: Access) -> &[Arc<dyn DocHook>] {
        self.prepare.get(&access).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn transform(&self, access: Access) -> &[Arc<dyn DocHook>] {
        self.transform.get(&access).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn validator(&self, access: Access) -> Option<&Arc<dyn Validator>> {
        self.validate.get(&access)
    }

    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    #[must_use]
    pub fn list_hard_limit(&self) -> Option<u64> {
        self.list_hard_limit
    }

    #[must_use]
    pub fn reference(&self, path: &str) -> Option<&str> {
        self.references.get(path).map(String::as_str)
    }

    #[must_use]
    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Fields holding embedded collections, in schema order.
    pub fn sub_paths(&self) -> impl Iterator<Item = &str> {
        self.schema
            .iter()
            .filter(|(_, p)| p.sub_schema().is_some())
            .map(|(name, _)| name)
    }
}

/// A single option replaced on an already registered model.
pub enum ModelOption {
    Schema(PermissionSchema),
    PermissionField(String),
    PermissionFields(Vec<String>),
    /// `None` targets the fallback for all access types.
    BaseQuery(Option<Access>, Arc<dyn BaseQuery>),
    RouteGuard(Option<GuardKey>, RouteGuard),
    DocPermissions(Option<Access>, Arc<dyn DocPermissionsHook>),
    Decorate(Option<Access>, Vec<Arc<dyn DocHook>>),
    DecorateAll(Option<Access>, Vec<Arc<dyn CollectionHook>>),
    Prepare(Option<Access>, Vec<Arc<dyn DocHook>>),
    Transform(Option<Access>, Vec<Arc<dyn DocHook>>),
    Validate(Option<Access>, Arc<dyn Validator>),
    Identifier(Identifier),
    ListHardLimit(u64),
    Reference { path: String, model: String },
    BaseUrl(BaseUrl),
}

impl ModelOption {
    /// Name of the option, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Schema(_) => "permissionSchema",
            Self::PermissionField(_) => "permissionField",
            Self::PermissionFields(_) => "permissionFields",
            Self::BaseQuery(..) => "baseQuery",
            Self::RouteGuard(..) => "routeGuard",
            Self::DocPermissions(..) => "docPermissions",
            Self::Decorate(..) => "decorate",
            Self::DecorateAll(..) => "decorateAll",
            Self::Prepare(..) => "prepare",
            Self::Transform(..) => "transform",
            Self::Validate(..) => "validate",
            Self::Identifier(_) => "identifier",
            Self::ListHardLimit(_) => "listHardLimit",
            Self::Reference { .. } => "reference",
            Self::BaseUrl(_) => "baseUrl",
        }
    }

    pub(crate) fn apply(self, options: &mut ModelOptions) {
        match self {
            Self::Schema(schema) => options.schema = schema,
            Self::PermissionField(field) => options.permission_field = Some(field),
            Self::PermissionFields(fields) => options.permission_fields = fields,
            Self::BaseQuery(access, query) => options.base_query.set(access, query),
            Self::RouteGuard(key, guard) => options.route_guard.set(key, guard),
            Self::DocPermissions(access, hook) => options.doc_permissions.set(access, hook),
            Self::Decorate(access, hooks) => options.decorate.set(access, hooks),
            Self::DecorateAll(access, hooks) => options.decorate_all.set(access, hooks),
            Self::Prepare(access, hooks) => options.prepare.set(access, hooks),
            Self::Transform(access, hooks) => options.transform.set(access, hooks),
            Self::Validate(access, validator) => options.validate.set(access, validator),
            Self::Identifier(identifier) => options.identifier = identifier,
            Self::ListHardLimit(limit) => options.list_hard_limit = Some(limit),
            Self::Reference { path, model } => {
                options.references.insert(path, model);
            }
            Self::BaseUrl(base_url) => options.base_url = base_url,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn per_access_entry_wins_over_fallback() {
        let mut guards: PerAccess<RouteGuard, GuardKey> = PerAccess::new();
        guards.set(None, RouteGuard::from(true));
        guards.set(Some(GuardKey::from(Access::Delete)), RouteGuard::from("isAdmin"));

        assert!(matches!(
            guards.get(&Access::Delete.into()),
            Some(RouteGuard::Key(k)) if k == "isAdmin"
        ));
        assert!(matches!(
            guards.get(&GuardKey::sub("statusHistory", Access::List)),
            Some(RouteGuard::Always(true))
        ));
    }

    #[test]
    fn field_rule_falls_back_to_all_access_rule() {
        let field = FieldPermissions::all("isAdmin").list(true);
        assert!(matches!(field.rule(Access::List), Some(PermissionRule::Always(true))));
        assert!(matches!(
            field.rule(Access::Update),
            Some(PermissionRule::Key(k)) if k == "isAdmin"
        ));
        assert!(FieldPermissions::new().rule(Access::Read).is_none());
    }

    #[test]
    fn schema_replace_keeps_position() {
        let schema = PermissionSchema::new()
            .field("name", FieldPermissions::all(true))
            .field("role", FieldPermissions::all(false))
            .field("name", FieldPermissions::all(false));
        let names: Vec<&str> = schema.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["name", "role"]);
    }

    #[test]
    fn base_url_policies() {
        assert_eq!(BaseUrl::Default.resolve("User"), "/users");
        assert_eq!(BaseUrl::Default.resolve("Address"), "/addresses");
        assert_eq!(BaseUrl::Default.resolve("Policy"), "/policies");
        assert_eq!(BaseUrl::Default.resolve("Key"), "/keys");
        assert_eq!(BaseUrl::Root.resolve("User"), "");
        assert_eq!(BaseUrl::Path("people/".to_owned()).resolve("User"), "/people");
    }

    #[test]
    fn sub_paths_come_from_nested_schemas() {
        let opts = ModelOptions::new()
            .with_field("name", FieldPermissions::all(true))
            .with_field(
                "statusHistory",
                FieldPermissions::all(true).sub(
                    PermissionSchema::new().field("name", FieldPermissions::all(true)),
                ),
            );
        assert_eq!(opts.sub_paths().collect::<Vec<_>>(), vec!["statusHistory"]);
    }

    #[test]
    fn model_option_replaces_value() {
        let mut opts = ModelOptions::new().with_list_hard_limit(10);
        let option = ModelOption::ListHardLimit(5);
        assert_eq!(option.name(), "listHardLimit");
        option.apply(&mut opts);
        assert_eq!(opts.list_hard_limit(), Some(5));
    }
}
