//! Request-scoped generators.
//!
//! Every generator consults the caller's [`PermissionSet`] and the registry
//! snapshot held by [`RequestContext`]. Policy decisions never produce
//! errors: a denied base query is reported as [`QueryScope::Deny`], a
//! forbidden field is simply left out.

use std::sync::Arc;

use acl_sdk::{
    AclError, Document, ID_FIELD, OneOrMany, Pagination, Populate, PopulateSpec, Projection,
};
use acl_security::{
    Access, DocPermissions, GuardKey, PermissionRule, PermissionSet, QueryScope, resolve_rule,
};
use futures::future::{join_all, try_join_all};
use serde_json::{Map, Value};

use crate::domain::context::{MiddlewareContext, RequestContext};
use crate::hooks::{CollectionHook, DocHook, ValidationOutcome};
use crate::registry::{Identifier, PermissionSchema};

/// How `PermissionKey` rules are treated when building a selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectMode {
    /// A key rule selects its field only when the caller holds the key.
    #[default]
    Checked,
    /// As `Checked`, but key rules are also selected when the model computes
    /// document permissions, since the document may grant the key. Only for
    /// results that are picked per document afterwards.
    Picked,
    /// A key unknown to the caller's permission set selects its field;
    /// a known key must be held. Used for populate at default read access.
    Relaxed,
}

/// Limit and offset for a list call.
///
/// A missing or zero `limit` becomes `hard_limit`; larger values are clamped
/// to it. Pages are 1-based.
#[must_use]
pub fn gen_pagination(limit: Option<u64>, page: Option<u64>, hard_limit: u64) -> Pagination {
    let limit = limit
        .filter(|l| *l > 0)
        .map_or(hard_limit, |l| l.min(hard_limit));
    let page = page.unwrap_or(1);
    let skip = (page > 1).then(|| (page - 1).saturating_mul(limit));
    Pagination { limit, skip }
}

/// Copies the listed fields of `doc`.
#[must_use]
pub fn pick(doc: &Document, fields: &[String]) -> Document {
    fields
        .iter()
        .filter_map(|f| doc.get(f).map(|v| (f.clone(), v.clone())))
        .collect()
}

/// Fields of `schema` whose `access` rule resolves to true, after `base_fields`.
pub(crate) async fn allowed_in_schema(
    schema: &PermissionSchema,
    access: Access,
    permissions: &PermissionSet,
    doc_permissions: &DocPermissions,
    base_fields: &[String],
) -> Vec<String> {
    let candidates: Vec<(&str, Option<&PermissionRule>)> = schema
        .iter()
        .filter(|(name, _)| !base_fields.iter().any(|b| b == name))
        .map(|(name, field)| (name, field.rule(access)))
        .collect();

    let decisions = join_all(
        candidates
            .iter()
            .map(|(_, rule)| resolve_rule(*rule, permissions, doc_permissions)),
    )
    .await;

    let mut fields = base_fields.to_vec();
    fields.extend(
        candidates
            .into_iter()
            .zip(decisions)
            .filter(|(_, allowed)| *allowed)
            .map(|((name, _), _)| name.to_owned()),
    );
    fields
}

async fn run_doc_hooks(
    hooks: &[Arc<dyn DocHook>],
    mut doc: Document,
    permissions: &PermissionSet,
    context: &MiddlewareContext,
) -> Result<Document, AclError> {
    for hook in hooks {
        doc = hook.apply(doc, permissions, context).await?;
    }
    Ok(doc)
}

async fn run_collection_hooks(
    hooks: &[Arc<dyn CollectionHook>],
    mut docs: Vec<Document>,
    permissions: &PermissionSet,
) -> Result<Vec<Document>, AclError> {
    for hook in hooks {
        docs = hook.apply(docs, permissions).await?;
    }
    Ok(docs)
}

fn selectable(
    rule: Option<&PermissionRule>,
    permissions: &PermissionSet,
    mode: SelectMode,
    doc_scoped: bool,
) -> bool {
    match rule {
        None => false,
        Some(PermissionRule::Always(allowed)) => *allowed,
        Some(PermissionRule::Key(key)) => match mode {
            SelectMode::Checked => permissions.has(key),
            SelectMode::Picked => doc_scoped || permissions.has(key),
            SelectMode::Relaxed => permissions.prop(key).is_none() || permissions.has(key),
        },
        // needs the document, re-checked when fields are picked
        Some(PermissionRule::Predicate(_)) => true,
    }
}

impl RequestContext {
    /// Lookup query for a route id.
    ///
    /// # Errors
    ///
    /// - `UnknownModel` if the model is not registered
    /// - `Configuration` if a custom identifier yields no query object
    pub async fn gen_id_query(&self, model: &str, id: &str) -> Result<Map<String, Value>, AclError> {
        match self.options(model)?.identifier() {
            Identifier::Field(field) => {
                let mut query = Map::new();
                query.insert(field.clone(), Value::String(id.to_owned()));
                Ok(query)
            }
            Identifier::Query(identifier) => identifier.query(id).await,
        }
    }

    /// Composes the model's base query for `access` with the caller query.
    ///
    /// This is the only path by which queries reach the store.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownModel`] if the model is not registered.
    pub async fn gen_query(
        &self,
        model: &str,
        access: Access,
        query: Option<Map<String, Value>>,
    ) -> Result<QueryScope, AclError> {
        let Some(base) = self.options(model)?.base_query(access) else {
            return Ok(QueryScope::allow_all().and(query));
        };

        let scope = base.scope(self.permissions()).await;
        if scope.is_deny() {
            tracing::debug!(model, %access, "base query denied access");
        }
        Ok(scope.and(query))
    }

    /// Fields to fetch for `access`.
    ///
    /// Predicate rules are selected optimistically and re-checked when the
    /// result is picked. An empty result means "no restriction" (the model
    /// has no permission schema).
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownModel`] if the model is not registered.
    pub fn gen_select(
        &self,
        model: &str,
        access: Access,
        selection: Option<&Projection>,
        mode: SelectMode,
    ) -> Result<Vec<String>, AclError> {
        let options = self.options(model)?;
        let schema = options.schema();
        if schema.is_empty() {
            return Ok(Vec::new());
        }

        let doc_scoped = options.doc_permissions(access).is_some();
        let mut fields: Vec<String> = schema
            .iter()
            .filter(|(_, field)| selectable(field.rule(access), self.permissions(), mode, doc_scoped))
            .map(|(name, _)| name.to_owned())
            .collect();

        if let Some(selection) = selection.and_then(Projection::selection) {
            fields = selection.apply(&fields);
        }

        let always = options.permission_fields().iter().map(String::as_str);
        for extra in always.chain([ID_FIELD]) {
            if !fields.iter().any(|f| f == extra) {
                fields.push(extra.to_owned());
            }
        }
        Ok(fields)
    }

    /// Resolves caller populate entries against the reference graph.
    ///
    /// Entries without a declared reference, and entries whose referenced
    /// base query denies `access`, are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownModel`] if the model is not registered.
    pub async fn gen_populate(
        &self,
        model: &str,
        access: Access,
        populate: Option<OneOrMany<PopulateSpec>>,
    ) -> Result<Vec<Populate>, AclError> {
        let Some(populate) = populate else {
            return Ok(Vec::new());
        };
        self.options(model)?;

        let resolved = try_join_all(
            populate
                .into_vec()
                .into_iter()
                .map(|spec| self.resolve_populate(model, access, spec)),
        )
        .await?;
        Ok(resolved.into_iter().flatten().collect())
    }

    async fn resolve_populate(
        &self,
        model: &str,
        access: Access,
        spec: PopulateSpec,
    ) -> Result<Option<Populate>, AclError> {
        let (path, selection, access_override) = match spec {
            PopulateSpec::Path(path) => (path, None, None),
            PopulateSpec::Detailed {
                path,
                select,
                access,
            } => (path, select, access),
        };

        let Some(target) = self.registry().reference(model, &path) else {
            tracing::debug!(model, path = %path, "populate path dropped: no reference");
            return Ok(None);
        };

        let access = access_override.unwrap_or(access);
        let mode = if access_override.is_none() && access == Access::Read {
            SelectMode::Relaxed
        } else {
            SelectMode::Checked
        };

        let select = self.gen_select(target, access, selection.as_ref(), mode)?;
        let Some(filter) = self.gen_query(target, access, None).await?.into_query() else {
            tracing::debug!(model, path = %path, target, "populate path dropped: access denied");
            return Ok(None);
        };

        Ok(Some(Populate {
            path,
            model: target.to_owned(),
            select,
            filter,
        }))
    }

    /// Fields of `doc` the caller may see or write at `access`.
    ///
    /// `base_fields` are always allowed and come first. The document's own
    /// permission map (under the permission field) is consulted, except for
    /// `create` where client-supplied permissions are ignored. With
    /// `target_fields`, the result is restricted to those fields, in their
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownModel`] if the model is not registered.
    pub async fn gen_allowed_fields(
        &self,
        model: &str,
        doc: &Document,
        access: Access,
        base_fields: &[String],
        target_fields: Option<&[String]>,
    ) -> Result<Vec<String>, AclError> {
        let options = self.options(model)?;
        if options.schema().is_empty() {
            return Ok(base_fields.to_vec());
        }

        let doc_permissions = if access == Access::Create {
            DocPermissions::new()
        } else {
            DocPermissions::from_value(doc.get(self.registry().permission_field(options)))
        };

        let fields = allowed_in_schema(
            options.schema(),
            access,
            self.permissions(),
            &doc_permissions,
            base_fields,
        )
        .await;

        Ok(match target_fields {
            Some(target) => target
                .iter()
                .filter(|f| fields.contains(f))
                .cloned()
                .collect(),
            None => fields,
        })
    }

    /// `doc` reduced to the fields allowed at `access`.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownModel`] if the model is not registered.
    pub async fn pick_allowed_fields(
        &self,
        model: &str,
        doc: &Document,
        access: Access,
        base_fields: &[String],
    ) -> Result<Document, AclError> {
        let allowed = self
            .gen_allowed_fields(model, doc, access, base_fields, None)
            .await?;
        Ok(pick(doc, &allowed))
    }

    /// Computes the document's permission map and attaches it under the
    /// permission field.
    ///
    /// The map holds the `docPermissions` output plus `edit.<field>` for
    /// every field the caller may update.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownModel`] if the model is not registered.
    pub async fn permit(
        &self,
        model: &str,
        mut doc: Document,
        access: Access,
        context: &MiddlewareContext,
    ) -> Result<Document, AclError> {
        let options = self.options(model)?;

        let mut doc_permissions = match options.doc_permissions(access) {
            Some(hook) => hook.compute(&doc, self.permissions(), context).await,
            None => DocPermissions::new(),
        };

        let editable = allowed_in_schema(
            options.schema(),
            Access::Update,
            self.permissions(),
            &doc_permissions,
            &[],
        )
        .await;
        for field in &editable {
            doc_permissions.grant_edit(field);
        }

        doc.insert(
            self.registry().permission_field(options).to_owned(),
            doc_permissions.into_value(),
        );
        Ok(doc)
    }

    /// Runs the `decorate` hooks for `access`.
    ///
    /// # Errors
    ///
    /// Propagates hook failures.
    pub async fn decorate(
        &self,
        model: &str,
        doc: Document,
        access: Access,
        context: &mut MiddlewareContext,
    ) -> Result<Document, AclError> {
        let options = self.options(model)?;
        context.model_permissions =
            DocPermissions::from_value(doc.get(self.registry().permission_field(options)));
        run_doc_hooks(options.decorate(access), doc, self.permissions(), context).await
    }

    /// Runs the `decorateAll` hooks for `access` over a whole result.
    ///
    /// # Errors
    ///
    /// Propagates hook failures.
    pub async fn decorate_all(
        &self,
        model: &str,
        docs: Vec<Document>,
        access: Access,
    ) -> Result<Vec<Document>, AclError> {
        let options = self.options(model)?;
        run_collection_hooks(options.decorate_all(access), docs, self.permissions()).await
    }

    /// Runs the `prepare` hooks over filtered input data.
    ///
    /// # Errors
    ///
    /// Propagates hook failures.
    pub async fn prepare(
        &self,
        model: &str,
        data: Document,
        access: Access,
        context: &MiddlewareContext,
    ) -> Result<Document, AclError> {
        let options = self.options(model)?;
        run_doc_hooks(options.prepare(access), data, self.permissions(), context).await
    }

    /// Runs the `transform` hooks over a merged document before it is saved.
    ///
    /// # Errors
    ///
    /// Propagates hook failures.
    pub async fn transform(
        &self,
        model: &str,
        doc: Document,
        access: Access,
        context: &MiddlewareContext,
    ) -> Result<Document, AclError> {
        let options = self.options(model)?;
        run_doc_hooks(options.transform(access), doc, self.permissions(), context).await
    }

    /// # Errors
    ///
    /// Returns [`AclError::Validation`] if the model's validator rejects `doc`.
    pub async fn validate(
        &self,
        model: &str,
        doc: &Document,
        access: Access,
        context: &MiddlewareContext,
    ) -> Result<(), AclError> {
        let Some(validator) = self.options(model)?.validator(access) else {
            return Ok(());
        };
        match validator.validate(doc, self.permissions(), context).await {
            ValidationOutcome::Pass => Ok(()),
            ValidationOutcome::Fail(errors) => {
                tracing::debug!(model, %access, errors = errors.len(), "validation failed");
                Err(AclError::validation(errors))
            }
        }
    }

    /// Evaluates the route guard registered under `key`. A missing guard denies.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownModel`] if the model is not registered.
    pub async fn is_allowed(&self, model: &str, key: &GuardKey) -> Result<bool, AclError> {
        let allowed = match self.options(model)?.route_guard(key) {
            Some(guard) => guard.is_allowed(self.permissions()).await,
            None => false,
        };
        if !allowed {
            tracing::debug!(model, guard = %key, "route guard denied");
        }
        Ok(allowed)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::hooks;
    use crate::registry::{FieldPermissions, ModelConfigRegistry, ModelOptions};
    use crate::test_support::{NoStore, obj, strings};
    use serde_json::json;

    fn user_options() -> ModelOptions {
        ModelOptions::new()
            .with_field(
                "name",
                FieldPermissions::new()
                    .list(true)
                    .read(true)
                    .update("edit.name")
                    .create(true),
            )
            .with_field(
                "role",
                FieldPermissions::new()
                    .list("isAdmin")
                    .read(true)
                    .update("edit.role")
                    .create(true),
            )
            .with_field(
                "public",
                FieldPermissions::new()
                    .list(false)
                    .read(true)
                    .update("edit.public")
                    .create(true),
            )
            .with_field(
                "statusHistory",
                FieldPermissions::new()
                    .list(PermissionRule::predicate(|_, _| false))
                    .read(PermissionRule::predicate(|p, _| p.has("isAdmin")))
                    .update(PermissionRule::predicate(|_, d| d.granted("edit.statusHistory"))),
            )
            .with_field(
                "orgs",
                FieldPermissions::new().list(true).read(true).update("edit.orgs"),
            )
            .with_doc_permissions(hooks::doc_permissions(|doc, p| {
                let is_me = doc.get("_id") == p.prop("userId");
                DocPermissions::new()
                    .with("edit.name", p.has("isAdmin") || is_me)
                    .with("edit.role", p.has("isAdmin"))
            }))
            .with_base_query(
                Access::List,
                hooks::base_query(|p| {
                    if p.has("isAdmin") {
                        json!({})
                    } else {
                        json!({"$or": [{"_id": p.prop("userId")}, {"public": true}]})
                    }
                }),
            )
            .with_base_query(Access::Delete, hooks::base_query(|p| json!(p.has("isAdmin"))))
            .with_reference("orgs", "Org")
            .with_reference("location", "Location")
            .with_route_guard(Access::List, true)
            .with_route_guard(Access::Delete, "isAdmin")
    }

    fn org_options() -> ModelOptions {
        ModelOptions::new()
            .with_field("name", FieldPermissions::all(true))
            .with_field("secret", FieldPermissions::new().read("isAdmin"))
            .with_base_query(
                Access::List,
                hooks::base_query(|p| {
                    if p.has("isAdmin") { json!({}) } else { json!({"public": true}) }
                }),
            )
            .with_base_query(Access::Update, hooks::base_query(|_| json!(false)))
    }

    fn context(permissions: PermissionSet) -> RequestContext {
        let registry = ModelConfigRegistry::default();
        registry.set_model_options("User", user_options()).unwrap();
        registry.set_model_options("Org", org_options()).unwrap();
        RequestContext::new(permissions, registry.snapshot(), Arc::new(NoStore))
    }

    fn admin() -> PermissionSet {
        PermissionSet::new()
            .with("isAdmin", true)
            .with("userId", "11111111-1111-1111-1111-111111111111")
    }

    fn member() -> PermissionSet {
        PermissionSet::new()
            .with("isAdmin", false)
            .with("userId", "22222222-2222-2222-2222-222222222222")
    }

    #[tokio::test]
    async fn id_query_uses_identifier_field() {
        let ctx = context(member());
        assert_eq!(
            ctx.gen_id_query("User", "u-1").await.unwrap(),
            obj(json!({"_id": "u-1"}))
        );
    }

    #[tokio::test]
    async fn query_without_base_query_is_caller_query() {
        let ctx = context(member());
        let scope = ctx
            .gen_query("User", Access::Read, Some(obj(json!({"name": "a"}))))
            .await
            .unwrap();
        assert_eq!(scope.into_query(), Some(obj(json!({"name": "a"}))));
    }

    #[tokio::test]
    async fn query_is_anded_with_base_query() {
        let ctx = context(member());
        let scope = ctx
            .gen_query("User", Access::List, Some(obj(json!({"name": "a"}))))
            .await
            .unwrap();
        assert_eq!(
            scope.into_query(),
            Some(obj(json!({"$and": [
                {"$or": [{"_id": "22222222-2222-2222-2222-222222222222"}, {"public": true}]},
                {"name": "a"}
            ]})))
        );
    }

    #[tokio::test]
    async fn false_base_query_is_deny() {
        let ctx = context(member());
        let scope = ctx.gen_query("User", Access::Delete, None).await.unwrap();
        assert!(scope.is_deny());
    }

    #[tokio::test]
    async fn unknown_model_is_an_error() {
        let ctx = context(member());
        assert!(matches!(
            ctx.gen_query("Ghost", Access::List, None).await,
            Err(AclError::UnknownModel(_))
        ));
    }

    #[test]
    fn select_resolves_keys_and_keeps_predicates() {
        let ctx = context(member());
        let fields = ctx
            .gen_select("User", Access::List, None, SelectMode::Checked)
            .unwrap();
        assert_eq!(fields, strings(&["name", "statusHistory", "orgs", "_id"]));

        let ctx = context(admin());
        let fields = ctx
            .gen_select("User", Access::List, None, SelectMode::Checked)
            .unwrap();
        assert_eq!(
            fields,
            strings(&["name", "role", "statusHistory", "orgs", "_id"])
        );
    }

    #[test]
    fn picked_select_fetches_keys_documents_may_grant() {
        let ctx = context(member());
        assert_eq!(
            ctx.gen_select("User", Access::List, None, SelectMode::Picked)
                .unwrap(),
            strings(&["name", "role", "statusHistory", "orgs", "_id"])
        );
        // no docPermissions hook on Org
        assert_eq!(
            ctx.gen_select("Org", Access::Read, None, SelectMode::Picked)
                .unwrap(),
            strings(&["name", "_id"])
        );
    }

    #[test]
    fn select_applies_caller_projection() {
        let ctx = context(admin());
        let include = Projection::from("role name password");
        assert_eq!(
            ctx.gen_select("User", Access::List, Some(&include), SelectMode::Checked)
                .unwrap(),
            strings(&["role", "name", "_id"])
        );

        let exclude = Projection::from("-statusHistory -orgs");
        assert_eq!(
            ctx.gen_select("User", Access::List, Some(&exclude), SelectMode::Checked)
                .unwrap(),
            strings(&["name", "role", "_id"])
        );
    }

    #[test]
    fn relaxed_select_includes_unknown_keys() {
        let ctx = context(PermissionSet::new());
        let checked = ctx
            .gen_select("Org", Access::Read, None, SelectMode::Checked)
            .unwrap();
        let relaxed = ctx
            .gen_select("Org", Access::Read, None, SelectMode::Relaxed)
            .unwrap();
        assert_eq!(checked, strings(&["name", "_id"]));
        assert_eq!(relaxed, strings(&["name", "secret", "_id"]));

        // a known but falsy key stays hidden
        let ctx = context(member());
        let relaxed = ctx
            .gen_select("Org", Access::Read, None, SelectMode::Relaxed)
            .unwrap();
        assert_eq!(relaxed, strings(&["name", "_id"]));
    }

    #[tokio::test]
    async fn populate_drops_unknown_and_denied_paths() {
        let ctx = context(member());
        let populate = OneOrMany::Many(vec![
            PopulateSpec::from("orgs"),
            PopulateSpec::from("name"),
            PopulateSpec::from("location"),
            PopulateSpec::Detailed {
                path: "orgs".to_owned(),
                select: None,
                access: Some(Access::Update),
            },
        ]);
        let resolved = ctx
            .gen_populate("User", Access::List, Some(populate))
            .await
            .unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].path, "orgs");
        assert_eq!(resolved[0].model, "Org");
        assert_eq!(resolved[0].filter, obj(json!({"public": true})));
    }

    #[tokio::test]
    async fn populate_at_default_read_is_relaxed() {
        let ctx = context(PermissionSet::new());
        let resolved = ctx
            .gen_populate("User", Access::Read, Some(OneOrMany::One("orgs".into())))
            .await
            .unwrap();
        assert_eq!(resolved[0].select, strings(&["name", "secret", "_id"]));

        let explicit = PopulateSpec::Detailed {
            path: "orgs".to_owned(),
            select: None,
            access: Some(Access::Read),
        };
        let resolved = ctx
            .gen_populate("User", Access::Read, Some(OneOrMany::One(explicit)))
            .await
            .unwrap();
        assert_eq!(resolved[0].select, strings(&["name", "_id"]));
    }

    #[tokio::test]
    async fn allowed_fields_consult_document_permissions() {
        let ctx = context(member());
        let doc = obj(json!({
            "_id": "u-2",
            "name": "me",
            "_permissions": {"edit.name": true, "edit.statusHistory": true}
        }));
        let fields = ctx
            .gen_allowed_fields("User", &doc, Access::Update, &[], None)
            .await
            .unwrap();
        assert_eq!(fields, strings(&["name", "statusHistory"]));

        let target = strings(&["statusHistory", "role"]);
        let fields = ctx
            .gen_allowed_fields("User", &doc, Access::Update, &[], Some(&target))
            .await
            .unwrap();
        assert_eq!(fields, strings(&["statusHistory"]));
    }

    #[tokio::test]
    async fn create_ignores_client_supplied_permissions() {
        let ctx = context(member());
        let forged = obj(json!({"name": "x", "_permissions": {"edit.orgs": true}}));
        let update = ctx
            .gen_allowed_fields("User", &forged, Access::Update, &[], None)
            .await
            .unwrap();
        assert!(update.contains(&"orgs".to_owned()));

        let create = ctx
            .gen_allowed_fields("User", &forged, Access::Create, &[], None)
            .await
            .unwrap();
        assert_eq!(create, strings(&["name", "role", "public"]));
    }

    #[tokio::test]
    async fn permit_attaches_doc_permissions_and_edit_grants() {
        let ctx = context(member());
        let own = obj(json!({"_id": "22222222-2222-2222-2222-222222222222", "name": "me"}));
        let permitted = ctx
            .permit("User", own, Access::Read, &MiddlewareContext::default())
            .await
            .unwrap();
        assert_eq!(
            permitted["_permissions"],
            json!({"edit.name": true, "edit.role": false})
        );

        let other = obj(json!({"_id": "33333333-3333-3333-3333-333333333333"}));
        let permitted = ctx
            .permit("User", other, Access::Read, &MiddlewareContext::default())
            .await
            .unwrap();
        assert_eq!(
            permitted["_permissions"],
            json!({"edit.name": false, "edit.role": false})
        );
    }

    #[tokio::test]
    async fn allowed_fields_are_stable_for_the_same_document() {
        let ctx = context(admin());
        let doc = ctx
            .permit(
                "User",
                obj(json!({"_id": "u-9", "name": "n"})),
                Access::Update,
                &MiddlewareContext::default(),
            )
            .await
            .unwrap();
        let first = ctx
            .gen_allowed_fields("User", &doc, Access::Update, &[], None)
            .await
            .unwrap();
        let second = ctx
            .gen_allowed_fields("User", &doc, Access::Update, &[], None)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn route_guards() {
        let ctx = context(member());
        assert!(ctx.is_allowed("User", &Access::List.into()).await.unwrap());
        assert!(!ctx.is_allowed("User", &Access::Delete.into()).await.unwrap());
        // not configured
        assert!(!ctx.is_allowed("User", &Access::Update.into()).await.unwrap());
        assert!(!ctx.is_allowed("Org", &Access::List.into()).await.unwrap());

        let ctx = context(admin());
        assert!(ctx.is_allowed("User", &Access::Delete.into()).await.unwrap());
    }

    #[test]
    fn pagination() {
        assert_eq!(
            gen_pagination(None, None, 1000),
            Pagination {
                limit: 1000,
                skip: None
            }
        );
        assert_eq!(
            gen_pagination(Some(10), Some(3), 1000),
            Pagination {
                limit: 10,
                skip: Some(20)
            }
        );
        assert_eq!(
            gen_pagination(Some(5000), Some(1), 1000),
            Pagination {
                limit: 1000,
                skip: None
            }
        );
        assert_eq!(gen_pagination(Some(0), None, 50).limit, 50);
    }

    #[test]
    fn pick_copies_only_listed_present_fields() {
        let doc = obj(json!({"a": 1, "b": 2}));
        assert_eq!(pick(&doc, &strings(&["b", "c"])), obj(json!({"b": 2})));
    }
}
