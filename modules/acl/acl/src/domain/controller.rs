//! Per-model controller.
//!
//! Each operation routes every query through [`RequestContext::gen_query`]
//! before touching the store. A deny short-circuits without a store call:
//! list yields no rows, read/distinct/count yield `None`, update/delete
//! yield [`AclError::Unauthorized`].

use acl_sdk::{
    AclError, CountRequest, CreateInput, DistinctRequest, Document, FindOneRequest, FindRequest,
    ID_FIELD, ListRequest, ListResult, OneOrMany, Populate, ReadRequest, StoreError,
};
use acl_security::{Access, DocPermissions, PermissionRule};
use futures::future::try_join_all;
use serde_json::Value;

use crate::domain::context::{MiddlewareContext, RequestContext};
use crate::domain::generators::{SelectMode, gen_pagination, pick};
use crate::registry::ModelOptions;

/// Logs a failed store call and converts it.
pub(crate) fn store_error(operation: &'static str, error: StoreError) -> AclError {
    match &error {
        StoreError::Validation { errors } => {
            tracing::debug!(operation, errors = errors.len(), "store rejected document");
        }
        _ => tracing::error!(operation, error = ?error, "store call failed"),
    }
    AclError::Store(error)
}

/// Top-level fields whose value differs between `before` and `after`,
/// ignoring the permission field.
pub(crate) fn modified_paths(
    before: Option<&Document>,
    after: &Document,
    permission_field: &str,
) -> Vec<String> {
    let mut paths: Vec<String> = after
        .iter()
        .filter(|(k, v)| *k != permission_field && before.and_then(|b| b.get(*k)) != Some(*v))
        .map(|(k, _)| k.clone())
        .collect();
    if let Some(before) = before {
        paths.extend(
            before
                .keys()
                .filter(|k| *k != permission_field && !after.contains_key(*k))
                .cloned(),
        );
    }
    paths
}

/// Drops populate entries whose root path is not selected.
fn retain_selected(mut populate: Vec<Populate>, select: &[String]) -> Vec<Populate> {
    if !select.is_empty() {
        populate.retain(|p| {
            let root = p.path.split_once('.').map_or(p.path.as_str(), |(root, _)| root);
            select.iter().any(|f| f == root)
        });
    }
    populate
}

fn empty_list(include_count: bool) -> ListResult {
    if include_count {
        ListResult::Counted {
            count: 0,
            rows: Vec::new(),
        }
    } else {
        ListResult::Rows(Vec::new())
    }
}

/// Operations on one model within one request.
pub struct Controller<'a> {
    pub(crate) ctx: &'a RequestContext,
    pub(crate) model: &'a str,
    pub(crate) options: &'a ModelOptions,
}

impl<'a> Controller<'a> {
    pub(crate) fn new(ctx: &'a RequestContext, model: &'a str, options: &'a ModelOptions) -> Self {
        Self {
            ctx,
            model,
            options,
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.model
    }

    pub(crate) fn permission_field(&self) -> &'a str {
        self.ctx.registry().permission_field(self.options)
    }

    /// Fields always kept when output is picked.
    pub(crate) fn base_fields(&self) -> Vec<String> {
        vec![ID_FIELD.to_owned(), self.permission_field().to_owned()]
    }

    pub(crate) async fn find_one(
        &self,
        request: FindOneRequest,
        operation: &'static str,
    ) -> Result<Option<Document>, AclError> {
        self.ctx
            .store()
            .find_one(self.model, request)
            .await
            .map_err(|e| store_error(operation, e))
    }

    /// Output pipeline of a fetched or persisted document:
    /// permit (optional), pick visible fields, decorate.
    async fn finish(
        &self,
        mut doc: Document,
        access: Access,
        include_permissions: bool,
        mut context: MiddlewareContext,
    ) -> Result<Document, AclError> {
        if include_permissions {
            doc = self.ctx.permit(self.model, doc, access, &context).await?;
        }
        let visible = if access == Access::List {
            Access::List
        } else {
            Access::Read
        };
        let doc = self
            .ctx
            .pick_allowed_fields(self.model, &doc, visible, &self.base_fields())
            .await?;
        self.ctx.decorate(self.model, doc, access, &mut context).await
    }

    /// Lists documents visible to the caller.
    ///
    /// Per-document processing runs concurrently; the store order is kept.
    ///
    /// # Errors
    ///
    /// Propagates store and hook failures.
    #[tracing::instrument(skip_all, fields(model = %self.model))]
    pub async fn list(&self, request: ListRequest) -> Result<ListResult, AclError> {
        let ListRequest {
            query,
            select,
            sort,
            populate,
            limit,
            page,
            options,
        } = request;
        let access = Access::List;

        let (scope, populate) = futures::try_join!(
            self.ctx.gen_query(self.model, access, query),
            self.ctx
                .gen_populate(self.model, options.populate_access, populate),
        )?;
        let Some(query) = scope.into_query() else {
            return Ok(empty_list(options.include_count));
        };

        let select = self
            .ctx
            .gen_select(self.model, access, select.as_ref(), SelectMode::Picked)?;
        let populate = retain_selected(populate, &select);
        let pagination = gen_pagination(
            limit,
            page,
            self.ctx.registry().list_hard_limit(self.options),
        );

        let request = FindRequest::new(query.clone())
            .select(select)
            .sort(sort)
            .populate(populate)
            .paginate(pagination);
        let docs = self
            .ctx
            .store()
            .find(self.model, request)
            .await
            .map_err(|e| store_error("list", e))?;
        tracing::debug!(rows = docs.len(), "documents fetched");

        let docs = try_join_all(docs.into_iter().map(|doc| {
            self.finish(
                doc,
                access,
                options.include_permissions,
                MiddlewareContext::default(),
            )
        }))
        .await?;
        let rows = self.ctx.decorate_all(self.model, docs, access).await?;

        if !options.include_count {
            return Ok(ListResult::Rows(rows));
        }
        let count = self
            .ctx
            .store()
            .count_documents(self.model, query)
            .await
            .map_err(|e| store_error("count", e))?;
        Ok(ListResult::Counted { count, rows })
    }

    /// Reads one document by route id.
    ///
    /// On a miss at `read` access the lookup is retried with the `list`
    /// base query unless `try_list` is off, so a document visible in a list
    /// is also readable by id.
    ///
    /// # Errors
    ///
    /// Propagates store and hook failures.
    #[tracing::instrument(skip_all, fields(model = %self.model, id = %id))]
    pub async fn read(&self, id: &str, request: ReadRequest) -> Result<Option<Document>, AclError> {
        let ReadRequest {
            select,
            populate,
            options,
        } = request;
        let id_query = self.ctx.gen_id_query(self.model, id).await?;

        let (scope, populate) = futures::try_join!(
            self.ctx
                .gen_query(self.model, Access::Read, Some(id_query.clone())),
            self.ctx
                .gen_populate(self.model, options.populate_access, populate),
        )?;
        let Some(query) = scope.into_query() else {
            return Ok(None);
        };

        let fields =
            self.ctx
                .gen_select(self.model, Access::Read, select.as_ref(), SelectMode::Picked)?;
        let mut doc = self
            .find_one(
                FindOneRequest::new(query)
                    .select(fields)
                    .populate(populate.clone()),
                "read",
            )
            .await?;

        if doc.is_none() && options.try_list {
            tracing::debug!("read miss, retrying with list access");
            let scope = self
                .ctx
                .gen_query(self.model, Access::List, Some(id_query))
                .await?;
            if let Some(query) = scope.into_query() {
                let fields = self.ctx.gen_select(
                    self.model,
                    Access::List,
                    select.as_ref(),
                    SelectMode::Picked,
                )?;
                doc = self
                    .find_one(
                        FindOneRequest::new(query).select(fields).populate(populate),
                        "read",
                    )
                    .await?;
            }
        }

        let Some(doc) = doc else {
            return Ok(None);
        };
        self.finish(
            doc,
            Access::Read,
            options.include_permissions,
            MiddlewareContext::default(),
        )
        .await
        .map(Some)
    }

    async fn prepare_create(&self, item: Document) -> Result<(Document, MiddlewareContext), AclError> {
        let allowed = self
            .ctx
            .gen_allowed_fields(self.model, &item, Access::Create, &[], None)
            .await?;
        let picked = pick(&item, &allowed);

        let mut context = MiddlewareContext::with_original_data(item);
        let prepared = self
            .ctx
            .prepare(self.model, picked, Access::Create, &context)
            .await?;
        self.ctx
            .validate(self.model, &prepared, Access::Create, &context)
            .await?;
        context.prepared_data = Some(prepared.clone());
        Ok((prepared, context))
    }

    /// Creates one document or a batch; the result has the input's shape.
    ///
    /// Only fields the caller may create are kept from each item. The batch
    /// is persisted with a single store call.
    ///
    /// # Errors
    ///
    /// - `Validation` if the validator or the store rejects an item
    /// - store and hook failures
    #[tracing::instrument(skip_all, fields(model = %self.model))]
    pub async fn create(
        &self,
        input: CreateInput,
        include_permissions: bool,
    ) -> Result<OneOrMany<Document>, AclError> {
        let many = input.is_many();
        let items = input.into_vec();
        if items.is_empty() {
            return Ok(OneOrMany::Many(Vec::new()));
        }

        let prepared = try_join_all(items.into_iter().map(|item| self.prepare_create(item))).await?;
        let (data, contexts): (Vec<_>, Vec<_>) = prepared.into_iter().unzip();

        let docs = self
            .ctx
            .store()
            .create(self.model, data)
            .await
            .map_err(|e| store_error("create", e))?;
        tracing::debug!(created = docs.len(), "documents created");

        let mut docs = try_join_all(
            docs.into_iter()
                .zip(contexts)
                .map(|(doc, context)| self.finish(doc, Access::Create, include_permissions, context)),
        )
        .await?;

        if many {
            return Ok(OneOrMany::Many(docs));
        }
        docs.pop().map(OneOrMany::One).ok_or_else(|| {
            store_error("create", StoreError::backend("store returned no document"))
        })
    }

    /// Applies the caller's allowed changes to one document.
    ///
    /// Fields the caller may not update are dropped from `data` silently.
    /// Returns `None` when no document matches.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the update base query denies the caller
    /// - `Validation` if the validator or the store rejects the result
    /// - store and hook failures
    #[tracing::instrument(skip_all, fields(model = %self.model, id = %id))]
    pub async fn update(&self, id: &str, data: Document) -> Result<Option<Document>, AclError> {
        let id_query = self.ctx.gen_id_query(self.model, id).await?;
        let Some(query) = self
            .ctx
            .gen_query(self.model, Access::Update, Some(id_query))
            .await?
            .into_query()
        else {
            return Err(AclError::Unauthorized);
        };
        let Some(original) = self.find_one(FindOneRequest::new(query), "update").await? else {
            return Ok(None);
        };

        let permission_field = self.permission_field();
        let mut context = MiddlewareContext {
            original_doc: Some(original.clone()),
            ..MiddlewareContext::default()
        };

        let mut doc = self
            .ctx
            .permit(self.model, original, Access::Update, &context)
            .await?;
        context.current_doc = Some(doc.clone());

        let allowed = self
            .ctx
            .gen_allowed_fields(self.model, &doc, Access::Update, &[], None)
            .await?;
        let picked = pick(&data, &allowed);
        context.original_data = Some(data);

        let prepared = self
            .ctx
            .prepare(self.model, picked, Access::Update, &context)
            .await?;
        context.prepared_data = Some(prepared.clone());
        doc.extend(prepared);

        context.modified_paths = modified_paths(context.original_doc.as_ref(), &doc, permission_field);
        let mut doc = self
            .ctx
            .transform(self.model, doc, Access::Update, &context)
            .await?;
        context.modified_paths = modified_paths(context.original_doc.as_ref(), &doc, permission_field);
        tracing::debug!(modified = ?context.modified_paths, "saving document");

        self.ctx
            .validate(self.model, &doc, Access::Update, &context)
            .await?;

        let doc_permissions = doc.remove(permission_field);
        let mut saved = self
            .ctx
            .store()
            .save(self.model, doc)
            .await
            .map_err(|e| store_error("update", e))?;
        if let Some(doc_permissions) = doc_permissions {
            saved.insert(permission_field.to_owned(), doc_permissions);
        }

        self.finish(saved, Access::Update, false, context)
            .await
            .map(Some)
    }

    /// Removes one document. Returns whether a document was removed.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the delete base query denies the caller
    /// - store failures
    #[tracing::instrument(skip_all, fields(model = %self.model, id = %id))]
    pub async fn delete(&self, id: &str) -> Result<bool, AclError> {
        let id_query = self.ctx.gen_id_query(self.model, id).await?;
        let Some(query) = self
            .ctx
            .gen_query(self.model, Access::Delete, Some(id_query))
            .await?
            .into_query()
        else {
            return Err(AclError::Unauthorized);
        };

        let removed = self
            .ctx
            .store()
            .find_one_and_remove(self.model, query)
            .await
            .map_err(|e| store_error("delete", e))?;
        Ok(removed.is_some())
    }

    /// Distinct values of a readable field.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    #[tracing::instrument(skip_all, fields(model = %self.model, field = %field))]
    pub async fn distinct(
        &self,
        field: &str,
        request: DistinctRequest,
    ) -> Result<Option<Vec<Value>>, AclError> {
        let Some(query) = self
            .ctx
            .gen_query(self.model, Access::Read, request.query)
            .await?
            .into_query()
        else {
            return Ok(None);
        };

        let readable = self
            .ctx
            .gen_select(self.model, Access::Read, None, SelectMode::Checked)?;
        if !readable.is_empty() && !readable.iter().any(|f| f == field) {
            tracing::debug!("distinct on a field the caller cannot read");
            return Ok(None);
        }
        // values are not tied to a document, so predicates see no document grants
        if let Some(rule @ PermissionRule::Predicate(_)) = self
            .options
            .schema()
            .get(field)
            .and_then(|f| f.rule(Access::Read))
            && !rule
                .resolve(self.ctx.permissions(), &DocPermissions::new())
                .await
        {
            tracing::debug!("distinct on a predicate-gated field denied");
            return Ok(None);
        }

        self.ctx
            .store()
            .distinct(self.model, field, query)
            .await
            .map(Some)
            .map_err(|e| store_error("distinct", e))
    }

    /// Number of documents matching the caller's query at the requested
    /// access (default `read`). Only `list`, `read`, `distinct` and `count`
    /// are accepted.
    ///
    /// # Errors
    ///
    /// - `BadRequest` for a mutating access
    /// - store failures
    #[tracing::instrument(skip_all, fields(model = %self.model))]
    pub async fn count(&self, request: CountRequest) -> Result<Option<u64>, AclError> {
        let access = request.access.unwrap_or(Access::Read);
        if !matches!(
            access,
            Access::List | Access::Read | Access::Distinct | Access::Count
        ) {
            return Err(AclError::bad_request(format!(
                "count does not accept '{}' access",
                access.as_str()
            )));
        }
        let Some(query) = self
            .ctx
            .gen_query(self.model, access, request.query)
            .await?
            .into_query()
        else {
            return Ok(None);
        };

        self.ctx
            .store()
            .count_documents(self.model, query)
            .await
            .map(Some)
            .map_err(|e| store_error("count", e))
    }

    /// A new, unsaved document carrying the model defaults.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn empty(&self) -> Result<Document, AclError> {
        self.ctx
            .store()
            .new_document(self.model)
            .await
            .map_err(|e| store_error("empty", e))
    }
}
