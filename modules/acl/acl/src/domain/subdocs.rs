//! Embedded sub-collection operations.
//!
//! A sub path is a parent field declared with a nested schema
//! ([`FieldPermissions::sub`](crate::registry::FieldPermissions::sub)).
//! Element fields are resolved against the nested schema using the parent
//! document's permission map. Reads require the parent field to be readable,
//! mutations require it to be updatable.

use acl_sdk::{AclError, Document, FindOneRequest, ID_FIELD, Projection, SubRequest};
use acl_security::{Access, DocPermissions};
use serde_json::Value;

use crate::domain::context::MiddlewareContext;
use crate::domain::controller::{Controller, store_error};
use crate::domain::generators::{allowed_in_schema, pick};
use crate::registry::{FieldPermissions, PermissionSchema};

fn id_matches(id: Option<&Value>, sub_id: &str) -> bool {
    match id {
        Some(Value::String(id)) => id == sub_id,
        Some(Value::Number(id)) => id.to_string() == sub_id,
        _ => false,
    }
}

fn elements<'d>(parent: &'d Document, sub: &str) -> impl Iterator<Item = &'d Document> {
    parent
        .get(sub)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn elements_mut<'d>(parent: &'d mut Document, sub: &str) -> Result<&'d mut Vec<Value>, AclError> {
    match parent
        .entry(sub.to_owned())
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(items) => Ok(items),
        _ => Err(AclError::configuration(format!(
            "sub-document path '{sub}' does not hold an array"
        ))),
    }
}

impl<'a> Controller<'a> {
    fn sub_schema(&self, sub: &str) -> Result<&'a PermissionSchema, AclError> {
        self.options
            .schema()
            .get(sub)
            .and_then(FieldPermissions::sub_schema)
            .ok_or_else(|| AclError::unknown_sub_path(self.model, sub))
    }

    /// Parent document permitted at `access`, provided the caller may access
    /// the `sub` field itself at that access.
    ///
    /// A deny on `update` is an error; a deny on `read` is a miss.
    async fn load_parent(
        &self,
        id: &str,
        sub: &str,
        access: Access,
    ) -> Result<Option<Document>, AclError> {
        let id_query = self.ctx.gen_id_query(self.model, id).await?;
        let Some(query) = self
            .ctx
            .gen_query(self.model, access, Some(id_query))
            .await?
            .into_query()
        else {
            return if access == Access::Read {
                Ok(None)
            } else {
                Err(AclError::Unauthorized)
            };
        };

        let Some(parent) = self.find_one(FindOneRequest::new(query), "sub").await? else {
            return Ok(None);
        };
        let parent = self
            .ctx
            .permit(self.model, parent, access, &MiddlewareContext::default())
            .await?;

        let target = [sub.to_owned()];
        let allowed = self
            .ctx
            .gen_allowed_fields(self.model, &parent, access, &[], Some(&target))
            .await?;
        if allowed.is_empty() {
            tracing::debug!(sub, %access, "parent field not accessible");
            return Ok(None);
        }
        Ok(Some(parent))
    }

    fn parent_permissions(&self, parent: &Document) -> DocPermissions {
        DocPermissions::from_value(parent.get(self.permission_field()))
    }

    /// Element fields allowed at `access`, `_id` first.
    async fn element_fields(
        &self,
        schema: &PermissionSchema,
        access: Access,
        doc_permissions: &DocPermissions,
        select: Option<&Projection>,
    ) -> Vec<String> {
        let base = [ID_FIELD.to_owned()];
        let mut fields = allowed_in_schema(
            schema,
            access,
            self.ctx.permissions(),
            doc_permissions,
            &base,
        )
        .await;
        if let Some(selection) = select.and_then(Projection::selection) {
            fields = selection.apply(&fields);
            if !fields.iter().any(|f| f == ID_FIELD) {
                fields.insert(0, ID_FIELD.to_owned());
            }
        }
        fields
    }

    async fn save_parent(&self, mut parent: Document) -> Result<Document, AclError> {
        parent.remove(self.permission_field());
        self.ctx
            .store()
            .save(self.model, parent)
            .await
            .map_err(|e| store_error("sub", e))
    }

    /// Element `sub_id` of the saved parent, picked for output.
    async fn sub_output(
        &self,
        schema: &PermissionSchema,
        saved: &Document,
        sub: &str,
        sub_id: &str,
        doc_permissions: &DocPermissions,
    ) -> Option<Document> {
        let fields = self
            .element_fields(schema, Access::Read, doc_permissions, None)
            .await;
        elements(saved, sub)
            .find(|e| id_matches(e.get(ID_FIELD), sub_id))
            .map(|e| pick(e, &fields))
    }

    /// Elements of `sub` on parent `id`. `None` when the parent is missing
    /// or its `sub` field is not readable.
    ///
    /// # Errors
    ///
    /// - `UnknownSubPath` if `sub` is not declared
    /// - store failures
    #[tracing::instrument(skip_all, fields(model = %self.model, id = %id, sub = %sub))]
    pub async fn list_sub(
        &self,
        id: &str,
        sub: &str,
        request: SubRequest,
    ) -> Result<Option<Vec<Document>>, AclError> {
        let schema = self.sub_schema(sub)?;
        let Some(parent) = self.load_parent(id, sub, Access::Read).await? else {
            return Ok(None);
        };

        let doc_permissions = self.parent_permissions(&parent);
        let fields = self
            .element_fields(schema, Access::List, &doc_permissions, request.select.as_ref())
            .await;
        Ok(Some(elements(&parent, sub).map(|e| pick(e, &fields)).collect()))
    }

    /// # Errors
    ///
    /// - `UnknownSubPath` if `sub` is not declared
    /// - store failures
    #[tracing::instrument(skip_all, fields(model = %self.model, id = %id, sub = %sub))]
    pub async fn read_sub(
        &self,
        id: &str,
        sub: &str,
        sub_id: &str,
        request: SubRequest,
    ) -> Result<Option<Document>, AclError> {
        let schema = self.sub_schema(sub)?;
        let Some(parent) = self.load_parent(id, sub, Access::Read).await? else {
            return Ok(None);
        };

        let doc_permissions = self.parent_permissions(&parent);
        let fields = self
            .element_fields(schema, Access::Read, &doc_permissions, request.select.as_ref())
            .await;
        let found = elements(&parent, sub)
            .find(|e| id_matches(e.get(ID_FIELD), sub_id))
            .map(|e| pick(e, &fields));
        Ok(found)
    }

    /// Appends an element built from the creatable fields of `data`.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the update base query denies the caller
    /// - `UnknownSubPath` if `sub` is not declared
    /// - store failures
    #[tracing::instrument(skip_all, fields(model = %self.model, id = %id, sub = %sub))]
    pub async fn create_sub(
        &self,
        id: &str,
        sub: &str,
        data: Document,
    ) -> Result<Option<Document>, AclError> {
        let schema = self.sub_schema(sub)?;
        let Some(mut parent) = self.load_parent(id, sub, Access::Update).await? else {
            return Ok(None);
        };

        let doc_permissions = self.parent_permissions(&parent);
        let allowed = allowed_in_schema(
            schema,
            Access::Create,
            self.ctx.permissions(),
            &doc_permissions,
            &[],
        )
        .await;
        let mut element = pick(&data, &allowed);
        element.remove(ID_FIELD);

        let sub_id = self
            .ctx
            .store()
            .new_id(self.model)
            .await
            .map_err(|e| store_error("sub", e))?;
        let sub_id_key = match &sub_id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        element.insert(ID_FIELD.to_owned(), sub_id);
        elements_mut(&mut parent, sub)?.push(Value::Object(element));

        let saved = self.save_parent(parent).await?;
        Ok(self
            .sub_output(schema, &saved, sub, &sub_id_key, &doc_permissions)
            .await)
    }

    /// Merges the updatable fields of `data` into element `sub_id`.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the update base query denies the caller
    /// - `UnknownSubPath` if `sub` is not declared
    /// - store failures
    #[tracing::instrument(skip_all, fields(model = %self.model, id = %id, sub = %sub))]
    pub async fn update_sub(
        &self,
        id: &str,
        sub: &str,
        sub_id: &str,
        data: Document,
    ) -> Result<Option<Document>, AclError> {
        let schema = self.sub_schema(sub)?;
        let Some(mut parent) = self.load_parent(id, sub, Access::Update).await? else {
            return Ok(None);
        };

        let doc_permissions = self.parent_permissions(&parent);
        let allowed = allowed_in_schema(
            schema,
            Access::Update,
            self.ctx.permissions(),
            &doc_permissions,
            &[],
        )
        .await;
        let mut changes = pick(&data, &allowed);
        changes.remove(ID_FIELD);

        let Some(element) = elements_mut(&mut parent, sub)?
            .iter_mut()
            .find(|e| id_matches(e.get(ID_FIELD), sub_id))
            .and_then(Value::as_object_mut)
        else {
            return Ok(None);
        };
        element.extend(changes);

        let saved = self.save_parent(parent).await?;
        Ok(self
            .sub_output(schema, &saved, sub, sub_id, &doc_permissions)
            .await)
    }

    /// Removes element `sub_id`. Returns whether an element was removed.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the update base query denies the caller
    /// - `UnknownSubPath` if `sub` is not declared
    /// - store failures
    #[tracing::instrument(skip_all, fields(model = %self.model, id = %id, sub = %sub))]
    pub async fn delete_sub(&self, id: &str, sub: &str, sub_id: &str) -> Result<bool, AclError> {
        self.sub_schema(sub)?;
        let Some(mut parent) = self.load_parent(id, sub, Access::Update).await? else {
            return Ok(false);
        };

        let items = elements_mut(&mut parent, sub)?;
        let before = items.len();
        items.retain(|e| !id_matches(e.get(ID_FIELD), sub_id));
        if items.len() == before {
            return Ok(false);
        }

        self.save_parent(parent).await?;
        Ok(true)
    }
}
