//! Example models: users with a status history, organisations with
//! locations, and documents.

use acl::hooks;
use acl::{FieldPermissions, ModelConfigRegistry, ModelOptions, PermissionSchema};
use acl_sdk::AclError;
use acl_security::{Access, DocPermissions, PermissionRule, PermissionSet};
use serde_json::{Value, json};

fn own_or_admin(p: &PermissionSet) -> Value {
    if p.has("isAdmin") {
        json!({})
    } else {
        json!({"_id": p.prop("userId")})
    }
}

fn status_schema() -> PermissionSchema {
    PermissionSchema::new()
        .field("name", FieldPermissions::all(true))
        .field(
            "approved",
            FieldPermissions::new()
                .list(true)
                .read(true)
                .create("isAdmin")
                .update("isAdmin"),
        )
        .field(
            "document",
            FieldPermissions::new().read(true).create(true).update(true),
        )
}

fn user() -> ModelOptions {
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
                .list(false)
                .read(PermissionRule::predicate(|p, _| p.has("isAdmin")))
                .update(PermissionRule::predicate(|_, doc| {
                    doc.granted("edit.statusHistory")
                }))
                .sub(status_schema()),
        )
        .with_field(
            "orgs",
            FieldPermissions::new().list(true).read(true).update("edit.orgs"),
        )
        .with_doc_permissions(hooks::doc_permissions(|doc, p| {
            let admin = p.has("isAdmin");
            let is_me = p.prop("userId").is_some_and(|id| doc.get("_id") == Some(id));
            DocPermissions::new()
                .with("edit.name", admin || is_me)
                .with("edit.role", admin)
                .with("edit.public", admin)
                .with("edit.statusHistory", admin)
                .with("edit.orgs", admin)
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
        .with_base_query(Access::Read, hooks::base_query(own_or_admin))
        .with_base_query(Access::Update, hooks::base_query(own_or_admin))
        .with_base_query(Access::Delete, hooks::base_query(own_or_admin))
        .with_identifier("name")
        .with_reference("orgs", "Org")
        .with_default_route_guard(true)
        .with_route_guard(Access::Create, "isAdmin")
        .with_route_guard(Access::Delete, "isAdmin")
}

fn org() -> ModelOptions {
    ModelOptions::new()
        .with_field("name", FieldPermissions::new().list(true).read(true))
        .with_field("locations", FieldPermissions::new().read(true))
        .with_doc_permissions(hooks::doc_permissions(|_, _| {
            DocPermissions::new().with("read", false).with("edit", true)
        }))
        .with_reference("locations", "Location")
        .with_route_guard(Access::List, true)
        .with_route_guard(Access::Read, true)
}

fn location() -> ModelOptions {
    ModelOptions::new()
        .with_field("name", FieldPermissions::all(true))
        .with_default_route_guard(true)
}

fn document() -> ModelOptions {
    ModelOptions::new()
        .with_field("name", FieldPermissions::all(true))
        .with_route_guard(Access::List, true)
        .with_route_guard(Access::Read, true)
}

/// Registers the example models.
///
/// # Errors
///
/// Returns [`AclError::RegistryFrozen`] if routes were already built.
pub fn register(registry: &ModelConfigRegistry) -> Result<(), AclError> {
    registry.set_model_options("User", user())?;
    registry.set_model_options("Org", org())?;
    registry.set_model_options("Location", location())?;
    registry.set_model_options("Document", document())?;
    Ok(())
}
