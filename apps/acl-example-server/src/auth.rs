use std::sync::Arc;

use acl::hooks::PermissionResolver;
use acl_sdk::{AclError, DataStore, FindOneRequest};
use acl_security::PermissionSet;
use async_trait::async_trait;
use http::HeaderMap;
use serde_json::{Map, Value};

/// Header naming the calling user.
pub const USER_HEADER: &str = "user";

/// Resolves `{isAdmin, userId}` by looking up the user named in the
/// `user` header. Unknown or anonymous callers get neither.
pub struct UserHeaderResolver {
    store: Arc<dyn DataStore>,
}

impl UserHeaderResolver {
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PermissionResolver for UserHeaderResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<PermissionSet, AclError> {
        let name = headers.get(USER_HEADER).and_then(|v| v.to_str().ok());
        let user = match name {
            Some(name) => {
                let mut query = Map::new();
                query.insert("name".to_owned(), Value::String(name.to_owned()));
                self.store.find_one("User", FindOneRequest::new(query)).await?
            }
            None => None,
        };
        if name.is_some() && user.is_none() {
            tracing::debug!(user = name, "unknown user header");
        }

        let is_admin = user
            .as_ref()
            .is_some_and(|u| u.get("role").and_then(Value::as_str) == Some("admin"));
        let user_id = user
            .and_then(|mut u| u.remove("_id"))
            .unwrap_or(Value::Null);
        Ok(PermissionSet::new()
            .with("isAdmin", is_admin)
            .with("userId", user_id))
    }
}
