//! Engine entry point.

use std::sync::Arc;

use acl_sdk::{AclError, DataStore};
use acl_security::PermissionSet;
use http::HeaderMap;

use crate::domain::context::RequestContext;
use crate::registry::ModelConfigRegistry;

/// ACL service: the model registry plus the store it guards.
///
/// Each request gets its own [`RequestContext`] built from the registry
/// snapshot current at that moment.
#[derive(Clone)]
pub struct AclService {
    registry: Arc<ModelConfigRegistry>,
    store: Arc<dyn DataStore>,
}

impl AclService {
    #[must_use]
    pub fn new(registry: Arc<ModelConfigRegistry>, store: Arc<dyn DataStore>) -> Self {
        Self { registry, store }
    }

    #[must_use]
    pub fn registry(&self) -> &ModelConfigRegistry {
        &self.registry
    }

    #[must_use]
    pub fn context(&self, permissions: PermissionSet) -> RequestContext {
        RequestContext::new(permissions, self.registry.snapshot(), Arc::clone(&self.store))
    }

    /// Permission set of the caller, derived by the `rootPermissions`
    /// resolver. Without a resolver every caller gets an empty set.
    ///
    /// # Errors
    ///
    /// Propagates resolver failures.
    pub async fn resolve_permissions(&self, headers: &HeaderMap) -> Result<PermissionSet, AclError> {
        let resolver = self.registry.snapshot().root().root_permissions.clone();
        match resolver {
            Some(resolver) => resolver.resolve(headers).await,
            None => Ok(PermissionSet::new()),
        }
    }
}
