use std::sync::Arc;

use acl_sdk::{AclError, DataStore, Document};
use acl_security::{DocPermissions, PermissionSet};

use crate::domain::controller::Controller;
use crate::registry::{ModelOptions, RegistrySnapshot};

/// Scratch state shared by the hooks of one controller operation.
#[derive(Clone, Debug, Default)]
pub struct MiddlewareContext {
    /// Stored document before any change (update).
    pub original_doc: Option<Document>,
    /// Document after `permit` (update).
    pub current_doc: Option<Document>,
    /// Raw request body.
    pub original_data: Option<Document>,
    /// Body after field filtering and `prepare`.
    pub prepared_data: Option<Document>,
    /// Top-level fields changed by the update.
    pub modified_paths: Vec<String>,
    /// Permission map of the document being decorated.
    pub model_permissions: DocPermissions,
}

impl MiddlewareContext {
    #[must_use]
    pub fn with_original_data(data: Document) -> Self {
        Self {
            original_data: Some(data),
            ..Self::default()
        }
    }
}

/// Everything one request needs: caller permissions, the registry snapshot
/// current at request start and the store.
///
/// Generators are methods on this type (see [`generators`](super::generators)).
#[derive(Clone)]
pub struct RequestContext {
    permissions: PermissionSet,
    registry: Arc<RegistrySnapshot>,
    store: Arc<dyn DataStore>,
}

impl RequestContext {
    #[must_use]
    pub fn new(
        permissions: PermissionSet,
        registry: Arc<RegistrySnapshot>,
        store: Arc<dyn DataStore>,
    ) -> Self {
        Self {
            permissions,
            registry,
            store,
        }
    }

    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    #[must_use]
    pub fn registry(&self) -> &RegistrySnapshot {
        &self.registry
    }

    #[must_use]
    pub fn store(&self) -> &dyn DataStore {
        self.store.as_ref()
    }

    /// # Errors
    ///
    /// Returns [`AclError::UnknownModel`] if the model is not registered.
    pub fn options(&self, model: &str) -> Result<&ModelOptions, AclError> {
        self.registry.model(model).map(AsRef::as_ref)
    }

    /// Permission field of `model`.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownModel`] if the model is not registered.
    pub fn permission_field(&self, model: &str) -> Result<&str, AclError> {
        let options = self.options(model)?;
        Ok(self.registry.permission_field(options))
    }

    /// Controller for one model.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::UnknownModel`] if the model is not registered.
    pub fn controller<'a>(&'a self, model: &'a str) -> Result<Controller<'a>, AclError> {
        let options = self.options(model)?;
        Ok(Controller::new(self, model, options))
    }
}
