//! Model configuration registry.
//!
//! The registry is populated during initialisation and frozen before the
//! router starts serving. Every mutation publishes a fresh copy-on-write
//! [`RegistrySnapshot`]; request contexts hold the snapshot that was current
//! when they were created, so registrations never tear a request.

pub mod options;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use acl_sdk::AclError;
use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::config::AclConfig;
use crate::hooks::PermissionResolver;

pub use options::{
    BaseUrl, FieldPermissions, Identifier, ModelOption, ModelOptions, PerAccess,
    PermissionSchema,
};

/// Process-wide defaults.
#[derive(Clone)]
pub struct RootOptions {
    pub permission_field: String,
    pub id_param: String,
    pub list_hard_limit: u64,
    pub api_prefix: String,
    /// Derives the caller's permission set from a request.
    pub root_permissions: Option<Arc<dyn PermissionResolver>>,
}

impl From<&AclConfig> for RootOptions {
    fn from(cfg: &AclConfig) -> Self {
        Self {
            permission_field: cfg.permission_field.clone(),
            id_param: cfg.id_param.clone(),
            list_hard_limit: cfg.list_hard_limit,
            api_prefix: cfg.api_prefix.clone(),
            root_permissions: None,
        }
    }
}

impl Default for RootOptions {
    fn default() -> Self {
        Self::from(&AclConfig::default())
    }
}

/// A single root option.
pub enum RootOption {
    PermissionField(String),
    IdParam(String),
    ListHardLimit(u64),
    ApiPrefix(String),
    RootPermissions(Arc<dyn PermissionResolver>),
}

/// Immutable view of the registry.
#[derive(Clone, Default)]
pub struct RegistrySnapshot {
    root: RootOptions,
    models: BTreeMap<String, Arc<ModelOptions>>,
}

impl RegistrySnapshot {
    #[must_use]
    pub fn root(&self) -> &RootOptions {
        &self.root
    }

    /// # Errors
    ///
    /// Returns [`AclError::UnknownModel`] if `name` is not registered.
    pub fn model(&self, name: &str) -> Result<&Arc<ModelOptions>, AclError> {
        self.models
            .get(name)
            .ok_or_else(|| AclError::UnknownModel(name.to_owned()))
    }

    /// Registered models in name order.
    pub fn models(&self) -> impl Iterator<Item = (&str, &ModelOptions)> {
        self.models.iter().map(|(n, o)| (n.as_str(), o.as_ref()))
    }

    /// Permission field of a model, falling back to the root option.
    #[must_use]
    pub fn permission_field<'a>(&'a self, options: &'a ModelOptions) -> &'a str {
        options
            .permission_field()
            .unwrap_or(&self.root.permission_field)
    }

    #[must_use]
    pub fn list_hard_limit(&self, options: &ModelOptions) -> u64 {
        options
            .list_hard_limit()
            .unwrap_or(self.root.list_hard_limit)
    }

    /// Model referenced by `path` on `model`.
    ///
    /// References to unregistered models resolve to `None`.
    #[must_use]
    pub fn reference(&self, model: &str, path: &str) -> Option<&str> {
        let target = self.models.get(model)?.reference(path)?;
        self.models.contains_key(target).then_some(target)
    }
}

/// Registry of model options.
pub struct ModelConfigRegistry {
    current: ArcSwap<RegistrySnapshot>,
    writer: Mutex<()>,
    frozen: AtomicBool,
}

impl ModelConfigRegistry {
    #[must_use]
    pub fn new(root: RootOptions) -> Self {
        Self {
            current: ArcSwap::from_pointee(RegistrySnapshot {
                root,
                models: BTreeMap::new(),
            }),
            writer: Mutex::new(()),
            frozen: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn from_config(cfg: &AclConfig) -> Self {
        Self::new(RootOptions::from(cfg))
    }

    fn mutate<F>(&self, f: F) -> Result<(), AclError>
    where
        F: FnOnce(&mut RegistrySnapshot) -> Result<(), AclError>,
    {
        let _guard = self.writer.lock();
        if self.is_frozen() {
            return Err(AclError::RegistryFrozen);
        }
        let mut next = RegistrySnapshot::clone(&self.current.load());
        f(&mut next)?;
        self.current.store(Arc::new(next));
        Ok(())
    }

    /// Registers (or replaces) the options of a model.
    ///
    /// # Errors
    ///
    /// Returns [`AclError::RegistryFrozen`] after [`freeze`](Self::freeze).
    pub fn set_model_options(
        &self,
        name: impl Into<String>,
        options: ModelOptions,
    ) -> Result<(), AclError> {
        let name = name.into();
        self.mutate(|snapshot| {
            tracing::info!(model = %name, "registering model options");
            snapshot.models.insert(name, Arc::new(options));
            Ok(())
        })
    }

    /// Replaces a single option of a registered model.
    ///
    /// # Errors
    ///
    /// - `UnknownModel` if the model is not registered
    /// - `RegistryFrozen` after [`freeze`](Self::freeze)
    pub fn set_model_option(&self, name: &str, option: ModelOption) -> Result<(), AclError> {
        self.mutate(|snapshot| {
            let entry = snapshot
                .models
                .get_mut(name)
                .ok_or_else(|| AclError::UnknownModel(name.to_owned()))?;
            tracing::debug!(model = %name, option = option.name(), "setting model option");
            option.apply(Arc::make_mut(entry));
            Ok(())
        })
    }

    /// # Errors
    ///
    /// Returns [`AclError::UnknownModel`] if the model is not registered.
    pub fn model_options(&self, name: &str) -> Result<Arc<ModelOptions>, AclError> {
        self.current.load().model(name).map(Arc::clone)
    }

    /// # Errors
    ///
    /// Returns [`AclError::RegistryFrozen`] after [`freeze`](Self::freeze).
    pub fn set_root_option(&self, option: RootOption) -> Result<(), AclError> {
        self.mutate(|snapshot| {
            let root = &mut snapshot.root;
            match option {
                RootOption::PermissionField(field) => root.permission_field = field,
                RootOption::IdParam(param) => root.id_param = param,
                RootOption::ListHardLimit(limit) => root.list_hard_limit = limit,
                RootOption::ApiPrefix(prefix) => root.api_prefix = prefix,
                RootOption::RootPermissions(resolver) => root.root_permissions = Some(resolver),
            }
            Ok(())
        })
    }

    #[must_use]
    pub fn root_options(&self) -> RootOptions {
        self.current.load().root.clone()
    }

    /// Rejects all further mutation.
    pub fn freeze(&self) {
        let _guard = self.writer.lock();
        self.frozen.store(true, Ordering::Release);
        tracing::info!(
            models = self.current.load().models.len(),
            "model registry frozen"
        );
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }
}

impl Default for ModelConfigRegistry {
    fn default() -> Self {
        Self::new(RootOptions::default())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn registered_model_is_visible_in_new_snapshots_only() {
        let registry = ModelConfigRegistry::default();
        let before = registry.snapshot();

        registry
            .set_model_options("User", ModelOptions::new().with_list_hard_limit(10))
            .unwrap();

        assert!(before.model("User").is_err());
        let after = registry.snapshot();
        assert_eq!(after.list_hard_limit(after.model("User").unwrap()), 10);
    }

    #[test]
    fn unknown_model_is_reported() {
        let registry = ModelConfigRegistry::default();
        assert!(matches!(
            registry.model_options("Ghost"),
            Err(AclError::UnknownModel(name)) if name == "Ghost"
        ));
        assert!(matches!(
            registry.set_model_option("Ghost", ModelOption::ListHardLimit(1)),
            Err(AclError::UnknownModel(_))
        ));
    }

    #[test]
    fn frozen_registry_rejects_mutation() {
        let registry = ModelConfigRegistry::default();
        registry.set_model_options("User", ModelOptions::new()).unwrap();
        registry.freeze();

        assert!(registry.is_frozen());
        assert!(matches!(
            registry.set_model_options("Org", ModelOptions::new()),
            Err(AclError::RegistryFrozen)
        ));
        assert!(matches!(
            registry.set_root_option(RootOption::IdParam("key".to_owned())),
            Err(AclError::RegistryFrozen)
        ));
        assert!(registry.model_options("User").is_ok());
    }

    #[test]
    fn model_options_fall_back_to_root_options() {
        let registry = ModelConfigRegistry::default();
        registry
            .set_root_option(RootOption::PermissionField("_perms".to_owned()))
            .unwrap();
        registry.set_model_options("User", ModelOptions::new()).unwrap();
        registry
            .set_model_options("Org", ModelOptions::new().with_permission_field("_acl"))
            .unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(
            snapshot.permission_field(snapshot.model("User").unwrap()),
            "_perms"
        );
        assert_eq!(
            snapshot.permission_field(snapshot.model("Org").unwrap()),
            "_acl"
        );
        assert_eq!(
            snapshot.list_hard_limit(snapshot.model("User").unwrap()),
            1000
        );
    }

    #[test]
    fn references_to_unregistered_models_are_dropped() {
        let registry = ModelConfigRegistry::default();
        registry
            .set_model_options(
                "User",
                ModelOptions::new()
                    .with_reference("orgs", "Org")
                    .with_reference("location", "Location"),
            )
            .unwrap();
        registry.set_model_options("Org", ModelOptions::new()).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.reference("User", "orgs"), Some("Org"));
        assert_eq!(snapshot.reference("User", "location"), None);
        assert_eq!(snapshot.reference("User", "name"), None);
    }

    #[test]
    fn set_model_option_copies_on_write() {
        let registry = ModelConfigRegistry::default();
        registry
            .set_model_options("User", ModelOptions::new().with_list_hard_limit(10))
            .unwrap();
        let held = registry.model_options("User").unwrap();

        registry
            .set_model_option("User", ModelOption::ListHardLimit(3))
            .unwrap();

        assert_eq!(held.list_hard_limit(), Some(10));
        assert_eq!(
            registry.model_options("User").unwrap().list_hard_limit(),
            Some(3)
        );
    }
}
