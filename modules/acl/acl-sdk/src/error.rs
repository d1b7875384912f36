use thiserror::Error;

/// Errors raised by a [`DataStore`](crate::DataStore) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("validation failed")]
    Validation { errors: Vec<String> },

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("duplicate key: {0}")]
    Conflict(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Errors surfaced by the ACL engine.
///
/// Policy decisions are not errors: a denied base query yields an empty or
/// absent result. Only route-guard failures (and deny on update/delete),
/// validation failures, configuration mistakes and store failures surface
/// here.
#[derive(Debug, Error)]
pub enum AclError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("validation failed")]
    Validation { errors: Vec<String> },

    #[error("model '{0}' is not registered")]
    UnknownModel(String),

    #[error("model '{model}' has no sub-document path '{path}'")]
    UnknownSubPath { model: String, path: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("model registry is frozen")]
    RegistryFrozen,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AclError {
    #[must_use]
    pub fn validation(errors: Vec<String>) -> Self {
        Self::Validation { errors }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    #[must_use]
    pub fn unknown_sub_path(model: impl Into<String>, path: impl Into<String>) -> Self {
        Self::UnknownSubPath {
            model: model.into(),
            path: path.into(),
        }
    }

    /// Validation messages, whether raised by the engine or by the store.
    #[must_use]
    pub fn validation_errors(&self) -> Option<&[String]> {
        match self {
            Self::Validation { errors } | Self::Store(StoreError::Validation { errors }) => {
                Some(errors)
            }
            _ => None,
        }
    }
}
