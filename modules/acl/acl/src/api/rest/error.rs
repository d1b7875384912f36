use acl_sdk::{AclError, StoreError};
use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;

/// [`AclError`] as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AclError);

impl From<AclError> for ApiError {
    fn from(err: AclError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        acl_error_to_response(self.0)
    }
}

fn message(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

/// Convert `AclError` to an HTTP response.
fn acl_error_to_response(err: AclError) -> Response {
    match err {
        AclError::Validation { errors } | AclError::Store(StoreError::Validation { errors }) => {
            tracing::debug!(errors = errors.len(), "validation failed");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "validation failed", "errors": errors })),
            )
                .into_response()
        }
        AclError::Unauthorized => {
            tracing::debug!("request rejected: unauthorized");
            message(StatusCode::UNAUTHORIZED, "Unauthorized")
        }
        AclError::BadRequest(msg) => {
            tracing::debug!("bad request: {msg}");
            message(StatusCode::BAD_REQUEST, msg)
        }
        AclError::UnknownModel(_) | AclError::UnknownSubPath { .. } => {
            tracing::debug!("{err}");
            message(StatusCode::NOT_FOUND, err.to_string())
        }
        AclError::Store(StoreError::Conflict(key)) => {
            tracing::debug!("duplicate key: {key}");
            message(StatusCode::CONFLICT, format!("duplicate key: {key}"))
        }
        AclError::Configuration(_)
        | AclError::RegistryFrozen
        | AclError::Store(_) => {
            tracing::error!(error = %err, "ACL request failed");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
