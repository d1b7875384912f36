use std::sync::Arc;

use acl_sdk::AclError;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::StatusCode;

use super::error::ApiError;
use super::guard::RoutePolicy;
use crate::domain::service::AclService;

/// Shared state for the ACL middleware.
#[derive(Clone)]
pub struct AclState {
    pub service: Arc<AclService>,
    pub route_policy: RoutePolicy,
}

/// Builds the request context and enforces the route guard.
///
/// For each request:
/// 1. Resolves the route target via [`RoutePolicy`]
/// 2. Derives the caller's permission set
/// 3. Evaluates the route guard; a deny answers 401 before any handler runs
/// 4. Inserts the `RequestContext` and `RouteTarget` into the extensions
pub async fn acl_middleware(
    State(state): State<AclState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(target) = state
        .route_policy
        .resolve(req.method(), req.uri().path())
        .cloned()
    else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let permissions = match state.service.resolve_permissions(req.headers()).await {
        Ok(permissions) => permissions,
        Err(err) => return ApiError(err).into_response(),
    };
    let ctx = state.service.context(permissions);

    if let Some(guard) = &target.guard {
        match ctx.is_allowed(&target.model, guard).await {
            Ok(true) => {}
            Ok(false) => return ApiError(AclError::Unauthorized).into_response(),
            Err(err) => return ApiError(err).into_response(),
        }
    }

    req.extensions_mut().insert(ctx);
    req.extensions_mut().insert(target);
    next.run(req).await
}
