use std::collections::BTreeMap;
use std::sync::Arc;

use acl_sdk::AclError;
use acl_security::{Access, GuardKey};
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{self, MethodRouter};
use http::Method;

use super::guard::{RoutePolicyBuilder, RouteTarget, to_matchit_path};
use super::handlers;
use super::middleware::{AclState, acl_middleware};
use crate::domain::service::AclService;
use crate::registry::ModelOptions;

/// One generated route, path in `:param` syntax.
struct RouteSpec {
    method: Method,
    path: String,
    guard: Option<GuardKey>,
    sub: Option<String>,
    handler: MethodRouter,
}

impl RouteSpec {
    fn new(method: Method, path: String, guard: Option<GuardKey>, handler: MethodRouter) -> Self {
        Self {
            method,
            path,
            guard,
            sub: None,
            handler,
        }
    }

    fn guarded(method: Method, path: String, access: Access, handler: MethodRouter) -> Self {
        Self::new(method, path, Some(access.into()), handler)
    }

    fn sub(method: Method, path: String, sub: &str, access: Access, handler: MethodRouter) -> Self {
        Self {
            method,
            path,
            guard: Some(GuardKey::sub(sub, access)),
            sub: Some(sub.to_owned()),
            handler,
        }
    }
}

fn model_routes(options: &ModelOptions, base: &str, id_param: &str) -> Vec<RouteSpec> {
    let doc = format!("{base}/:{id_param}");

    let mut routes = vec![
        RouteSpec::guarded(Method::GET, base.to_owned(), Access::List, routing::get(handlers::list)),
        RouteSpec::guarded(
            Method::POST,
            format!("{base}/__query"),
            Access::List,
            routing::post(handlers::list_query),
        ),
        RouteSpec::guarded(Method::POST, base.to_owned(), Access::Create, routing::post(handlers::create)),
        RouteSpec::new(Method::GET, format!("{base}/new"), None, routing::get(handlers::empty)),
        RouteSpec::guarded(
            Method::GET,
            format!("{base}/count"),
            Access::Count,
            routing::get(handlers::count),
        ),
        RouteSpec::guarded(
            Method::POST,
            format!("{base}/count"),
            Access::Count,
            routing::post(handlers::count_query),
        ),
        RouteSpec::guarded(
            Method::GET,
            format!("{base}/distinct/:field"),
            Access::Distinct,
            routing::get(handlers::distinct),
        ),
        RouteSpec::guarded(
            Method::POST,
            format!("{base}/distinct/:field"),
            Access::Distinct,
            routing::post(handlers::distinct_query),
        ),
        RouteSpec::guarded(Method::GET, doc.clone(), Access::Read, routing::get(handlers::read)),
        RouteSpec::guarded(
            Method::POST,
            format!("{base}/__query/:{id_param}"),
            Access::Read,
            routing::post(handlers::read_query),
        ),
        RouteSpec::guarded(Method::PUT, doc.clone(), Access::Update, routing::put(handlers::update)),
        RouteSpec::guarded(Method::DELETE, doc.clone(), Access::Delete, routing::delete(handlers::delete)),
    ];

    for sub in options.sub_paths() {
        let collection = format!("{doc}/{sub}");
        let element = format!("{collection}/:subId");
        routes.extend([
            RouteSpec::sub(Method::GET, collection.clone(), sub, Access::List, routing::get(handlers::list_sub)),
            RouteSpec::sub(
                Method::POST,
                format!("{collection}/__query"),
                sub,
                Access::List,
                routing::post(handlers::list_sub_query),
            ),
            RouteSpec::sub(Method::POST, collection, sub, Access::Create, routing::post(handlers::create_sub)),
            RouteSpec::sub(Method::GET, element.clone(), sub, Access::Read, routing::get(handlers::read_sub)),
            RouteSpec::sub(
                Method::POST,
                format!("{element}/__query"),
                sub,
                Access::Read,
                routing::post(handlers::read_sub_query),
            ),
            RouteSpec::sub(Method::PUT, element.clone(), sub, Access::Update, routing::put(handlers::update_sub)),
            RouteSpec::sub(Method::DELETE, element, sub, Access::Delete, routing::delete(handlers::delete_sub)),
        ]);
    }

    routes
}

/// Builds the REST router for every registered model and freezes the
/// registry.
///
/// Routes are mounted under the configured API prefix. Each request passes
/// through [`acl_middleware`] before reaching its handler.
///
/// # Errors
///
/// Returns [`AclError::Configuration`] if two models produce conflicting
/// routes.
pub fn router(service: Arc<AclService>) -> Result<Router, AclError> {
    service.registry().freeze();
    let snapshot = service.registry().snapshot();
    let root = snapshot.root();

    let mut policy = RoutePolicyBuilder::default();
    let mut paths: BTreeMap<String, MethodRouter> = BTreeMap::new();

    for (model, options) in snapshot.models() {
        let base = options.base_url().resolve(model);
        for spec in model_routes(options, &base, &root.id_param) {
            tracing::debug!(model, method = %spec.method, path = %spec.path, "registering ACL route");
            policy.insert(
                spec.method.clone(),
                &spec.path,
                RouteTarget {
                    model: model.to_owned(),
                    guard: spec.guard,
                    sub: spec.sub,
                },
            )?;

            let path = to_matchit_path(&spec.path);
            let handler = match paths.remove(&path) {
                Some(existing) => existing.merge(spec.handler),
                None => spec.handler,
            };
            paths.insert(path, handler);
        }
    }

    if paths.is_empty() {
        tracing::warn!("no models registered; ACL router is empty");
        return Ok(Router::new());
    }

    let route_count = paths.len();
    let state = AclState {
        service: Arc::clone(&service),
        route_policy: policy.build(),
    };
    let inner = paths
        .into_iter()
        .fold(Router::new(), |router, (path, handler)| router.route(&path, handler))
        .route_layer(from_fn_with_state(state, acl_middleware));

    let prefix = root.api_prefix.trim_matches('/');
    tracing::info!(routes = route_count, prefix = %root.api_prefix, "ACL routes registered");
    if prefix.is_empty() {
        Ok(inner)
    } else {
        Ok(Router::new().nest(&format!("/{prefix}"), inner))
    }
}
