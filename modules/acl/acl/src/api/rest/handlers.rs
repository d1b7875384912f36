//! Route handlers.
//!
//! Every handler runs behind [`acl_middleware`](super::middleware::acl_middleware),
//! which supplies the [`RequestContext`] and the matched [`RouteTarget`].
//! Missing documents answer `200` with a JSON `null`.

use std::collections::HashMap;

use acl_sdk::{
    AclError, CountRequest, CreateInput, DistinctRequest, Document, ListRequest, ListResult,
    OneOrMany, PopulateSpec, Projection, ReadRequest, Sort, SubRequest,
};
use axum::{Extension, Json};
use axum::extract::{Path, Query};
use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::error::ApiError;
use super::guard::RouteTarget;
use crate::domain::context::RequestContext;

type PathParams = Path<HashMap<String, String>>;

/// Query string accepted by `GET <base>`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub limit: Option<String>,
    pub page: Option<String>,
    pub select: Option<String>,
    pub sort: Option<String>,
    pub populate: Option<String>,
    pub include_permissions: Option<String>,
    pub include_count: Option<String>,
}

impl ListParams {
    fn into_request(self) -> ListRequest {
        let mut request = ListRequest {
            select: self.select.as_deref().map(Projection::from),
            sort: self.sort.as_deref().map(Sort::from).filter(|s| !s.is_empty()),
            populate: populate_param(self.populate),
            limit: self.limit.and_then(|v| v.trim().parse().ok()),
            page: self.page.and_then(|v| v.trim().parse().ok()),
            ..ListRequest::default()
        };
        request.options.include_permissions = flag_unless_false(self.include_permissions.as_deref());
        request.options.include_count = self.include_count.as_deref() == Some("true");
        request
    }
}

/// Query string accepted by `GET <base>/:id`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReadParams {
    pub select: Option<String>,
    pub populate: Option<String>,
    pub include_permissions: Option<String>,
    pub try_list: Option<String>,
}

impl ReadParams {
    fn into_request(self) -> ReadRequest {
        let mut request = ReadRequest {
            select: self.select.as_deref().map(Projection::from),
            populate: populate_param(self.populate),
            ..ReadRequest::default()
        };
        request.options.include_permissions = flag_unless_false(self.include_permissions.as_deref());
        request.options.try_list = self.try_list.as_deref().is_none_or(|v| v == "true");
        request
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateParams {
    pub include_permissions: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SelectParams {
    pub select: Option<String>,
}

impl SelectParams {
    fn into_request(self) -> SubRequest {
        SubRequest {
            select: self.select.as_deref().map(Projection::from),
        }
    }
}

fn flag_unless_false(value: Option<&str>) -> bool {
    value != Some("false")
}

fn populate_param(value: Option<String>) -> Option<OneOrMany<PopulateSpec>> {
    let paths: Vec<PopulateSpec> = value?
        .split([' ', ','])
        .filter(|p| !p.is_empty())
        .map(PopulateSpec::from)
        .collect();
    (!paths.is_empty()).then_some(OneOrMany::Many(paths))
}

fn param<'p>(params: &'p HashMap<String, String>, name: &str) -> Result<&'p str, ApiError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| AclError::bad_request(format!("missing route parameter '{name}'")).into())
}

fn doc_id<'p>(
    ctx: &RequestContext,
    params: &'p HashMap<String, String>,
) -> Result<&'p str, ApiError> {
    param(params, &ctx.registry().root().id_param)
}

fn sub_path(target: &RouteTarget) -> Result<&str, ApiError> {
    target
        .sub
        .as_deref()
        .ok_or_else(|| AclError::configuration("sub-document route without a sub path").into())
}

// ── Collection routes ───────────────────────────────────────────────

pub async fn list(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult>, ApiError> {
    let result = ctx
        .controller(&target.model)?
        .list(params.into_request())
        .await?;
    Ok(Json(result))
}

pub async fn list_query(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Json(request): Json<ListRequest>,
) -> Result<Json<ListResult>, ApiError> {
    let result = ctx.controller(&target.model)?.list(request).await?;
    Ok(Json(result))
}

pub async fn create(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Query(params): Query<CreateParams>,
    Json(input): Json<CreateInput>,
) -> Result<(StatusCode, Json<OneOrMany<Document>>), ApiError> {
    let include_permissions = params
        .include_permissions
        .as_deref()
        .is_none_or(|v| v == "true");
    let created = ctx
        .controller(&target.model)?
        .create(input, include_permissions)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn empty(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(ctx.controller(&target.model)?.empty().await?))
}

pub async fn count(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
) -> Result<Json<Option<u64>>, ApiError> {
    let count = ctx
        .controller(&target.model)?
        .count(CountRequest::default())
        .await?;
    Ok(Json(count))
}

pub async fn count_query(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Json(request): Json<CountRequest>,
) -> Result<Json<Option<u64>>, ApiError> {
    Ok(Json(ctx.controller(&target.model)?.count(request).await?))
}

pub async fn distinct(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
) -> Result<Json<Option<Vec<Value>>>, ApiError> {
    let field = param(&params, "field")?;
    let values = ctx
        .controller(&target.model)?
        .distinct(field, DistinctRequest::default())
        .await?;
    Ok(Json(values))
}

pub async fn distinct_query(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
    Json(request): Json<DistinctRequest>,
) -> Result<Json<Option<Vec<Value>>>, ApiError> {
    let field = param(&params, "field")?;
    let values = ctx
        .controller(&target.model)?
        .distinct(field, request)
        .await?;
    Ok(Json(values))
}

// ── Document routes ─────────────────────────────────────────────────

pub async fn read(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
    Query(query): Query<ReadParams>,
) -> Result<Json<Option<Document>>, ApiError> {
    let id = doc_id(&ctx, &params)?;
    let doc = ctx
        .controller(&target.model)?
        .read(id, query.into_request())
        .await?;
    Ok(Json(doc))
}

pub async fn read_query(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
    Json(request): Json<ReadRequest>,
) -> Result<Json<Option<Document>>, ApiError> {
    let id = doc_id(&ctx, &params)?;
    Ok(Json(ctx.controller(&target.model)?.read(id, request).await?))
}

pub async fn update(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
    Json(data): Json<Document>,
) -> Result<Json<Option<Document>>, ApiError> {
    let id = doc_id(&ctx, &params)?;
    Ok(Json(ctx.controller(&target.model)?.update(id, data).await?))
}

pub async fn delete(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
) -> Result<Json<Option<bool>>, ApiError> {
    let id = doc_id(&ctx, &params)?;
    let removed = ctx.controller(&target.model)?.delete(id).await?;
    Ok(Json(removed.then_some(true)))
}

// ── Sub-document routes ─────────────────────────────────────────────

pub async fn list_sub(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
    Query(query): Query<SelectParams>,
) -> Result<Json<Option<Vec<Document>>>, ApiError> {
    let id = doc_id(&ctx, &params)?;
    let items = ctx
        .controller(&target.model)?
        .list_sub(id, sub_path(&target)?, query.into_request())
        .await?;
    Ok(Json(items))
}

pub async fn list_sub_query(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
    Json(request): Json<SubRequest>,
) -> Result<Json<Option<Vec<Document>>>, ApiError> {
    let id = doc_id(&ctx, &params)?;
    let items = ctx
        .controller(&target.model)?
        .list_sub(id, sub_path(&target)?, request)
        .await?;
    Ok(Json(items))
}

pub async fn read_sub(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
    Query(query): Query<SelectParams>,
) -> Result<Json<Option<Document>>, ApiError> {
    let id = doc_id(&ctx, &params)?;
    let sub_id = param(&params, "subId")?;
    let item = ctx
        .controller(&target.model)?
        .read_sub(id, sub_path(&target)?, sub_id, query.into_request())
        .await?;
    Ok(Json(item))
}

pub async fn read_sub_query(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
    Json(request): Json<SubRequest>,
) -> Result<Json<Option<Document>>, ApiError> {
    let id = doc_id(&ctx, &params)?;
    let sub_id = param(&params, "subId")?;
    let item = ctx
        .controller(&target.model)?
        .read_sub(id, sub_path(&target)?, sub_id, request)
        .await?;
    Ok(Json(item))
}

pub async fn create_sub(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
    Json(data): Json<Document>,
) -> Result<(StatusCode, Json<Option<Document>>), ApiError> {
    let id = doc_id(&ctx, &params)?;
    let item = ctx
        .controller(&target.model)?
        .create_sub(id, sub_path(&target)?, data)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_sub(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
    Json(data): Json<Document>,
) -> Result<Json<Option<Document>>, ApiError> {
    let id = doc_id(&ctx, &params)?;
    let sub_id = param(&params, "subId")?;
    let item = ctx
        .controller(&target.model)?
        .update_sub(id, sub_path(&target)?, sub_id, data)
        .await?;
    Ok(Json(item))
}

pub async fn delete_sub(
    Extension(ctx): Extension<RequestContext>,
    Extension(target): Extension<RouteTarget>,
    Path(params): PathParams,
) -> Result<Json<Option<bool>>, ApiError> {
    let id = doc_id(&ctx, &params)?;
    let sub_id = param(&params, "subId")?;
    let removed = ctx
        .controller(&target.model)?
        .delete_sub(id, sub_path(&target)?, sub_id)
        .await?;
    Ok(Json(removed.then_some(true)))
}
