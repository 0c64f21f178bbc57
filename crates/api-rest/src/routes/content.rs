//! Self-help content library.

use super::record_id;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;
use api_shared::dto::{ContentQueryParams, ContentRes, ErrorRes, NewContentReq, UpdateContentReq};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use mindcare_core::Identity;

#[utoipa::path(
    get,
    path = "/content",
    security(("bearer" = [])),
    params(ContentQueryParams),
    responses(
        (status = 200, description = "Matching content, newest first", body = [ContentRes]),
        (status = 400, description = "Unknown content type", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_content(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Query(params): Query<ContentQueryParams>,
) -> ApiResult<Json<Vec<ContentRes>>> {
    let query = params.try_into()?;
    let items = state.core.content.list(&caller, &query)?;
    Ok(Json(items.into_iter().map(ContentRes::from).collect()))
}

#[utoipa::path(
    post,
    path = "/content",
    security(("bearer" = [])),
    request_body = NewContentReq,
    responses(
        (status = 201, description = "Content created", body = ContentRes),
        (status = 400, description = "Invalid field", body = ErrorRes),
        (status = 403, description = "Caller is a patient", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create_content(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    ApiJson(req): ApiJson<NewContentReq>,
) -> ApiResult<(StatusCode, Json<ContentRes>)> {
    let content = state.core.content.create(&caller, req.try_into()?)?;
    Ok((StatusCode::CREATED, Json(content.into())))
}

#[utoipa::path(
    get,
    path = "/content/{id}",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Content id")),
    responses(
        (status = 200, description = "The content item", body = ContentRes),
        (status = 404, description = "No such content", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_content(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<ContentRes>> {
    let content = state.core.content.get(&caller, record_id(&id)?)?;
    Ok(Json(content.into()))
}

#[utoipa::path(
    put,
    path = "/content/{id}",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Content id")),
    request_body = UpdateContentReq,
    responses(
        (status = 200, description = "Content updated", body = ContentRes),
        (status = 403, description = "Caller is a patient", body = ErrorRes),
        (status = 404, description = "No such content", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_content(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateContentReq>,
) -> ApiResult<Json<ContentRes>> {
    let id = record_id(&id)?;
    let content = state.core.content.update(&caller, id, req.try_into()?)?;
    Ok(Json(content.into()))
}

#[utoipa::path(
    delete,
    path = "/content/{id}",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Content id")),
    responses(
        (status = 204, description = "Content deleted"),
        (status = 403, description = "Caller is a patient", body = ErrorRes),
        (status = 404, description = "No such content", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn delete_content(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.core.content.delete(&caller, record_id(&id)?)?;
    Ok(StatusCode::NO_CONTENT)
}
