use super::record_id;
use crate::error::ApiResult;
use crate::AppState;
use api_shared::dto::{CountRes, ErrorRes, NotificationRes};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use mindcare_core::Identity;

#[utoipa::path(
    get,
    path = "/notifications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's notifications, newest first", body = [NotificationRes])
    )
)]
#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<Json<Vec<NotificationRes>>> {
    let notifications = state.core.notifications.list(&caller)?;
    Ok(Json(
        notifications.into_iter().map(NotificationRes::from).collect(),
    ))
}

#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked read", body = NotificationRes),
        (status = 404, description = "No such notification for the caller", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<NotificationRes>> {
    let notification = state.core.notifications.mark_read(&caller, record_id(&id)?)?;
    Ok(Json(notification.into()))
}

#[utoipa::path(
    put,
    path = "/notifications/read-all",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Number of notifications marked read", body = CountRes)
    )
)]
#[axum::debug_handler]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<Json<CountRes>> {
    let count = state.core.notifications.mark_all_read(&caller)?;
    Ok(Json(CountRes { count }))
}

#[utoipa::path(
    delete,
    path = "/notifications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Number of notifications deleted", body = CountRes)
    )
)]
#[axum::debug_handler]
pub async fn delete_all(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<Json<CountRes>> {
    let count = state.core.notifications.delete_all(&caller)?;
    Ok(Json(CountRes { count }))
}
