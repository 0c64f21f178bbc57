use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;
use api_shared::dto::{CompanionReq, CompanionRes, ErrorRes};
use axum::extract::State;
use axum::{Extension, Json};
use mindcare_core::Identity;

#[utoipa::path(
    post,
    path = "/companion",
    security(("bearer" = [])),
    request_body = CompanionReq,
    responses(
        (status = 200, description = "Companion reply; crisis replies open with a crisis-line signpost", body = CompanionRes),
        (status = 400, description = "Empty or oversized message", body = ErrorRes),
        (status = 401, description = "Missing or invalid token", body = ErrorRes)
    )
)]
/// Ask the chat companion for a supportive reply.
///
/// The model call blocks, so it runs off the async workers.
#[axum::debug_handler]
pub async fn companion(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    ApiJson(req): ApiJson<CompanionReq>,
) -> ApiResult<Json<CompanionRes>> {
    let text = req.text()?;
    let service = state.core.companion.clone();
    let reply = tokio::task::spawn_blocking(move || service.respond(&caller, &text)).await??;
    Ok(Json(reply.into()))
}
