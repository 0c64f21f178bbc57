//! Patient-therapist messaging.

use super::record_id;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::AppState;
use api_shared::dto::{ChatMessageRes, ChatThreadRes, ErrorRes, SendMessageReq};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use mindcare_core::Identity;

#[utoipa::path(
    post,
    path = "/chat/messages",
    security(("bearer" = [])),
    request_body = SendMessageReq,
    responses(
        (status = 201, description = "Message sent", body = ChatMessageRes),
        (status = 400, description = "Empty or oversized message", body = ErrorRes),
        (status = 403, description = "Recipient role not allowed for the caller", body = ErrorRes),
        (status = 404, description = "Unknown recipient or thread", body = ErrorRes)
    )
)]
/// Send a message into an existing thread, or to a recipient (reusing or opening their thread).
#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    ApiJson(req): ApiJson<SendMessageReq>,
) -> ApiResult<(StatusCode, Json<ChatMessageRes>)> {
    let message = state.core.chat.send(&caller, req.try_into()?)?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

#[utoipa::path(
    get,
    path = "/chat/threads",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's threads, most recent activity first", body = [ChatThreadRes]),
        (status = 403, description = "Admins have no threads", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_threads(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> ApiResult<Json<Vec<ChatThreadRes>>> {
    let threads = state.core.chat.list_threads(&caller)?;
    Ok(Json(threads.into_iter().map(ChatThreadRes::from).collect()))
}

#[utoipa::path(
    get,
    path = "/chat/threads/{id}/messages",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Thread id")),
    responses(
        (status = 200, description = "Messages in send order", body = [ChatMessageRes]),
        (status = 404, description = "No such thread visible to the caller", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn thread_messages(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ChatMessageRes>>> {
    let messages = state.core.chat.messages(&caller, record_id(&id)?)?;
    Ok(Json(messages.into_iter().map(ChatMessageRes::from).collect()))
}
