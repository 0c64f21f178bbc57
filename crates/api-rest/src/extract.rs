//! Request authentication and body extraction.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{FromRequest, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use mindcare_core::CoreError;

/// JSON body whose rejections become `400 {"error": "invalid request body"}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Resolve the bearer token to an [`Identity`](mindcare_core::Identity) and attach it to the
/// request extensions.
///
/// The role is read from the stored user rather than the token, so a role change or deletion
/// takes effect on the next request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let claimed = state.verifier.verify_bearer(header).map_err(|err| {
        tracing::debug!("Rejected bearer token: {}", err);
        CoreError::from(err)
    })?;

    let identity = state
        .core
        .users
        .identity_of(claimed.id)?
        .ok_or(CoreError::Unauthenticated)?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
