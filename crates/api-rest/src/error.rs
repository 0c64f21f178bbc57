//! HTTP error mapping.
//!
//! Every failure leaves the API as a status code and a generic `{"error": "..."}` body. Storage
//! and companion failures are logged and reported as `internal error`; no record content is ever
//! echoed back in an error body.

use api_shared::dto::ErrorRes;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mindcare_core::{CoreError, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("invalid request body")]
    BadBody(String),
    #[error("background task failed: {0}")]
    Join(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadBody(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Join(err.to_string())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Core(err) => match err.kind() {
                ErrorKind::Unauthenticated => {
                    (StatusCode::UNAUTHORIZED, "authentication required".into())
                }
                ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "forbidden".into()),
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not found".into()),
                ErrorKind::Validation => (StatusCode::BAD_REQUEST, err.to_string()),
                ErrorKind::Conflict => (StatusCode::CONFLICT, err.to_string()),
                ErrorKind::Internal => {
                    tracing::error!("Core error: {:?}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
                }
            },
            ApiError::BadBody(detail) => {
                tracing::debug!("Rejected request body: {}", detail);
                (StatusCode::BAD_REQUEST, "invalid request body".into())
            }
            ApiError::Join(detail) => {
                tracing::error!("Blocking task failed: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_message();
        (status, Json(ErrorRes { error })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CoreError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn core_errors_map_to_statuses() {
        assert_eq!(status_of(CoreError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(CoreError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_of(CoreError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(CoreError::NotAssigned), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(CoreError::InvalidInput("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoreError::Conflict("email".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CoreError::StoreLockPoisoned),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_stay_out_of_the_body() {
        let err = ApiError::from(CoreError::Companion("cannot reach http://10.0.0.5".into()));
        let (_, message) = err.status_and_message();
        assert_eq!(message, "internal error");
    }
}
