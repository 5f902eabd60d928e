use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dagrelay_core::error::CoreError;

use crate::response::ErrorResponse;

/// Prefix on every error message returned to callers.
pub const ERROR_PREFIX: &str = "Failed to trigger DAG";

/// Message returned in place of internal error details.
pub const GENERIC_INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and adds a variant for extractor failures.
/// Implements [`IntoResponse`] to produce the `{status:"error", message}`
/// envelope with the matching status code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A failure from normalization or the relay.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The inbound request could not be read at all.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status and caller-visible detail for this error.
    pub fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            AppError::Core(core) => match core {
                CoreError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CoreError::AuthFailure(msg) => (StatusCode::FORBIDDEN, msg.clone()),
                CoreError::Upstream(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        GENERIC_INTERNAL_MESSAGE.to_string(),
                    )
                }
            },
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        let body = ErrorResponse::new(format!("{ERROR_PREFIX}: {detail}"));
        (status, axum::Json(body)).into_response()
    }
}
