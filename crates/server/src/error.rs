use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sandbox::{ExecStatus, SandboxError};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidInput(msg) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            // Host-side failures are logged with detail but reported
            // generically, so nothing about the host leaks to callers.
            Self::Sandbox(e) => {
                error!(error = %e, "sandbox failure");
                internal_response()
            }
            Self::Internal(msg) => {
                error!(error = %msg, "internal failure");
                internal_response()
            }
        }
    }
}

fn internal_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": "internal error",
            "status": ExecStatus::InternalError.as_str(),
        })),
    )
        .into_response()
}
