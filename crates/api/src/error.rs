use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quiet_core::error::CoreError;
use quiet_db::service::WindowError;
use quiet_db::store::StoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`StoreError`] for persistence
/// failures. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `quiet_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A window store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<WindowError> for AppError {
    fn from(err: WindowError) -> Self {
        match err {
            WindowError::Core(e) => Self::Core(e),
            WindowError::Store(e) => Self::Store(e),
        }
    }
}

/// Malformed or incomplete JSON bodies are validation failures.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Core(CoreError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Store errors ---
            AppError::Store(err) => classify_store_error(err),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn unavailable() -> (StatusCode, &'static str, String) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "SERVICE_UNAVAILABLE",
        "Storage is temporarily unavailable, please retry".to_string(),
    )
}

/// Classify a store error into an HTTP status, error code, and message.
///
/// - `Overlap` (exclusion constraint or atomic re-check) maps to 409.
/// - Connectivity problems map to 503 so clients know to retry.
/// - Everything else maps to 500 with a sanitized message.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::Overlap => (
            StatusCode::CONFLICT,
            "CONFLICT",
            quiet_db::overlap::CONFLICT_MESSAGE.to_string(),
        ),
        StoreError::Unavailable(msg) => {
            tracing::warn!(error = %msg, "Store unavailable");
            unavailable()
        }
        StoreError::Database(db_err) => match db_err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                tracing::warn!(error = %db_err, "Database unreachable");
                unavailable()
            }
            other => {
                tracing::error!(error = %other, "Database error");
                internal()
            }
        },
    }
}
