use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::DbErr;
use thiserror::Error;
use tracing::error;

use crate::schemas::ApiResponse;

/// Error taxonomy for the HTTP layer. Every handler returns `Result<_, ApiError>`
/// and the envelope rendering happens in one place, in [`IntoResponse`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DbErr),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Turns a unique-constraint violation into a 409 with the given message;
/// any other database error is passed through as a 500.
pub fn unique_conflict(err: DbErr, message: &str) -> ApiError {
    if matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    ) {
        ApiError::Conflict(message.to_string())
    } else {
        ApiError::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Server-side failures are logged with detail but never leaked to clients.
        let message = match &self {
            ApiError::Database(err) => {
                error!("database error: {err}");
                "Internal Server Error.".to_string()
            }
            ApiError::Internal(err) => {
                error!("internal error: {err:#}");
                "Internal Server Error.".to_string()
            }
            other => other.to_string(),
        };

        let body = ApiResponse::<()> {
            status_code: status.as_u16(),
            message,
            data: None,
        };
        (status, Json(body)).into_response()
    }
}
