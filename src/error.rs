use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::validation::ValidationError;

/// Message shared by 403 and 404 so callers cannot probe for other users' rows.
pub const NOT_ALLOWED_OR_NOT_FOUND: &str = "not allowed or not found";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn already_resolved() -> Self {
        AppError::Conflict("request already resolved".to_string())
    }

    pub fn already_finished() -> Self {
        AppError::Conflict("exchange already finished".to_string())
    }

    pub fn listing_unavailable(listing_id: i64) -> Self {
        AppError::Conflict(format!("listing {} unavailable", listing_id))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Unavailable(_))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::InvalidArgument(msg) => msg.clone(),
            AppError::Unauthenticated => "authentication required".to_string(),
            AppError::Forbidden(_) | AppError::NotFound(_) => NOT_ALLOWED_OR_NOT_FOUND.to_string(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::Unavailable(_) => "temporarily unavailable, retry".to_string(),
            AppError::Database(_) | AppError::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => AppError::Unavailable("connection pool exhausted".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("55P03") | Some("57014") => AppError::Unavailable("lock wait timed out".to_string()),
                Some("40P01") => AppError::Unavailable("deadlock detected".to_string()),
                Some("40001") => AppError::Unavailable("serialization failure".to_string()),
                Some("23505") => AppError::Conflict(
                    "a pending request already exists for this listing pair".to_string(),
                ),
                Some("23514") => AppError::InvalidArgument(db_err.message().to_string()),
                _ => AppError::Database(err),
            },
            _ => AppError::Database(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidArgument(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = ?self, "request failed with internal error");
            }
            AppError::Unavailable(reason) => {
                tracing::warn!(reason = %reason, "request failed with retryable contention");
            }
            _ => {}
        }

        let mut body = json!({
            "error": self.public_message(),
            "status": status.as_u16(),
        });
        if self.is_retryable() {
            body["retryable"] = json!(true);
        }

        (status, Json(body)).into_response()
    }
}
