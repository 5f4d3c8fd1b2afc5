use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Course is not published")]
    NotPublished,

    #[error("Not enrolled in this course")]
    NotEnrolled,

    #[error("Course already reviewed")]
    DuplicateReview,

    #[error("Course has reached maximum enrollment capacity")]
    Capacity,

    #[error("Course requires manual enrollment by the instructor")]
    EnrollmentType,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(what.to_string())
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Permission(_) => "permission_denied",
            AppError::NotPublished => "not_published",
            AppError::NotEnrolled => "not_enrolled",
            AppError::DuplicateReview => "duplicate_review",
            AppError::Capacity => "capacity_reached",
            AppError::EnrollmentType => "enrollment_type",
            AppError::Conflict(_) => "conflict",
            AppError::Upstream(_) => "upstream_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::NotPublished | AppError::EnrollmentType => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Permission(_) | AppError::NotEnrolled => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateReview | AppError::Capacity | AppError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Maps a UNIQUE constraint violation to `on_unique`, everything else to `Database`.
pub fn map_unique_violation(err: sqlx::Error, on_unique: AppError) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => on_unique,
        _ => AppError::Database(err),
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(code: &'static str, message: String) -> Self {
        Self {
            status: "error",
            error: ErrorBody { code, message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                error!("database error: {}", e);
                "Database error occurred".to_string()
            }
            AppError::Upstream(e) => {
                error!("upstream error: {}", e);
                "Upstream service unavailable".to_string()
            }
            AppError::Internal(e) => {
                error!("internal error: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse::new(self.code(), message))).into_response()
    }
}
