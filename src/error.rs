use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use thiserror::Error;

use crate::services::booking::{BookingError, RideError};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    TooManyRequests(String),
    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Infrastructure detail stays in the logs
        let message = match &self {
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal server error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(format!("Database error: {}", err))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict => {
                AppError::Conflict("Ride was modified concurrently, please retry".to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::RideNotFound | BookingError::BookingNotFound => {
                AppError::NotFound(err.to_string())
            }
            BookingError::Rejected(_)
            | BookingError::Conflict(_)
            | BookingError::RideClosed(_)
            | BookingError::BookingCancelled => AppError::BadRequest(err.to_string()),
            BookingError::Busy => AppError::Conflict(err.to_string()),
            BookingError::Store { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl From<RideError> for AppError {
    fn from(err: RideError) -> Self {
        match err {
            RideError::NotFound | RideError::NotOwner => AppError::NotFound(err.to_string()),
            RideError::Invalid(_)
            | RideError::Lifecycle(_)
            | RideError::HasPassengers => AppError::BadRequest(err.to_string()),
            RideError::Busy => AppError::Conflict(err.to_string()),
            RideError::Store(_) => AppError::Internal(err.to_string()),
        }
    }
}
