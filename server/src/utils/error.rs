use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::repository::StoreError;
use crate::schema::ValidationErrors;
use crate::services::onboarding::{self, OnboardingError};
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(ValidationErrors),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::InvalidInput(errors) => {
                warn!(code = self.code(), fields = errors.errors().len(), "Request rejected");
            }
            AppError::ExternalServiceError(msg) | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::OutOfRange(msg) => AppError::ValidationError(msg),
            StoreError::Corrupt(msg) => AppError::InternalServerError(msg),
            StoreError::Database(e) => AppError::DatabaseError(e),
        }
    }
}

impl From<OnboardingError> for AppError {
    fn from(err: OnboardingError) -> Self {
        match err {
            OnboardingError::Busy
            | OnboardingError::AlreadyConnected(_)
            | OnboardingError::NotConnected => AppError::Conflict(err.to_string()),
            // The platform's reason is logged, never shown.
            OnboardingError::CreationFailed(_) => {
                AppError::ExternalServiceError(onboarding::ERROR_MESSAGE.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::ExternalServiceError(msg) => msg.clone(),
            AppError::InvalidInput(_) => "The provided input is invalid".to_string(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
        };

        // Field errors are the only details the client sees
        let details = match &self {
            AppError::InvalidInput(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        };

        error_response(code, public_message, details, status)
    }
}
