//! Unified error model
//! Every failure surfaced by the service layer and the authorization gate, plus the HTTP mapping

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::{
    auth::password::HashingError, concurrency::PoolError, middleware::current_request_id,
    repository::RepositoryError,
};

/// Generic message for every credential failure on login.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Toggle diagnostic detail in 5xx bodies. Set once at startup from `server.expose_error_details`.
pub fn set_expose_details(enabled: bool) {
    EXPOSE_DETAILS.store(enabled, Ordering::Relaxed);
}

fn expose_details() -> bool {
    EXPOSE_DETAILS.load(Ordering::Relaxed)
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    DuplicateUser(String),

    #[error("{0}")]
    Authentication(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] HashingError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service busy: {0}")]
    ServiceBusy(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateUser(_) => StatusCode::CONFLICT,
            AppError::Authentication(_) | AppError::InvalidToken | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceBusy(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Hashing(_)
            | AppError::Repository(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing message. Infrastructure errors never leak their cause here.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::DuplicateUser(msg)
            | AppError::Authentication(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::InvalidToken => "Invalid or expired token".to_string(),
            AppError::Unauthorized => "Authentication required".to_string(),
            AppError::Forbidden => "Access denied".to_string(),
            AppError::ServiceBusy(_) => "Service temporarily unavailable".to_string(),
            AppError::Hashing(_) => "Password processing failed".to_string(),
            AppError::Repository(_) => "Database error occurred".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    fn from_error(err: &AppError, expose: bool) -> Self {
        let details = (expose && err.is_server_error()).then(|| err.to_string());
        ErrorResponse {
            error: ErrorDetail {
                code: err.code(),
                message: err.user_message(),
                request_id: current_request_id()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::from_error(&self, expose_details());

        if self.is_server_error() {
            tracing::error!(
                code = body.error.code,
                message = %self,
                request_id = %body.error.request_id,
                "Application error"
            );
        } else {
            tracing::debug!(
                code = body.error.code,
                message = %self,
                request_id = %body.error.request_id,
                "Request rejected"
            );
        }

        (status, Json(body)).into_response()
    }
}

/// Any body the JSON extractor refuses is a client error
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PoolError> for AppError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::AcquireTimeout { .. } => AppError::ServiceBusy(e.to_string()),
            PoolError::Closed | PoolError::TaskFailed(_) => AppError::Internal(e.to_string()),
        }
    }
}
