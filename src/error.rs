// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::JwtError;
use crate::database::DatabaseError;
use crate::validation::ValidationErrors;

/// Failure categories, checked instead of concrete variants when choosing a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ClientInput,
    Authentication,
    Authorization,
    NotFound,
    Conflict,
    PayloadTooLarge,
    UnexpectedState,
    Internal,
}

impl ErrorCategory {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCategory::ClientInput => StatusCode::BAD_REQUEST,
            ErrorCategory::Authentication => StatusCode::UNAUTHORIZED,
            ErrorCategory::Authorization => StatusCode::FORBIDDEN,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Conflict => StatusCode::CONFLICT,
            ErrorCategory::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCategory::UnexpectedState => StatusCode::BAD_REQUEST,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Every failure a handler can produce. The only place failures become HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 400 Bad Request
    #[error("{message}")]
    Validation { message: String, details: Vec<String> },
    #[error("{0}")]
    InvalidJson(String),
    #[error("{0}")]
    IncorrectId(String),

    // 401 Unauthorized
    #[error("{0}")]
    Unauthorized(String),

    // 403 Forbidden
    #[error("{0}")]
    Forbidden(String),

    // 404 Not Found
    #[error("{0}")]
    NotFound(String),

    // 409 Conflict
    #[error("{0}")]
    Conflict(String),

    // 413 Payload Too Large
    #[error("{0}")]
    PayloadTooLarge(String),

    // 400, a write touched no rows after its preconditions held
    #[error("{0}")]
    Unexpected(String),

    // 500 Internal Server Error
    #[error("{0}")]
    Internal(String),
}

/// Attached to error responses so the request logger can report them.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Validation { .. } | ApiError::InvalidJson(_) | ApiError::IncorrectId(_) => {
                ErrorCategory::ClientInput
            }
            ApiError::Unauthorized(_) => ErrorCategory::Authentication,
            ApiError::Forbidden(_) => ErrorCategory::Authorization,
            ApiError::NotFound(_) => ErrorCategory::NotFound,
            ApiError::Conflict(_) => ErrorCategory::Conflict,
            ApiError::PayloadTooLarge(_) => ErrorCategory::PayloadTooLarge,
            ApiError::Unexpected(_) => ErrorCategory::UnexpectedState,
            ApiError::Internal(_) => ErrorCategory::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.category().status_code()
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::IncorrectId(_) => "INCORRECT_ID",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::Unexpected(_) => "UNEXPECTED",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "error": true,
            "message": self.to_string(),
            "code": self.error_code(),
        });
        if let ApiError::Validation { details, .. } = self {
            body["details"] = json!(details);
        }
        body
    }
}

impl ApiError {
    pub fn incorrect_id() -> Self {
        ApiError::IncorrectId(CommonMessages::INCORRECT_ID.to_string())
    }

    pub fn unexpected() -> Self {
        ApiError::Unexpected(CommonMessages::UNEXPECTED.to_string())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn payload_too_large(limit: usize) -> Self {
        ApiError::PayloadTooLarge(format!("Request body exceeds {} bytes.", limit))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

/// Messages shared by the user and group endpoints.
pub struct CommonMessages;

impl CommonMessages {
    pub const INCORRECT_ID: &'static str = "Incorrect type of id.";
    pub const UNEXPECTED: &'static str = "Something went wrong.";
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::Validation {
            message: err.to_string(),
            details: err.into_details(),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UniqueViolation(msg) => ApiError::Conflict(msg),
            other => {
                tracing::error!("Persistence failure: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        tracing::error!("Token error: {}", err);
        ApiError::Internal(err.to_string())
    }
}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let report = ErrorReport {
            code: self.error_code(),
            message: self.to_string(),
        };
        let mut response = (self.status_code(), Json(self.to_json())).into_response();
        response.extensions_mut().insert(report);
        response
    }
}
