use std::borrow::Cow;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error types with appropriate HTTP status codes.
///
/// Every failure raised inside the middleware stack or a handler is converted
/// into the single [`ErrorEnvelope`] shape at the outermost layer. Variants
/// carry only what the client is allowed to see; full detail stays in the
/// server-side logs.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Generation backend unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Stable machine-readable error codes. Clients branch on `code`, never on
/// the prose `message`.
pub mod codes {
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const REQUEST_ERROR: &str = "request_error";
    pub const INTERNAL_FAULT: &str = "internal_fault";
}

/// The one JSON body shape every non-2xx response carries.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
    pub request_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Response extension attached by error producers so the envelope middleware
/// can emit the right `code`/`message` without re-deriving them from status.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub code: &'static str,
    pub message: Cow<'static, str>,
}

impl AppError {
    fn context(&self) -> (StatusCode, ErrorContext) {
        match self {
            // Client errors - the message is user-facing by construction
            AppError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorContext {
                    code: codes::VALIDATION_ERROR,
                    message: Cow::Owned(msg.clone()),
                },
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorContext {
                    code: codes::PAYLOAD_TOO_LARGE,
                    message: Cow::Borrowed("Request body exceeds the configured limit."),
                },
            ),
            AppError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorContext {
                    code: codes::RATE_LIMITED,
                    message: Cow::Borrowed("Rate limit exceeded. Please retry later."),
                },
            ),

            // Server errors - never expose internal detail to clients
            AppError::GenerationUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorContext {
                    code: codes::INTERNAL_FAULT,
                    message: Cow::Borrowed(
                        "Generation service is temporarily unavailable. Please try again later.",
                    ),
                },
            ),
            AppError::ConfigError(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorContext {
                    code: codes::INTERNAL_FAULT,
                    message: Cow::Borrowed("Internal server error."),
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log full detail server-side; the client body is built from the
        // sanitized ErrorContext by the envelope middleware.
        match &self {
            AppError::Validation(_) | AppError::PayloadTooLarge | AppError::RateLimited { .. } => {
                tracing::debug!(error = %self, "Request rejected");
            }
            _ => tracing::error!(error = %self, "Request failed"),
        }

        let (status, context) = self.context();
        let mut response = status.into_response();

        if let AppError::RateLimited { retry_after_secs } = &self
            && let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }

        response.extensions_mut().insert(context);
        response
    }
}

/// Fallback `code`/`message` for error responses produced outside our own
/// error type (e.g. Axum extractor rejections, framework-generated 404s).
pub fn fallback_for_status(status: StatusCode) -> (&'static str, &'static str) {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => (
            codes::PAYLOAD_TOO_LARGE,
            "Request body exceeds the configured limit.",
        ),
        StatusCode::TOO_MANY_REQUESTS => (
            codes::RATE_LIMITED,
            "Rate limit exceeded. Please retry later.",
        ),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            (codes::VALIDATION_ERROR, "Invalid request payload.")
        }
        s if s.is_client_error() => (codes::REQUEST_ERROR, "Request failed."),
        _ => (codes::INTERNAL_FAULT, "Internal server error."),
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
