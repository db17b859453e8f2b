//! Error handling for the web UI.
//!
//! One [`ApiError`] value carries status, code and message; the JSON route
//! returns it as `{"error": {code, message}}`, the HTML routes wrap it in
//! [`PageError`] to render the error page instead.

use crate::error::AnalystError;
use crate::server::views::ErrorPage;
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<AnalystError> for ApiError {
    fn from(err: AnalystError) -> Self {
        let message = err.to_string();
        let (status, code) = match err {
            AnalystError::EmptyUpload => (StatusCode::BAD_REQUEST, "EMPTY_UPLOAD"),
            AnalystError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AnalystError::UnsupportedUpload { .. } => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_UPLOAD")
            }
            AnalystError::NotAPdf { .. } => (StatusCode::UNSUPPORTED_MEDIA_TYPE, "NOT_A_PDF"),
            AnalystError::FileNotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AnalystError::PermissionDenied { .. } => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            AnalystError::CorruptPdf { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "CORRUPT_PDF"),
            AnalystError::PasswordRequired { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PASSWORD_REQUIRED")
            }
            AnalystError::WrongPassword { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "WRONG_PASSWORD")
            }
            AnalystError::NoExtractableText { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NO_EXTRACTABLE_TEXT")
            }
            AnalystError::ProviderNotConfigured { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_NOT_CONFIGURED")
            }
            AnalystError::LlmApiError { .. } | AnalystError::DownloadFailed { .. } => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            AnalystError::EmptyResponse => (StatusCode::BAD_GATEWAY, "EMPTY_RESPONSE"),
            AnalystError::ApiTimeout { .. } | AnalystError::DownloadTimeout { .. } => {
                (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT")
            }
            AnalystError::OutputWriteFailed { .. }
            | AnalystError::InvalidConfig(_)
            | AnalystError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        ApiError::new(status, code, message)
    }
}

/// [`ApiError`] rendered as the HTML error page.
#[derive(Debug)]
pub struct PageError(pub ApiError);

impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        PageError(err)
    }
}

impl From<AnalystError> for PageError {
    fn from(err: AnalystError) -> Self {
        PageError(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let ApiError {
            status,
            code,
            message,
        } = self.0;
        let page = ErrorPage::new(&code, &message);
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            // Fall back to plain text rather than losing the original error.
            Err(_) => (status, format!("{code}: {message}")).into_response(),
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn upload_errors_are_client_errors() {
        let e: ApiError = AnalystError::UnsupportedUpload {
            file_name: "a.txt".into(),
        }
        .into();
        assert_eq!(e.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(e.code, "UNSUPPORTED_UPLOAD");

        let e: ApiError = AnalystError::NoExtractableText {
            path: PathBuf::from("scan.pdf"),
            pages: 2,
        }
        .into();
        assert!(e.status.is_client_error());
    }

    #[test]
    fn llm_failures_are_gateway_errors() {
        let e: ApiError = AnalystError::LlmApiError {
            message: "503".into(),
        }
        .into();
        assert_eq!(e.status, StatusCode::BAD_GATEWAY);

        let e: ApiError = AnalystError::ApiTimeout { secs: 5 }.into();
        assert_eq!(e.status, StatusCode::GATEWAY_TIMEOUT);
        assert!(e.message.contains("5s"));
    }
}
