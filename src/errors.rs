use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::sync_models::FallbackKind;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Transport failure talking to the sync source (network, timeout).
    ExternalApiError(String),
    /// Sync source answered with a non-success status.
    UpstreamStatus { status: u16, body: String },
    /// Sync source answered 2xx with a body that is not a sync payload.
    DecodeError(String),
    /// Sync source reported its own failure through the `error` field.
    SourceReported(String),
    /// Resource not found error.
    NotFound(String),
    /// Request conflicts with an operation already in progress.
    Conflict(String),
    /// Internal server error.
    InternalError(String),
}

impl AppError {
    /// Classification used in sync reports when this error triggers a fallback.
    pub fn fallback_kind(&self) -> FallbackKind {
        match self {
            AppError::UpstreamStatus { .. } => FallbackKind::Status,
            AppError::DecodeError(_) => FallbackKind::Decode,
            AppError::SourceReported(_) => FallbackKind::SourceReported,
            _ => FallbackKind::Transport,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::UpstreamStatus { status, body } => {
                write!(f, "Sync source returned {}: {}", status, body)
            }
            AppError::DecodeError(msg) => write!(f, "Invalid sync payload: {}", msg),
            AppError::SourceReported(msg) => write!(f, "Sync source reported error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ExternalApiError(_)
            | AppError::UpstreamStatus { .. }
            | AppError::DecodeError(_)
            | AppError::SourceReported(_) => {
                tracing::error!("Sync source error: {}", self);
                (
                    StatusCode::BAD_GATEWAY,
                    "External service error".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::DecodeError(err.to_string())
        } else {
            AppError::ExternalApiError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_kind_classification() {
        assert_eq!(
            AppError::ExternalApiError("refused".into()).fallback_kind(),
            FallbackKind::Transport
        );
        assert_eq!(
            AppError::UpstreamStatus {
                status: 500,
                body: String::new()
            }
            .fallback_kind(),
            FallbackKind::Status
        );
        assert_eq!(
            AppError::DecodeError("eof".into()).fallback_kind(),
            FallbackKind::Decode
        );
        assert_eq!(
            AppError::SourceReported("x".into()).fallback_kind(),
            FallbackKind::SourceReported
        );
    }

    #[test]
    fn test_status_codes() {
        let response = AppError::Conflict("busy".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::NotFound("none".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::SourceReported("x".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_display_includes_status() {
        let err = AppError::UpstreamStatus {
            status: 503,
            body: "down".to_string(),
        };
        assert_eq!(err.to_string(), "Sync source returned 503: down");
    }
}
