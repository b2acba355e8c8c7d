//! Error types for document-gateway
//!
//! This module provides the error handling for the crate, including:
//! - The top-level [`Error`] enum used by every service operation
//! - [`UpstreamError`], the typed outcome of a failed upstream call
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::DocumentId;

/// Result type alias for document-gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for document-gateway
///
/// Each variant carries enough context to log the failure; [`ApiError`]
/// conversion decides how much of it reaches the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "upstream.base_url")
        key: Option<String>,
    },

    /// Request input rejected before any upstream call
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing, malformed, expired or unverifiable credential
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Valid credential without the required group, role or scope
    #[error("forbidden: {0}")]
    Authorization(String),

    /// A single requested document does not exist upstream
    #[error("document {id} not found")]
    DocumentNotFound {
        /// The requested document identifier
        id: DocumentId,
    },

    /// None of the documents in a batch could be fetched
    #[error("none of the {} requested documents could be retrieved", document_ids.len())]
    AllDocumentsUnavailable {
        /// Every identifier of the batch (all were missing or failed)
        document_ids: Vec<DocumentId>,
    },

    /// Upstream document API call failed
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Packaged attachment exceeds the mail size limit
    #[error("attachment of {size} bytes exceeds the limit of {limit} bytes")]
    AttachmentTooLarge {
        /// Size of the packaged attachment in bytes
        size: usize,
        /// Configured maximum in bytes
        limit: usize,
    },

    /// Mail collaborator rejected or failed to send the message
    #[error("email delivery failed: {0}")]
    Email(String),

    /// Archive creation failed
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error outside the upstream gateway (JWKS, Graph)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Failure of a single call to the upstream document API
///
/// Produced by the explicit mapping in [`crate::upstream`]; never carries
/// a not-found response, which is a successful `None` outcome instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// The call did not complete within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Could not connect to the upstream host
    #[error("connection failed: {0}")]
    Connection(String),

    /// Upstream rejected the gateway's own credentials
    #[error("upstream rejected credentials (status {status})")]
    Unauthorized {
        /// HTTP status returned by upstream (401 or 403)
        status: u16,
    },

    /// Any other non-success status
    #[error("upstream returned status {status}")]
    Status {
        /// HTTP status returned by upstream
        status: u16,
    },

    /// Upstream answered with a body the gateway could not interpret
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    /// The fetch task was cancelled or panicked before producing a result
    #[error("fetch aborted: {0}")]
    Aborted(String),
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "all_documents_unavailable",
///     "message": "none of the 2 requested documents could be retrieved",
///     "details": {
///       "document_ids": ["A", "B"]
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "document_not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }

    /// Create a "forbidden" error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("forbidden", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 500,

            // 401 / 403 - Authorization gate
            Error::Authentication(_) => 401,
            Error::Authorization(_) => 403,

            // 404 Not Found
            Error::DocumentNotFound { .. } => 404,
            Error::AllDocumentsUnavailable { .. } => 404,

            // 413 / 422 - Rejected input
            Error::AttachmentTooLarge { .. } => 413,
            Error::Validation(_) => 422,

            // 502 / 504 - External service errors
            Error::Upstream(UpstreamError::Timeout(_)) => 504,
            Error::Upstream(_) => 502,
            Error::Email(_) => 502,
            Error::Network(_) => 502,

            // 500 Internal Server Error
            Error::Archive(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Authentication(_) => "unauthorized",
            Error::Authorization(_) => "forbidden",
            Error::DocumentNotFound { .. } => "document_not_found",
            Error::AllDocumentsUnavailable { .. } => "all_documents_unavailable",
            Error::Upstream(e) => match e {
                UpstreamError::Timeout(_) => "upstream_timeout",
                UpstreamError::Connection(_) => "upstream_unavailable",
                UpstreamError::Unauthorized { .. } => "upstream_auth_failed",
                UpstreamError::Status { .. } => "upstream_error",
                UpstreamError::InvalidResponse(_) => "upstream_invalid_response",
                UpstreamError::Aborted(_) => "upstream_error",
            },
            Error::AttachmentTooLarge { .. } => "attachment_too_large",
            Error::Email(_) => "email_delivery_failed",
            Error::Archive(_) => "internal_error",
            Error::Io(_) => "internal_error",
            Error::Network(_) => "network_error",
            Error::ApiServerError(_) => "internal_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl Error {
    /// Whether the error is an internal fault whose message must not reach callers
    pub fn is_internal(&self) -> bool {
        self.status_code() == 500
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();

        // Internal faults are logged with full context by the response layer;
        // callers only ever see a generic message.
        let message = if error.is_internal() {
            "internal server error".to_string()
        } else {
            error.to_string()
        };

        let details = match &error {
            Error::DocumentNotFound { id } => Some(serde_json::json!({
                "document_id": id,
            })),
            Error::AllDocumentsUnavailable { document_ids } => Some(serde_json::json!({
                "document_ids": document_ids,
            })),
            Error::AttachmentTooLarge { size, limit } => Some(serde_json::json!({
                "size_bytes": size,
                "limit_bytes": limit,
            })),
            Error::Upstream(UpstreamError::Status { status })
            | Error::Upstream(UpstreamError::Unauthorized { status }) => {
                Some(serde_json::json!({
                    "upstream_status": status,
                }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
