//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`documents`]: Search, preview, download and e-mail
//! - [`system`]: Health and OpenAPI

use serde::{Deserialize, Serialize};

mod documents;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use documents::*;
pub use system::*;

/// Response header listing identifiers left out of a download
pub const MISSING_IDS_HEADER: &str = "x-missing-document-ids";

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Representation of a download response
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DownloadEncoding {
    /// Raw file bytes as an attachment
    #[default]
    Binary,
    /// JSON with base64 content
    Base64,
}

/// Query parameters for POST /documents/download
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadQuery {
    /// `base64` for a JSON response instead of a file attachment
    #[serde(default)]
    pub encoding: DownloadEncoding,
}

/// Request body for POST /documents/download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadRequest {
    /// Documents to download, 1 to 50 identifiers
    pub document_ids: Vec<String>,
}

/// Request body for POST /documents/email
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct EmailRequest {
    /// Documents to attach, 1 to 50 identifiers
    pub document_ids: Vec<String>,
    /// Recipient address within the allowed domain
    pub email: String,
}

/// Response for GET /health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests
    pub status: String,
    /// Crate version
    pub version: String,
    /// Seconds since the server started
    pub uptime_seconds: u64,
}
