//! HTTP client for the upstream document API

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{RetryConfig, UpstreamConfig};
use crate::error::{Error, UpstreamError};
use crate::retry::with_retry;
use crate::types::{DocumentId, DocumentMetadata, PartNumbers};

use super::DocumentSource;

const CONTENT_PATH: &str = "/api/v1/documents/get/";
const SEARCH_PATH: &str = "/api/v1/documents/search/";

/// Response body of the upstream search endpoint
#[derive(Deserialize)]
struct MetadataEnvelope {
    #[serde(default)]
    data: Vec<DocumentMetadata>,
}

/// [`DocumentSource`] backed by the upstream HTTP API with basic authentication
///
/// One instance is shared by every request; the underlying connection pool
/// is bounded by `upstream.max_idle_connections`.
#[derive(Clone)]
pub struct HttpDocumentClient {
    http_client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl HttpDocumentClient {
    /// Create a client from the upstream configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &UpstreamConfig) -> crate::error::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_idle_connections)
            .user_agent(concat!("document-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            base_url = %config.base_url,
            timeout_secs = config.timeout.as_secs(),
            "Upstream document client initialized"
        );

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            timeout: config.timeout,
            retry: config.retry.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_content_once(&self, id: &DocumentId) -> Result<Option<Vec<u8>>, UpstreamError> {
        let response = self
            .http_client
            .get(self.endpoint(CONTENT_PATH))
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("id", id.as_str())])
            .send()
            .await
            .map_err(|e| map_transport_error(&e, self.timeout))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(document_id = %id, "Document not found upstream");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_status(status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_transport_error(&e, self.timeout))?;

        Ok(Some(bytes.to_vec()))
    }

    async fn get_metadata_once(
        &self,
        part_numbers: &PartNumbers,
    ) -> Result<Vec<DocumentMetadata>, UpstreamError> {
        let response = self
            .http_client
            .get(self.endpoint(SEARCH_PATH))
            .basic_auth(&self.username, Some(&self.password))
            .query(&[("part_numbers", part_numbers.to_csv())])
            .send()
            .await
            .map_err(|e| map_transport_error(&e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| map_transport_error(&e, self.timeout))?;

        let envelope: MetadataEnvelope = serde_json::from_slice(&body)
            .map_err(|e| UpstreamError::InvalidResponse(format!("search response: {e}")))?;

        Ok(envelope.data)
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentClient {
    async fn fetch_content(&self, id: &DocumentId) -> Result<Option<Vec<u8>>, UpstreamError> {
        with_retry(&self.retry, move || self.get_content_once(id)).await
    }

    async fn fetch_metadata(
        &self,
        part_numbers: &PartNumbers,
    ) -> Result<Vec<DocumentMetadata>, UpstreamError> {
        with_retry(&self.retry, move || self.get_metadata_once(part_numbers)).await
    }
}

/// Translate a non-success, non-404 status into an [`UpstreamError`]
fn map_status(status: StatusCode) -> UpstreamError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            tracing::error!(
                status = status.as_u16(),
                "Upstream rejected the gateway credentials"
            );
            UpstreamError::Unauthorized {
                status: status.as_u16(),
            }
        }
        _ => UpstreamError::Status {
            status: status.as_u16(),
        },
    }
}

/// Translate a `reqwest` failure into an [`UpstreamError`]
fn map_transport_error(error: &reqwest::Error, timeout: Duration) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::Timeout(timeout)
    } else if error.is_decode() {
        UpstreamError::InvalidResponse(error.to_string())
    } else {
        UpstreamError::Connection(error.to_string())
    }
}
