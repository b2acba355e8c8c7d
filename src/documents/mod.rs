//! Document aggregation and delivery
//!
//! [`DocumentService`] is the core of the gateway. Each operation follows the
//! same path: validate input, fetch through the [`FetchCoordinator`], shape
//! the result with [`package`], then hand it to a delivery adapter (HTTP
//! response or [`Mailer`]).
//!
//! Partial failures are never errors. The identifiers that could not be
//! delivered travel next to the content; only a batch where nothing was found
//! becomes [`Error::AllDocumentsUnavailable`].

use chrono::Utc;
use std::sync::Arc;

use crate::config::{Config, EmailConfig};
use crate::email::{EmailAttachment, Mailer, SendMail};
use crate::error::{Error, Result};
use crate::types::{
    DocumentId, DocumentIds, EmailReport, FailedDocuments, PartNumbers, Packaged,
    PreviewResponse, RecipientAddress, SearchResult,
};
use crate::upstream::DocumentSource;

mod encoding;
mod fetch;
mod package;

pub use encoding::{decode_base64, encode_base64, encode_download};
pub use fetch::FetchCoordinator;
pub use package::{archive_file_name, document_file_name, package};

/// Search, preview, download and e-mail operations over a [`DocumentSource`]
///
/// Cheap to clone; all clones share the same source, coordinator and mailer.
#[derive(Clone)]
pub struct DocumentService {
    source: Arc<dyn DocumentSource>,
    coordinator: FetchCoordinator,
    mailer: Arc<dyn Mailer>,
    email: Arc<EmailConfig>,
}

impl DocumentService {
    /// Create a service from its collaborators and the gateway configuration
    pub fn new(source: Arc<dyn DocumentSource>, mailer: Arc<dyn Mailer>, config: &Config) -> Self {
        let coordinator =
            FetchCoordinator::new(Arc::clone(&source), config.upstream.max_concurrent_fetches);

        Self {
            source,
            coordinator,
            mailer,
            email: Arc::new(config.email.clone()),
        }
    }

    /// Documents matching any of the part numbers, plus the numbers that matched nothing
    pub async fn search(&self, part_numbers: &PartNumbers) -> Result<SearchResult> {
        tracing::info!(count = part_numbers.as_slice().len(), "Searching part numbers");
        let _permit = self.coordinator.upstream_permit().await?;
        Ok(self.source.search(part_numbers).await?)
    }

    /// Base64 content of a single document
    ///
    /// # Errors
    ///
    /// [`Error::DocumentNotFound`] when upstream has no such document; upstream
    /// failures propagate as [`Error::Upstream`].
    pub async fn preview(&self, id: &DocumentId) -> Result<PreviewResponse> {
        if id.as_str().trim().is_empty() {
            return Err(Error::Validation("document id must not be empty".to_string()));
        }

        let content = {
            let _permit = self.coordinator.upstream_permit().await?;
            self.source.fetch_content(id).await?
        };

        match content {
            Some(bytes) => Ok(PreviewResponse {
                content_base64: encode_base64(&bytes),
            }),
            None => Err(Error::DocumentNotFound { id: id.clone() }),
        }
    }

    /// Fetch and package a batch for download
    ///
    /// Returns the single document or a zip archive together with the
    /// identifiers that could not be included.
    pub async fn download(&self, ids: &DocumentIds) -> Result<Packaged> {
        tracing::info!(count = ids.len(), "Preparing download");

        let batch = self.coordinator.fetch_all(ids).await;
        package(&batch, Utc::now())
    }

    /// Fetch, package and e-mail a batch to `recipient`
    ///
    /// The recipient is validated before anything is fetched.
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] for a recipient outside the allowed domain
    /// * [`Error::AllDocumentsUnavailable`] when nothing could be attached
    /// * [`Error::AttachmentTooLarge`] when the package exceeds the mail limit
    /// * [`Error::Email`] when delivery fails
    pub async fn email(&self, ids: &DocumentIds, recipient: &str) -> Result<EmailReport> {
        let recipient = RecipientAddress::parse(recipient, &self.email.allowed_recipient_suffix)?;

        tracing::info!(count = ids.len(), recipient = %recipient, "Preparing e-mail delivery");

        let Packaged { content, missing } = self.download(ids).await?;

        if content.bytes.len() > self.email.max_attachment_bytes {
            return Err(Error::AttachmentTooLarge {
                size: content.bytes.len(),
                limit: self.email.max_attachment_bytes,
            });
        }

        let body = format!("Please find attached: {}", content.file_name);
        self.mailer
            .send(SendMail {
                recipient,
                subject: self.email.subject.clone(),
                body,
                attachment: EmailAttachment {
                    name: content.file_name,
                    content_type: content.mime_type.to_string(),
                    bytes: content.bytes,
                },
            })
            .await?;

        Ok(EmailReport {
            failed: FailedDocuments {
                document_ids: missing,
            },
        })
    }
}
