//! Core types for document-gateway

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

use crate::error::{Error, Result, UpstreamError};

/// Minimum number of document identifiers in a batch request
pub const MIN_DOCUMENT_IDS: usize = 1;
/// Maximum number of document identifiers in a batch request
pub const MAX_DOCUMENT_IDS: usize = 50;
/// Minimum number of part numbers in a search
pub const MIN_PART_NUMBERS: usize = 1;
/// Maximum number of part numbers in a search
pub const MAX_PART_NUMBERS: usize = 10;

/// MIME type of a single delivered document
pub const PDF_MIME_TYPE: &str = "application/pdf";
/// MIME type of a multi-document archive
pub const ZIP_MIME_TYPE: &str = "application/zip";

/// Opaque identifier of a document in the upstream API
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Create a new DocumentId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated, duplicate-free list of document identifiers for one batch
///
/// Holds between [`MIN_DOCUMENT_IDS`] and [`MAX_DOCUMENT_IDS`] entries in
/// request order. Repeated identifiers are collapsed to their first occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentIds(Vec<DocumentId>);

impl DocumentIds {
    /// Validate raw identifiers from a request body
    pub fn parse<I, S>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: Vec<String> = raw.into_iter().map(Into::into).collect();

        if raw.len() < MIN_DOCUMENT_IDS || raw.len() > MAX_DOCUMENT_IDS {
            return Err(Error::Validation(format!(
                "document_ids must contain between {MIN_DOCUMENT_IDS} and {MAX_DOCUMENT_IDS} entries, got {}",
                raw.len()
            )));
        }

        let mut seen = HashSet::with_capacity(raw.len());
        let mut ids = Vec::with_capacity(raw.len());
        for id in raw {
            if id.trim().is_empty() {
                return Err(Error::Validation(
                    "document_ids must not contain empty identifiers".to_string(),
                ));
            }
            if seen.insert(id.clone()) {
                ids.push(DocumentId(id));
            }
        }

        Ok(Self(ids))
    }

    /// Identifiers in request order
    pub fn as_slice(&self) -> &[DocumentId] {
        &self.0
    }

    /// Number of distinct identifiers
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a parsed value; provided for API symmetry
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the inner vector
    pub fn into_inner(self) -> Vec<DocumentId> {
        self.0
    }
}

/// Validated, duplicate-free list of part numbers for one search
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartNumbers(Vec<i64>);

impl PartNumbers {
    /// Validate part numbers, collapsing duplicates while keeping request order
    ///
    /// The bounds apply to the raw entries, repeats included.
    pub fn parse(raw: impl IntoIterator<Item = i64>) -> Result<Self> {
        let raw: Vec<i64> = raw.into_iter().collect();

        if raw.len() < MIN_PART_NUMBERS || raw.len() > MAX_PART_NUMBERS {
            return Err(Error::Validation(format!(
                "part_numbers must contain between {MIN_PART_NUMBERS} and {MAX_PART_NUMBERS} entries, got {}",
                raw.len()
            )));
        }

        let mut seen = HashSet::with_capacity(raw.len());
        let numbers = raw.into_iter().filter(|n| seen.insert(*n)).collect();

        Ok(Self(numbers))
    }

    /// Parse a comma-separated query value such as `10,20,30`
    pub fn from_csv(csv: &str) -> Result<Self> {
        Self::from_values([csv])
    }

    /// Parse query values that may each hold one number or a comma-separated list
    ///
    /// `part_numbers=10&part_numbers=20` and `part_numbers=10,20` yield the same
    /// result.
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut numbers = Vec::new();
        for part in values
            .into_iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            let number = part.parse::<i64>().map_err(|_| {
                Error::Validation(format!("part number '{part}' is not an integer"))
            })?;
            numbers.push(number);
        }
        Self::parse(numbers)
    }

    /// Part numbers in request order
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// Render as the comma-separated form the upstream API expects
    pub fn to_csv(&self) -> String {
        self.0
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// E-mail recipient restricted to the configured domain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipientAddress(String);

impl RecipientAddress {
    /// Validate an address against a required suffix such as `@tennantco.com`
    ///
    /// The suffix comparison is case-insensitive; the local part must be
    /// non-empty and the address must contain exactly one `@`.
    pub fn parse(address: &str, required_suffix: &str) -> Result<Self> {
        let address = address.trim();

        let mut parts = address.split('@');
        let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) => (local, domain),
            _ => {
                return Err(Error::Validation(format!(
                    "'{address}' is not a valid email address"
                )));
            }
        };

        if local.is_empty() || domain.is_empty() || local.chars().any(char::is_whitespace) {
            return Err(Error::Validation(format!(
                "'{address}' is not a valid email address"
            )));
        }

        let suffix = required_suffix.to_ascii_lowercase();
        if !address.to_ascii_lowercase().ends_with(&suffix) {
            return Err(Error::Validation(format!(
                "email must belong to the {} domain",
                suffix.trim_start_matches('@')
            )));
        }

        Ok(Self(address.to_string()))
    }

    /// Borrow the address
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecipientAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Document metadata as reported by the upstream API
///
/// Multiple documents may share a part number with different revisions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DocumentMetadata {
    /// Upstream document identifier
    pub id: DocumentId,
    /// Part number the document belongs to
    pub part_number: i64,
    /// Document revision (e.g. "A", "-B")
    #[serde(alias = "rev")]
    pub revision: String,
    /// Creation timestamp
    #[serde(alias = "date_created")]
    pub created_at: DateTime<Utc>,
    /// File size in bytes
    #[serde(alias = "file_size_bytes")]
    pub size_bytes: u64,
}

/// Part numbers of a search that matched no document
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NotFoundInfo {
    /// Requested part numbers with no matching document
    pub part_numbers: Vec<i64>,
}

/// Result of a part-number search
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    /// Documents found, in upstream order
    pub data: Vec<DocumentMetadata>,
    /// Requested part numbers absent from `data`
    pub not_found: NotFoundInfo,
}

/// Outcome of fetching one document
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Document content
    Found(Vec<u8>),
    /// Upstream reported the document does not exist
    NotFound,
    /// The fetch failed; the cause is kept for logging
    Failed(UpstreamError),
}

impl FetchOutcome {
    /// Whether content was retrieved
    pub fn is_found(&self) -> bool {
        matches!(self, FetchOutcome::Found(_))
    }
}

/// Per-identifier outcomes of one batch fetch
///
/// Every requested identifier appears exactly once, in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchResult {
    entries: Vec<(DocumentId, FetchOutcome)>,
}

impl BatchResult {
    /// Build from entries already in request order
    pub fn from_entries(entries: Vec<(DocumentId, FetchOutcome)>) -> Self {
        Self { entries }
    }

    /// All entries in request order
    pub fn entries(&self) -> &[(DocumentId, FetchOutcome)] {
        &self.entries
    }

    /// Outcome recorded for an identifier
    pub fn outcome(&self, id: &DocumentId) -> Option<&FetchOutcome> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, outcome)| outcome)
    }

    /// Successfully fetched documents, in request order
    pub fn found(&self) -> Vec<(&DocumentId, &[u8])> {
        self.entries
            .iter()
            .filter_map(|(id, outcome)| match outcome {
                FetchOutcome::Found(bytes) => Some((id, bytes.as_slice())),
                _ => None,
            })
            .collect()
    }

    /// Identifiers that were not found or failed, in request order
    pub fn missing(&self) -> Vec<DocumentId> {
        self.entries
            .iter()
            .filter(|(_, outcome)| !outcome.is_found())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Whether no identifier yielded content
    pub fn all_failed(&self) -> bool {
        !self.entries.iter().any(|(_, outcome)| outcome.is_found())
    }

    /// Number of recorded outcomes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no outcome was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A deliverable file: one document or an archive of several
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackagedContent {
    /// File name presented to the recipient
    pub file_name: String,
    /// Raw file bytes
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime_type: &'static str,
}

/// Packaged content together with the identifiers that could not be included
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packaged {
    /// The deliverable file
    pub content: PackagedContent,
    /// Identifiers that were not found or failed
    pub missing: Vec<DocumentId>,
}

/// Base64 preview of a single document
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PreviewResponse {
    /// Base64 encoded document content
    pub content_base64: String,
}

/// Text-safe rendering of a download, for clients that need JSON
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EncodedDownload {
    /// Name of the delivered file
    pub file_name: String,
    /// MIME type of the decoded content
    pub mime_type: String,
    /// Base64 encoded file content
    pub content: String,
    /// Identifiers that could not be included
    pub missing_document_ids: Vec<DocumentId>,
    /// When the download was produced
    pub created_at: DateTime<Utc>,
}

/// Identifiers that could not be delivered
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FailedDocuments {
    /// Identifiers not attached (not found or failed)
    pub document_ids: Vec<DocumentId>,
}

/// Result of an e-mail delivery
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmailReport {
    /// Documents that could not be attached; empty on full success
    pub failed: FailedDocuments,
}
