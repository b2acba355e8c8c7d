//! Trait definition for document sources

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::types::{DocumentId, DocumentMetadata, NotFoundInfo, PartNumbers, SearchResult};

/// Access to stored documents and their metadata
///
/// Implementations must be cheap to share across tasks; the fetch
/// coordinator calls `fetch_content` concurrently from spawned tasks.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch the raw content of one document
    ///
    /// # Returns
    ///
    /// * `Ok(Some(bytes))` - the document content
    /// * `Ok(None)` - upstream reports the document does not exist
    /// * `Err(_)` - the call failed; see [`UpstreamError`] for the cases
    async fn fetch_content(&self, id: &DocumentId) -> Result<Option<Vec<u8>>, UpstreamError>;

    /// Fetch metadata of every document matching any of the part numbers
    async fn fetch_metadata(
        &self,
        part_numbers: &PartNumbers,
    ) -> Result<Vec<DocumentMetadata>, UpstreamError>;

    /// Search by part numbers and report which requested numbers matched nothing
    async fn search(&self, part_numbers: &PartNumbers) -> Result<SearchResult, UpstreamError> {
        let data = self.fetch_metadata(part_numbers).await?;
        let not_found = missing_part_numbers(part_numbers.as_slice(), &data);

        tracing::debug!(
            requested = part_numbers.as_slice().len(),
            found = data.len(),
            not_found = not_found.len(),
            "Part number search completed"
        );

        Ok(SearchResult {
            data,
            not_found: NotFoundInfo {
                part_numbers: not_found,
            },
        })
    }
}

/// Requested part numbers with no document in `found`, in request order
pub fn missing_part_numbers(requested: &[i64], found: &[DocumentMetadata]) -> Vec<i64> {
    requested
        .iter()
        .copied()
        .filter(|number| !found.iter().any(|doc| doc.part_number == *number))
        .collect()
}
