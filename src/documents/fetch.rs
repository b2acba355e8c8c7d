//! Concurrent per-document fetching
//!
//! Every identifier of a batch is fetched in its own spawned task, admitted
//! through a bounded `buffer_unordered` stream. Each upstream call also holds a
//! permit from a semaphore shared by all clones of the coordinator, so the
//! total number of calls in flight stays capped across concurrent requests.
//! A failure or panic in one task becomes a [`FetchOutcome::Failed`] for that
//! identifier and never touches its siblings. Dropping the `fetch_all` future
//! cancels every outstanding fetch.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::UpstreamError;
use crate::types::{BatchResult, DocumentId, DocumentIds, FetchOutcome};
use crate::upstream::DocumentSource;

/// Fans a batch of identifiers out to a [`DocumentSource`]
///
/// Clones share one upstream limit.
#[derive(Clone)]
pub struct FetchCoordinator {
    source: Arc<dyn DocumentSource>,
    max_concurrent: usize,
    /// Upstream calls in flight across every request using this coordinator
    upstream_limit: Arc<Semaphore>,
}

impl FetchCoordinator {
    /// Create a coordinator running at most `max_concurrent` upstream calls at once
    pub fn new(source: Arc<dyn DocumentSource>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            source,
            max_concurrent,
            upstream_limit: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Wait for a slot under the shared upstream limit
    ///
    /// Callers making upstream calls outside [`fetch_all`](Self::fetch_all)
    /// hold the permit for the duration of the call.
    pub async fn upstream_permit(&self) -> Result<OwnedSemaphorePermit, UpstreamError> {
        acquire(&self.upstream_limit).await
    }

    /// Fetch every identifier and wait for all outcomes
    ///
    /// The result holds exactly one outcome per identifier, in request order,
    /// whatever order the fetches complete in.
    pub async fn fetch_all(&self, ids: &DocumentIds) -> BatchResult {
        let cancel_token = CancellationToken::new();
        // Cancels spawned fetches if this future is dropped before completion
        let _cancel_on_drop = cancel_token.clone().drop_guard();

        let mut outcomes: Vec<(usize, FetchOutcome)> =
            stream::iter(ids.as_slice().iter().cloned().enumerate())
                .map(|(index, id)| {
                    let source = Arc::clone(&self.source);
                    let limit = Arc::clone(&self.upstream_limit);
                    let cancel_token = cancel_token.clone();

                    async move { (index, fetch_one(source, limit, id, cancel_token).await) }
                })
                .buffer_unordered(self.max_concurrent)
                .collect()
                .await;

        outcomes.sort_by_key(|(index, _)| *index);

        let entries: Vec<(DocumentId, FetchOutcome)> = ids
            .as_slice()
            .iter()
            .cloned()
            .zip(outcomes.into_iter().map(|(_, outcome)| outcome))
            .collect();

        let batch = BatchResult::from_entries(entries);
        tracing::debug!(
            requested = batch.len(),
            found = batch.found().len(),
            missing = batch.missing().len(),
            "Batch fetch completed"
        );
        batch
    }
}

async fn acquire(limit: &Arc<Semaphore>) -> Result<OwnedSemaphorePermit, UpstreamError> {
    Arc::clone(limit)
        .acquire_owned()
        .await
        .map_err(|_| UpstreamError::Aborted("upstream limiter closed".to_string()))
}

/// Run one fetch in its own task and fold every failure mode into an outcome
async fn fetch_one(
    source: Arc<dyn DocumentSource>,
    limit: Arc<Semaphore>,
    id: DocumentId,
    cancel_token: CancellationToken,
) -> FetchOutcome {
    let task_id = id.clone();
    let handle = tokio::spawn(async move {
        let fetch = async {
            let _permit = acquire(&limit).await?;
            source.fetch_content(&task_id).await
        };

        tokio::select! {
            _ = cancel_token.cancelled() => {
                Err(UpstreamError::Aborted("request cancelled".to_string()))
            }
            result = fetch => result,
        }
    });

    match handle.await {
        Ok(Ok(Some(bytes))) => FetchOutcome::Found(bytes),
        Ok(Ok(None)) => FetchOutcome::NotFound,
        Ok(Err(e)) => {
            tracing::warn!(document_id = %id, error = %e, "Document fetch failed");
            FetchOutcome::Failed(e)
        }
        Err(join_error) => {
            tracing::error!(document_id = %id, error = %join_error, "Document fetch task panicked");
            FetchOutcome::Failed(UpstreamError::Aborted(join_error.to_string()))
        }
    }
}
