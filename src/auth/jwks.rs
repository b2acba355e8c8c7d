//! Signing key cache for token verification

use jsonwebtoken::jwk::{Jwk, JwkSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use crate::error::{Error, Result};

/// Minimum age of the cached key set before an unknown key id may refetch it
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(5 * 60);

struct CachedKeys {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

/// Cache of the identity provider's published signing keys
///
/// Keys are fetched lazily, reused for `ttl`, and refetched on demand when a
/// token names a key id the cache does not know. Such on-demand refetches
/// happen at most once per `refresh_cooldown`; within it an unknown id is
/// simply unknown. Concurrent refreshes are collapsed into one request.
pub struct JwksCache {
    http_client: reqwest::Client,
    url: String,
    ttl: Duration,
    refresh_cooldown: Duration,
    cached: RwLock<Option<CachedKeys>>,
    refresh_lock: Mutex<()>,
}

impl JwksCache {
    /// Create a cache for the key set at `url`
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(url: impl Into<String>, ttl: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(http_client, url, ttl))
    }

    /// Create a cache sharing an existing HTTP client
    pub fn with_client(http_client: reqwest::Client, url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            http_client,
            url: url.into(),
            ttl,
            refresh_cooldown: DEFAULT_REFRESH_COOLDOWN,
            cached: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Set how recent a fetch must be to skip the refetch for an unknown key id
    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    /// Current key set, fetched if absent or older than the TTL
    pub async fn keys(&self) -> Result<Arc<JwkSet>> {
        if let Some(keys) = self.fresh_keys().await {
            return Ok(keys);
        }

        let _refreshing = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited
        if let Some(keys) = self.fresh_keys().await {
            return Ok(keys);
        }
        self.fetch_and_store().await
    }

    /// Fetch the key set now, regardless of age
    pub async fn refresh(&self) -> Result<Arc<JwkSet>> {
        let _refreshing = self.refresh_lock.lock().await;
        self.fetch_and_store().await
    }

    /// Key with the given id
    ///
    /// An unknown id triggers one forced refresh before giving up, so keys
    /// rotated in since the last fetch are picked up. The refresh is skipped
    /// while the cached set is younger than the refresh cooldown, so tokens
    /// with made-up key ids cannot drive traffic to the identity provider.
    pub async fn find(&self, kid: &str) -> Result<Option<Jwk>> {
        if let Some(key) = self.keys().await?.find(kid) {
            return Ok(Some(key.clone()));
        }

        let _refreshing = self.refresh_lock.lock().await;
        if let Some(cached) = self.cached.read().await.as_ref() {
            // A refresh may have finished while we waited for the lock
            if let Some(key) = cached.keys.find(kid) {
                return Ok(Some(key.clone()));
            }
            if cached.fetched_at.elapsed() < self.refresh_cooldown {
                tracing::debug!(kid = %kid, "Unknown signing key id, key set is recent");
                return Ok(None);
            }
        }

        tracing::info!(kid = %kid, "Unknown signing key id, refreshing key set");
        Ok(self.fetch_and_store().await?.find(kid).cloned())
    }

    async fn fresh_keys(&self) -> Option<Arc<JwkSet>> {
        let cached = self.cached.read().await;
        cached
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| Arc::clone(&c.keys))
    }

    async fn fetch_and_store(&self) -> Result<Arc<JwkSet>> {
        let response = self.http_client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Other(format!(
                "signing key endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let keys: JwkSet = response.json().await?;
        if keys.keys.is_empty() {
            return Err(Error::Other(
                "signing key endpoint returned no keys".to_string(),
            ));
        }

        tracing::debug!(count = keys.keys.len(), url = %self.url, "Fetched signing keys");

        let keys = Arc::new(keys);
        *self.cached.write().await = Some(CachedKeys {
            keys: Arc::clone(&keys),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }
}
