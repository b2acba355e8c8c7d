//! Application state for the API server

use crate::Config;
use crate::auth::TokenVerifier;
use crate::documents::DocumentService;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Document operations
    pub service: DocumentService,

    /// Configuration (read only)
    pub config: Arc<Config>,

    /// Bearer token verifier, `None` when the authorization gate is off
    pub verifier: Option<Arc<dyn TokenVerifier>>,

    /// When the server state was built, for the health endpoint
    pub started_at: Instant,
}

impl AppState {
    /// Create a new AppState
    pub fn new(
        service: DocumentService,
        config: Arc<Config>,
        verifier: Option<Arc<dyn TokenVerifier>>,
    ) -> Self {
        Self {
            service,
            config,
            verifier,
            started_at: Instant::now(),
        }
    }
}
