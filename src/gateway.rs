//! Top-level wiring of the gateway's collaborators

use axum::Router;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::api::{self, AppState};
use crate::auth::{JwtVerifier, TokenVerifier};
use crate::config::Config;
use crate::documents::DocumentService;
use crate::email::{DisabledMailer, GraphMailer, Mailer};
use crate::error::Result;
use crate::upstream::{DocumentSource, HttpDocumentClient};

/// A configured document gateway
///
/// Owns the upstream client, the mailer and the token verifier, and hands
/// them to the HTTP layer as [`AppState`].
pub struct DocumentGateway {
    config: Arc<Config>,
    service: DocumentService,
    verifier: Option<Arc<dyn TokenVerifier>>,
}

impl DocumentGateway {
    /// Build the production gateway from configuration
    ///
    /// Mail falls back to [`DisabledMailer`] when no Graph client id is set;
    /// the token verifier is only built when `auth.enabled` is true.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) for invalid settings,
    /// or an error if an HTTP client cannot be created.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let source: Arc<dyn DocumentSource> = Arc::new(HttpDocumentClient::new(&config.upstream)?);

        let mailer: Arc<dyn Mailer> = if config.email.client_id.is_empty() {
            tracing::warn!("No Graph client configured, e-mail delivery is disabled");
            Arc::new(DisabledMailer)
        } else {
            Arc::new(GraphMailer::new(config.email.clone())?)
        };

        let verifier: Option<Arc<dyn TokenVerifier>> = if config.auth.enabled {
            Some(Arc::new(JwtVerifier::from_config(&config.auth)?))
        } else {
            tracing::warn!("Authorization is disabled, every caller may use every endpoint");
            None
        };

        tracing::info!(
            upstream = %config.upstream.base_url,
            max_concurrent_fetches = config.upstream.max_concurrent_fetches,
            auth_enabled = config.auth.enabled,
            "Document gateway configured"
        );

        Ok(Self::from_parts(config, source, mailer, verifier))
    }

    /// Assemble a gateway from explicit collaborators
    pub fn from_parts(
        config: Config,
        source: Arc<dyn DocumentSource>,
        mailer: Arc<dyn Mailer>,
        verifier: Option<Arc<dyn TokenVerifier>>,
    ) -> Self {
        let service = DocumentService::new(source, mailer, &config);
        Self {
            config: Arc::new(config),
            service,
            verifier,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The document operations, for use without HTTP
    pub fn service(&self) -> &DocumentService {
        &self.service
    }

    /// Fresh handler state for the API
    pub fn state(&self) -> AppState {
        AppState::new(
            self.service.clone(),
            Arc::clone(&self.config),
            self.verifier.clone(),
        )
    }

    /// The API router, for embedding into a larger application
    pub fn router(&self) -> Router {
        api::create_router(self.state())
    }

    /// Spawn the API server as a background task
    ///
    /// The task ends when a termination signal arrives.
    pub fn spawn_api_server(&self) -> JoinHandle<Result<()>> {
        tokio::spawn(api::start_api_server(self.state()))
    }
}
