//! # document-gateway
//!
//! HTTP gateway in front of an upstream engineering document API.
//!
//! Callers search documents by part number, preview a single document, and
//! download or e-mail a batch of documents. A batch is fetched concurrently;
//! one document comes back as a PDF, several as a zip archive. Documents that
//! could not be fetched never fail the batch: their identifiers are reported
//! next to the content. Only a batch where nothing could be fetched is an
//! error.
//!
//! ## Design
//!
//! - **Library-first** - [`DocumentService`] works without HTTP; the API
//!   module is a thin adapter over it
//! - **Explicit collaborators** - upstream API ([`upstream::DocumentSource`]),
//!   mail ([`email::Mailer`]) and token verification
//!   ([`auth::TokenVerifier`]) are traits, injected at construction
//! - **Typed failures** - upstream transport errors are mapped to
//!   [`UpstreamError`] at the boundary; HTTP status codes come from
//!   [`ToHttpStatus`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use document_gateway::{Config, DocumentGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config: Config = serde_json::from_str(r#"{
//!         "upstream": {
//!             "base_url": "https://cpi.example.com",
//!             "username": "svc",
//!             "password": "secret"
//!         },
//!         "auth": { "tenant_id": "tenant", "client_id": "api-client" }
//!     }"#)?;
//!
//!     let gateway = DocumentGateway::new(config)?;
//!     gateway.spawn_api_server().await??;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Caller authentication and authorization
pub mod auth;
/// Configuration types
pub mod config;
/// Document operations: fetch, package, deliver
pub mod documents;
/// E-mail delivery
pub mod email;
/// Error types
pub mod error;
/// Gateway construction
pub mod gateway;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types
pub mod types;
/// Upstream document API client
pub mod upstream;

// Re-export commonly used types
pub use config::Config;
pub use documents::DocumentService;
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus, UpstreamError};
pub use gateway::DocumentGateway;
pub use types::{
    DocumentId, DocumentIds, DocumentMetadata, EmailReport, FetchOutcome, PartNumbers,
    SearchResult,
};

/// Build the gateway and serve the API until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// In-flight requests are allowed to finish before this returns.
///
/// # Example
///
/// ```no_run
/// use document_gateway::{Config, run_with_shutdown};
///
/// # async fn example(config: Config) -> Result<(), Box<dyn std::error::Error>> {
/// run_with_shutdown(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_with_shutdown(config: Config) -> Result<()> {
    let gateway = DocumentGateway::new(config)?;
    api::start_api_server(gateway.state()).await
}

#[cfg(unix)]
pub(crate) async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
pub(crate) async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
