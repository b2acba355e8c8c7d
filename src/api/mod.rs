//! REST API server module
//!
//! Exposes the document operations over HTTP under `/api/v1`, with one
//! authorization policy per document endpoint.

use crate::Result;
use crate::error::Error;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, header},
    middleware,
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod extract;
pub mod openapi;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use auth::PolicyGuard;
pub use openapi::ApiDoc;
pub use state::AppState;

/// Route prefix of every API endpoint
pub const API_PREFIX: &str = "/api/v1";

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Documents (authorization required unless `auth.enabled` is false)
/// - `GET /api/v1/documents/search?part_numbers=10,20` - Metadata by part number
/// - `GET /api/v1/documents/:id/preview` - Base64 content of one document
/// - `POST /api/v1/documents/download[?encoding=base64]` - File or zip archive
/// - `POST /api/v1/documents/email` - Send documents as an attachment
///
/// ## System
/// - `GET /api/v1/health` - Health check
/// - `GET /api/v1/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    let verifier = if config.auth.enabled {
        state.verifier.clone()
    } else {
        None
    };
    let policies = &config.auth.policies;

    let search_guard = PolicyGuard::new(verifier.clone(), policies.search.clone());
    let preview_guard = PolicyGuard::new(verifier.clone(), policies.preview.clone());
    let download_guard = PolicyGuard::new(verifier.clone(), policies.download.clone());
    let email_guard = PolicyGuard::new(verifier, policies.email.clone());

    let api = Router::new()
        // Documents
        .route(
            "/documents/search",
            get(routes::search_documents).route_layer(middleware::from_fn_with_state(
                search_guard,
                auth::require_policy,
            )),
        )
        .route(
            "/documents/:id/preview",
            get(routes::preview_document).route_layer(middleware::from_fn_with_state(
                preview_guard,
                auth::require_policy,
            )),
        )
        .route(
            "/documents/download",
            post(routes::download_documents).route_layer(middleware::from_fn_with_state(
                download_guard,
                auth::require_policy,
            )),
        )
        .route(
            "/documents/email",
            post(routes::email_documents).route_layer(middleware::from_fn_with_state(
                email_guard,
                auth::require_policy,
            )),
        )
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    let router = Router::new().nest(API_PREFIX, api);

    // Swagger UI serves its own copy of the document under /api-docs
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state);

    // Middleware layer ordering: In Axum's onion model, the LAST layer applied
    // is the OUTERMOST (runs first on requests). We want:
    //   Request → CORS → Trace → Timeout → Rate Limit → Policy → Handler

    let router = if config.server.api.rate_limit.enabled {
        let limiter = Arc::new(rate_limit::RateLimiter::new(
            config.server.api.rate_limit.clone(),
        ));
        router.layer(middleware::from_fn_with_state(
            limiter,
            rate_limit::rate_limit_middleware,
        ))
    } else {
        router
    };

    // Dropping the handler future on timeout also cancels its upstream fetches
    let router = router
        .layer(TimeoutLayer::new(config.server.api.request_timeout))
        .layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        router.layer(build_cors_layer(&config.server.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin. The download headers are
/// exposed so browser clients can read the file name and missing identifiers.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    let cors = if allow_any || origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
    };

    cors.allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static(routes::MISSING_IDS_HEADER),
        ])
}

/// Start the API server on the configured bind address.
///
/// Runs until SIGTERM/SIGINT (Ctrl+C on other platforms), then stops accepting
/// connections and lets in-flight requests finish.
pub async fn start_api_server(state: AppState) -> Result<()> {
    let bind_address = state.config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address).await.map_err(Error::Io)?;

    serve(listener, state, crate::wait_for_signal()).await
}

/// Serve the API on an already bound listener until `shutdown` completes
///
/// # Example
///
/// ```no_run
/// use document_gateway::{Config, DocumentGateway};
/// use tokio::net::TcpListener;
///
/// # async fn example(config: Config) -> Result<(), Box<dyn std::error::Error>> {
/// let gateway = DocumentGateway::new(config)?;
/// let listener = TcpListener::bind("127.0.0.1:0").await?;
/// let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
///
/// let server = tokio::spawn(document_gateway::api::serve(listener, gateway.state(), async {
///     stopped.await.ok();
/// }));
/// // ...
/// stop.send(()).ok();
/// server.await??;
/// # Ok(())
/// # }
/// ```
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr().map_err(Error::Io)?;
    let app = create_router(state);

    tracing::info!(address = %address, "API server listening");

    // ConnectInfo<SocketAddr> is required by the rate limiting middleware
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
