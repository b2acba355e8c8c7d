//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the document-gateway
//! REST API using utoipa for compile-time spec generation.

use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

/// OpenAPI documentation for the document-gateway REST API
///
/// The document can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "document-gateway REST API",
        version = "0.1.0",
        description = "Search, preview, download and e-mail engineering documents held by the upstream document API",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Documents
        crate::api::routes::search_documents,
        crate::api::routes::preview_document,
        crate::api::routes::download_documents,
        crate::api::routes::email_documents,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::DocumentId,
        crate::types::DocumentMetadata,
        crate::types::NotFoundInfo,
        crate::types::SearchResult,
        crate::types::PreviewResponse,
        crate::types::EncodedDownload,
        crate::types::FailedDocuments,
        crate::types::EmailReport,

        // API request/response types from routes
        crate::api::routes::DownloadRequest,
        crate::api::routes::DownloadEncoding,
        crate::api::routes::EmailRequest,
        crate::api::routes::HealthResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "documents", description = "Documents - Search by part number, preview, download and e-mail"),
        (name = "system", description = "System endpoints - Health check and OpenAPI spec"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the Azure AD bearer token scheme to the document
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
