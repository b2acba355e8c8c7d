//! Document gateway server example
//!
//! Runs the gateway with the REST API enabled. Configuration is read from the
//! JSON file named by the first argument (or `DOCUMENT_GATEWAY_CONFIG`); without
//! one, a local setup with authentication disabled is used.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:8000/swagger-ui
//! - Search via GET http://localhost:8000/api/v1/documents/search?part_numbers=10,20
//! - Download via POST http://localhost:8000/api/v1/documents/download

use document_gateway::config::{ApiConfig, AuthConfig, ServerIntegrationConfig, UpstreamConfig};
use document_gateway::{Config, DocumentGateway};
use std::net::SocketAddr;

fn local_config() -> Config {
    Config {
        upstream: UpstreamConfig {
            base_url: "http://localhost:9000".to_string(),
            username: "cpi-user".to_string(),
            password: "cpi-secret".to_string(),
            ..Default::default()
        },
        // Local development only: every caller is accepted
        auth: AuthConfig {
            enabled: false,
            ..Default::default()
        },
        server: ServerIntegrationConfig {
            api: ApiConfig {
                bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
                swagger_ui: true,
                ..Default::default()
            },
        },
        ..Default::default()
    }
}

fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DOCUMENT_GATEWAY_CONFIG").ok());

    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(local_config()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "document_gateway=info,tower_http=info".into()),
        )
        .init();

    let config = load_config()?;
    let address = config.server.api.bind_address;

    let gateway = DocumentGateway::new(config)?;

    println!("Starting document-gateway REST API server");
    println!("Swagger UI: http://{address}/swagger-ui");
    println!("API Base:   http://{address}/api/v1");
    println!();
    println!("Example commands:");
    println!("  # Search by part number");
    println!("  curl 'http://{address}/api/v1/documents/search?part_numbers=10,20'");
    println!();
    println!("  # Download two documents as a zip archive");
    println!("  curl -X POST http://{address}/api/v1/documents/download \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"document_ids\": [\"DOC-10\", \"DOC-20\"]}}' -OJ");

    // Runs until Ctrl+C
    gateway.spawn_api_server().await??;

    Ok(())
}
