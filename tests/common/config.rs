//! Gateway configuration and a live server bound to an ephemeral port

use super::fixtures::{CLIENT_ID, TENANT_ID, UPSTREAM_PASSWORD, UPSTREAM_USER};
use document_gateway::config::{
    AuthConfig, EmailConfig, RetryConfig, ServerIntegrationConfig, UpstreamConfig,
};
use document_gateway::{Config, DocumentGateway};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Config pointing every outbound call at the two mock servers
///
/// `upstream_uri` serves the document API, `identity_uri` stands in for both
/// the login authority and Microsoft Graph.
pub fn gateway_config(upstream_uri: &str, identity_uri: &str) -> Config {
    Config {
        upstream: UpstreamConfig {
            base_url: upstream_uri.to_string(),
            username: UPSTREAM_USER.to_string(),
            password: UPSTREAM_PASSWORD.to_string(),
            timeout: Duration::from_secs(5),
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
                backoff_multiplier: 2.0,
                jitter: false,
            },
            ..UpstreamConfig::default()
        },
        auth: AuthConfig {
            tenant_id: TENANT_ID.to_string(),
            client_id: CLIENT_ID.to_string(),
            jwks_url: Some(format!("{identity_uri}/discovery/keys")),
            ..AuthConfig::default()
        },
        email: EmailConfig {
            tenant_id: TENANT_ID.to_string(),
            client_id: "mailer-app".to_string(),
            client_secret: "mailer-secret".to_string(),
            authority_url: identity_uri.to_string(),
            graph_url: identity_uri.to_string(),
            ..EmailConfig::default()
        },
        server: ServerIntegrationConfig::default(),
    }
}

/// A gateway serving on 127.0.0.1 until dropped or stopped
pub struct TestServer {
    pub base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<document_gateway::Result<()>>>,
}

impl TestServer {
    /// Build the gateway from `config` and start serving
    pub async fn start(config: Config) -> Self {
        let gateway = DocumentGateway::new(config).expect("gateway config must be valid");
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let address = listener.local_addr().expect("local address");

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(document_gateway::api::serve(
            listener,
            gateway.state(),
            async {
                rx.await.ok();
            },
        ));

        Self {
            base_url: format!("http://{address}/api/v1"),
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    /// Absolute URL of an API path such as `/documents/search`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Graceful shutdown; waits for the server task to finish
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .expect("server task panicked")
                .expect("server returned an error");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
    }
}
