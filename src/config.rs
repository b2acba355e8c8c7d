//! Configuration types for document-gateway

use crate::auth::AccessPolicy;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};
use utoipa::ToSchema;

/// Main configuration for the gateway
///
/// Fields are organized into sub-configs:
/// - [`upstream`](UpstreamConfig): document API location, credentials, fan-out limits
/// - [`auth`](AuthConfig): Azure AD token verification and endpoint policies
/// - [`email`](EmailConfig): Microsoft Graph mail delivery
/// - [`server`](ServerIntegrationConfig): REST API binding, CORS, rate limits
///
/// The server sub-config is flattened, so `api` sits at the top level of the
/// JSON document.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Upstream document API
    pub upstream: UpstreamConfig,

    /// Caller authentication and authorization
    #[serde(default)]
    pub auth: AuthConfig,

    /// E-mail delivery
    #[serde(default)]
    pub email: EmailConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Check settings that serde defaults cannot guarantee
    ///
    /// Called once at startup; a failure names the offending key.
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.upstream.base_url).map_err(|e| Error::Config {
            message: format!("invalid upstream base URL '{}': {e}", self.upstream.base_url),
            key: Some("upstream.base_url".to_string()),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("upstream base URL must be http or https, got {}", base.scheme()),
                key: Some("upstream.base_url".to_string()),
            });
        }

        if self.upstream.max_concurrent_fetches == 0 {
            return Err(Error::Config {
                message: "max_concurrent_fetches must be at least 1".to_string(),
                key: Some("upstream.max_concurrent_fetches".to_string()),
            });
        }

        if self.upstream.timeout.is_zero() {
            return Err(Error::Config {
                message: "upstream timeout must be greater than zero".to_string(),
                key: Some("upstream.timeout".to_string()),
            });
        }

        if self.auth.enabled {
            if self.auth.tenant_id.is_empty() {
                return Err(Error::Config {
                    message: "tenant_id is required when authentication is enabled".to_string(),
                    key: Some("auth.tenant_id".to_string()),
                });
            }
            if self.auth.client_id.is_empty() {
                return Err(Error::Config {
                    message: "client_id is required when authentication is enabled".to_string(),
                    key: Some("auth.client_id".to_string()),
                });
            }
        }

        if !self.email.allowed_recipient_suffix.starts_with('@') {
            return Err(Error::Config {
                message: format!(
                    "recipient suffix must start with '@', got '{}'",
                    self.email.allowed_recipient_suffix
                ),
                key: Some("email.allowed_recipient_suffix".to_string()),
            });
        }

        if self.email.max_attachment_bytes == 0 {
            return Err(Error::Config {
                message: "max_attachment_bytes must be greater than zero".to_string(),
                key: Some("email.max_attachment_bytes".to_string()),
            });
        }

        Ok(())
    }
}

/// Upstream document API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpstreamConfig {
    /// Base URL of the document API (e.g. "https://cpi.example.com")
    pub base_url: String,

    /// Username for HTTP basic authentication
    #[serde(default)]
    pub username: String,

    /// Password for HTTP basic authentication
    #[serde(default)]
    pub password: String,

    /// Per-call timeout (default: 30 seconds)
    #[serde(default = "default_upstream_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Idle connections kept per upstream host (default: 32)
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: usize,

    /// Maximum simultaneous content fetches per batch (default: 16)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Transport retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout: default_upstream_timeout(),
            max_idle_connections: default_max_idle_connections(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for transient upstream failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Azure AD token verification and per-endpoint access policies
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthConfig {
    /// Verify bearer tokens (default: true); disable only for local development
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Azure AD tenant
    #[serde(default)]
    pub tenant_id: String,

    /// Application (client) id, expected as the token audience
    #[serde(default)]
    pub client_id: String,

    /// Login authority (default: "https://login.microsoftonline.com")
    #[serde(default = "default_authority_url")]
    pub authority_url: String,

    /// Override for the signing key endpoint; derived from the tenant when unset
    #[serde(default)]
    pub jwks_url: Option<String>,

    /// How long fetched signing keys stay valid (default: 24 hours)
    #[serde(default = "default_jwks_cache_ttl", with = "duration_serde")]
    pub jwks_cache_ttl: Duration,

    /// Minimum age of the cached keys before an unknown key id refetches them
    /// (default: 5 minutes)
    #[serde(default = "default_jwks_refresh_cooldown", with = "duration_serde")]
    pub jwks_refresh_cooldown: Duration,

    /// Access policy per endpoint
    #[serde(default)]
    pub policies: EndpointPolicies,
}

impl AuthConfig {
    /// Expected `iss` claim
    pub fn issuer(&self) -> String {
        format!(
            "{}/{}/v2.0",
            self.authority_url.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Endpoint serving the tenant's signing keys
    pub fn jwks_url(&self) -> String {
        match &self.jwks_url {
            Some(url) => url.clone(),
            None => format!(
                "{}/{}/discovery/v2.0/keys",
                self.authority_url.trim_end_matches('/'),
                self.tenant_id
            ),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tenant_id: String::new(),
            client_id: String::new(),
            authority_url: default_authority_url(),
            jwks_url: None,
            jwks_cache_ttl: default_jwks_cache_ttl(),
            jwks_refresh_cooldown: default_jwks_refresh_cooldown(),
            policies: EndpointPolicies::default(),
        }
    }
}

/// Access policies for the protected endpoints
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EndpointPolicies {
    /// Part-number search
    #[serde(default = "default_search_policy")]
    pub search: AccessPolicy,

    /// Single document preview
    #[serde(default = "default_preview_policy")]
    pub preview: AccessPolicy,

    /// File download
    #[serde(default = "default_delivery_policy")]
    pub download: AccessPolicy,

    /// E-mail delivery
    #[serde(default = "default_delivery_policy")]
    pub email: AccessPolicy,
}

impl Default for EndpointPolicies {
    fn default() -> Self {
        Self {
            search: default_search_policy(),
            preview: default_preview_policy(),
            download: default_delivery_policy(),
            email: default_delivery_policy(),
        }
    }
}

/// Microsoft Graph mail delivery configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EmailConfig {
    /// Tenant owning the sender mailbox
    #[serde(default)]
    pub tenant_id: String,

    /// Client id of the mail-sending application
    #[serde(default)]
    pub client_id: String,

    /// Client secret of the mail-sending application
    #[serde(default)]
    pub client_secret: String,

    /// Mailbox the message is sent from
    #[serde(default = "default_sender_mailbox")]
    pub sender_mailbox: String,

    /// Recipients must end with this suffix (default: "@tennantco.com")
    #[serde(default = "default_recipient_suffix")]
    pub allowed_recipient_suffix: String,

    /// Message subject
    #[serde(default = "default_email_subject")]
    pub subject: String,

    /// Largest attachment accepted for delivery (default: 50 MB)
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: usize,

    /// Login authority used for client-credential tokens
    #[serde(default = "default_authority_url")]
    pub authority_url: String,

    /// Microsoft Graph base URL (default: "https://graph.microsoft.com")
    #[serde(default = "default_graph_url")]
    pub graph_url: String,

    /// Timeout for token and send calls (default: 30 seconds)
    #[serde(default = "default_upstream_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            sender_mailbox: default_sender_mailbox(),
            allowed_recipient_suffix: default_recipient_suffix(),
            subject: default_email_subject(),
            max_attachment_bytes: default_max_attachment_bytes(),
            authority_url: default_authority_url(),
            graph_url: default_graph_url(),
            timeout: default_upstream_timeout(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Upper bound on handling one request (default: 120 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            request_timeout: default_request_timeout(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Rate limiting configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RateLimitConfig {
    /// Enable rate limiting (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Requests per second per IP (default: 20)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Burst size (default: 40)
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,

    /// Endpoints exempt from rate limiting
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,

    /// IPs exempt from rate limiting (e.g., localhost)
    #[serde(default = "default_exempt_ips")]
    pub exempt_ips: Vec<std::net::IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
            exempt_paths: default_exempt_paths(),
            exempt_ips: default_exempt_ips(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_upstream_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_idle_connections() -> usize {
    32
}

fn default_max_concurrent_fetches() -> usize {
    16
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_authority_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_jwks_cache_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_jwks_refresh_cooldown() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_search_policy() -> AccessPolicy {
    AccessPolicy::new(["Viewer", "Editor"], ["Viewer", "Editor"], ["Document.Search"])
}

fn default_preview_policy() -> AccessPolicy {
    AccessPolicy::new(["Viewer", "Editor"], ["Viewer", "Editor"], ["Document.Preview"])
}

fn default_delivery_policy() -> AccessPolicy {
    AccessPolicy::new(["Editor"], ["Editor"], ["Document.Download"])
}

fn default_sender_mailbox() -> String {
    "drawinglocator@tennantco.com".to_string()
}

fn default_recipient_suffix() -> String {
    "@tennantco.com".to_string()
}

fn default_email_subject() -> String {
    "Documents from Drawing Locator".to_string()
}

fn default_max_attachment_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_graph_url() -> String {
    "https://graph.microsoft.com".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_requests_per_second() -> u32 {
    20
}

fn default_burst_size() -> u32 {
    40
}

fn default_exempt_paths() -> Vec<String> {
    vec![
        "/api/v1/health".to_string(),
        "/api/v1/openapi.json".to_string(),
    ]
}

fn default_exempt_ips() -> Vec<std::net::IpAddr> {
    vec![
        std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
        std::net::IpAddr::V6(std::net::Ipv6Addr::LOCALHOST),
    ]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            upstream: UpstreamConfig {
                base_url: "https://cpi.example.com".to_string(),
                username: "svc".to_string(),
                password: "secret".to_string(),
                ..UpstreamConfig::default()
            },
            auth: AuthConfig {
                tenant_id: "tenant-1".to_string(),
                client_id: "client-1".to_string(),
                ..AuthConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn minimal_json_fills_defaults() {
        let json = r#"{
            "upstream": { "base_url": "https://cpi.example.com" },
            "auth": { "tenant_id": "t", "client_id": "c" }
        }"#;

        let config: Config = serde_json::from_str(json).expect("deserialize failed");

        assert_eq!(config.upstream.timeout, Duration::from_secs(30));
        assert_eq!(config.upstream.max_concurrent_fetches, 16);
        assert_eq!(config.upstream.retry.max_attempts, 2);
        assert!(config.auth.enabled);
        assert_eq!(config.auth.jwks_cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.auth.jwks_refresh_cooldown, Duration::from_secs(300));
        assert_eq!(config.email.sender_mailbox, "drawinglocator@tennantco.com");
        assert_eq!(config.email.allowed_recipient_suffix, "@tennantco.com");
        assert_eq!(config.email.max_attachment_bytes, 50 * 1024 * 1024);
        assert_eq!(config.server.api.request_timeout, Duration::from_secs(120));
        config.validate().expect("defaults must validate");
    }

    #[test]
    fn api_settings_sit_at_top_level() {
        let json = r#"{
            "upstream": { "base_url": "http://localhost:9000" },
            "api": { "bind_address": "0.0.0.0:9999", "swagger_ui": false }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.server.api.bind_address.port(), 9999);
        assert!(!config.server.api.swagger_ui);
    }

    #[test]
    fn issuer_and_jwks_url_derive_from_tenant() {
        let auth = AuthConfig {
            tenant_id: "abc".to_string(),
            ..AuthConfig::default()
        };
        assert_eq!(auth.issuer(), "https://login.microsoftonline.com/abc/v2.0");
        assert_eq!(
            auth.jwks_url(),
            "https://login.microsoftonline.com/abc/discovery/v2.0/keys"
        );

        let overridden = AuthConfig {
            jwks_url: Some("http://127.0.0.1:1234/keys".to_string()),
            ..auth
        };
        assert_eq!(overridden.jwks_url(), "http://127.0.0.1:1234/keys");
    }

    #[test]
    fn default_policies() {
        let policies = EndpointPolicies::default();
        assert!(policies.search.scopes.contains(&"Document.Search".to_string()));
        assert!(policies.preview.scopes.contains(&"Document.Preview".to_string()));
        assert_eq!(policies.download.groups, vec!["Editor".to_string()]);
        assert_eq!(policies.email.scopes, vec!["Document.Download".to_string()]);
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = valid_config();
        config.upstream.base_url = "not a url".to_string();

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("upstream.base_url"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = valid_config();
        config.upstream.max_concurrent_fetches = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::Config { key: Some(k), .. }) if k == "upstream.max_concurrent_fetches"
        ));
    }

    #[test]
    fn validate_requires_tenant_only_when_auth_enabled() {
        let mut config = valid_config();
        config.auth.tenant_id.clear();
        assert!(config.validate().is_err());

        config.auth.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_suffix_without_at_sign() {
        let mut config = valid_config();
        config.email.allowed_recipient_suffix = "tennantco.com".to_string();
        assert!(config.validate().is_err());
    }

    // --- Duration serde helpers ---

    #[test]
    fn duration_serde_serializes_as_seconds() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(120),
            ..RetryConfig::default()
        };

        let json = serde_json::to_value(&config).expect("serialize failed");

        assert_eq!(
            json["initial_delay"], 5,
            "duration_serde must serialize Duration as integer seconds"
        );
        assert_eq!(json["max_delay"], 120);
    }

    #[test]
    fn duration_serde_rejects_string_instead_of_integer() {
        let json = r#"{"base_url":"http://x","timeout":"30s"}"#;
        let result = serde_json::from_str::<UpstreamConfig>(json);
        assert!(result.is_err(), "durations are integer seconds, not strings");
    }
}
