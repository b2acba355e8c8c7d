//! Tokens, key sets and mocked upstream endpoints

use document_gateway::Config;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Tenant the test tokens are issued for
pub const TENANT_ID: &str = "tenant-1";
/// Audience of the test tokens
pub const CLIENT_ID: &str = "client-1";
/// Key id in `tests/fixtures/jwks.json`
pub const SIGNING_KID: &str = "test-key-1";
/// Upstream basic auth credentials
pub const UPSTREAM_USER: &str = "cpi-user";
/// Upstream basic auth credentials
pub const UPSTREAM_PASSWORD: &str = "cpi-secret";

const SIGNING_KEY_PEM: &[u8] = include_bytes!("../fixtures/jwt_signing_key.pem");
const JWKS: &str = include_str!("../fixtures/jwks.json");

/// Claims a test caller presents
pub struct Caller {
    pub groups: Vec<&'static str>,
    pub roles: Vec<&'static str>,
    pub scp: Option<&'static str>,
    /// Seconds until expiry; negative for an expired token
    pub expires_in: i64,
}

impl Caller {
    /// Member of the Editor group
    pub fn editor() -> Self {
        Self {
            groups: vec!["Editor"],
            roles: vec![],
            scp: None,
            expires_in: 600,
        }
    }

    /// Only holds the search and preview scopes
    pub fn viewer() -> Self {
        Self {
            groups: vec![],
            roles: vec![],
            scp: Some("Document.Search Document.Preview"),
            expires_in: 600,
        }
    }

    /// Sign an RS256 access token for this caller
    pub fn token(&self) -> String {
        self.token_with_kid(SIGNING_KID)
    }

    /// Sign with the test key but name `kid` in the header
    pub fn token_with_kid(&self, kid: &str) -> String {
        let claims = serde_json::json!({
            "iss": format!("https://login.microsoftonline.com/{TENANT_ID}/v2.0"),
            "aud": CLIENT_ID,
            "sub": "integration-test",
            "exp": chrono::Utc::now().timestamp() + self.expires_in,
            "groups": self.groups,
            "roles": self.roles,
            "scp": self.scp,
        });

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        let key = EncodingKey::from_rsa_pem(SIGNING_KEY_PEM).expect("test signing key");
        encode(&header, &claims, &key).expect("sign test token")
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token())
    }
}

/// Serve the signing key set; expects exactly `expected_fetches` downloads
pub async fn mount_jwks(identity: &MockServer, expected_fetches: u64) {
    Mock::given(method("GET"))
        .and(path("/discovery/keys"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(JWKS)
                .insert_header("content-type", "application/json"),
        )
        .expect(expected_fetches)
        .mount(identity)
        .await;
}

/// Upstream returns `content` for document `id`
pub async fn mount_document(upstream: &MockServer, id: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path("/api/v1/documents/get/"))
        .and(query_param("id", id))
        .and(basic_auth(UPSTREAM_USER, UPSTREAM_PASSWORD))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(upstream)
        .await;
}

/// Upstream answers `status` for document `id`
pub async fn mount_document_status(upstream: &MockServer, id: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path("/api/v1/documents/get/"))
        .and(query_param("id", id))
        .respond_with(ResponseTemplate::new(status))
        .mount(upstream)
        .await;
}

/// Upstream search returns `body` for the exact `csv` query
pub async fn mount_search(upstream: &MockServer, csv: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/documents/search/"))
        .and(query_param("part_numbers", csv))
        .and(basic_auth(UPSTREAM_USER, UPSTREAM_PASSWORD))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(upstream)
        .await;
}

/// Client-credentials token endpoint and `sendMail` for the configured sender
pub async fn mount_graph(identity: &MockServer, config: &Config, expected_sends: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/{}/oauth2/v2.0/token", config.email.tenant_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "graph-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(identity)
        .await;

    Mock::given(method("POST"))
        .and(path(format!(
            "/v1.0/users/{}/sendMail",
            urlencoding::encode(&config.email.sender_mailbox)
        )))
        .respond_with(ResponseTemplate::new(202))
        .expect(expected_sends)
        .mount(identity)
        .await;
}

/// Metadata record as the upstream search endpoint reports it
pub fn upstream_metadata(id: &str, part_number: i64, rev: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "part_number": part_number,
        "rev": rev,
        "date_created": "2024-03-01T12:00:00Z",
        "file_size_bytes": 2048
    })
}
