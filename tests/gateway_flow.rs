//! End-to-end flows through a live gateway
//!
//! The gateway runs on an ephemeral port. The upstream document API, the
//! Azure AD key endpoint and Microsoft Graph are wiremock servers, and callers
//! present RS256 tokens signed with `tests/fixtures/jwt_signing_key.pem`.

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use std::time::Duration;
use wiremock::MockServer;

struct Harness {
    upstream: MockServer,
    identity: MockServer,
}

impl Harness {
    async fn new() -> Self {
        Self {
            upstream: MockServer::start().await,
            identity: MockServer::start().await,
        }
    }

    fn config(&self) -> document_gateway::Config {
        gateway_config(&self.upstream.uri(), &self.identity.uri())
    }
}

#[tokio::test]
async fn search_reports_part_numbers_without_documents() {
    let h = Harness::new().await;
    mount_jwks(&h.identity, 1).await;
    mount_search(
        &h.upstream,
        "10,20",
        serde_json::json!({ "data": [upstream_metadata("DOC-10", 10, "B")] }),
    )
    .await;

    let server = TestServer::start(h.config()).await;
    let response = reqwest::Client::new()
        .get(server.url("/documents/search"))
        .query(&[("part_numbers", "10,20")])
        .header("Authorization", Caller::viewer().bearer())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"][0]["id"], "DOC-10");
    assert_eq!(body["data"][0]["revision"], "B");
    assert_eq!(body["not_found"]["part_numbers"], serde_json::json!([20]));

    server.stop().await;
}

#[tokio::test]
async fn download_packages_available_documents_and_names_the_rest() {
    let h = Harness::new().await;
    mount_jwks(&h.identity, 1).await;
    mount_document(&h.upstream, "A", b"%PDF-A").await;
    mount_document_status(&h.upstream, "B", 500).await;
    mount_document(&h.upstream, "C", b"%PDF-C").await;
    mount_document_status(&h.upstream, "D", 404).await;

    let server = TestServer::start(h.config()).await;
    let response = reqwest::Client::new()
        .post(server.url("/documents/download"))
        .header("Authorization", Caller::editor().bearer())
        .json(&serde_json::json!({ "document_ids": ["A", "B", "C", "D"] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "content-type"), Some("application/zip"));
    assert_eq!(header(&response, "x-missing-document-ids"), Some("B,D"));

    let entries = zip_entries(&response.bytes().await.unwrap());
    assert_eq!(
        entries,
        vec![
            ("document_A.pdf".to_string(), b"%PDF-A".to_vec()),
            ("document_C.pdf".to_string(), b"%PDF-C".to_vec()),
        ]
    );

    server.stop().await;
}

#[tokio::test]
async fn download_with_nothing_available_is_404() {
    let h = Harness::new().await;
    mount_jwks(&h.identity, 1).await;
    mount_document_status(&h.upstream, "A", 404).await;
    mount_document_status(&h.upstream, "B", 503).await;

    let server = TestServer::start(h.config()).await;
    let response = reqwest::Client::new()
        .post(server.url("/documents/download"))
        .header("Authorization", Caller::editor().bearer())
        .json(&serde_json::json!({ "document_ids": ["A", "B"] }))
        .send()
        .await
        .unwrap();

    let body = assert_error(response, 404, "all_documents_unavailable").await;
    assert_eq!(body["error"]["details"]["document_ids"], serde_json::json!(["A", "B"]));

    server.stop().await;
}

#[tokio::test]
async fn preview_of_unknown_document_is_404() {
    let h = Harness::new().await;
    mount_jwks(&h.identity, 1).await;
    mount_document_status(&h.upstream, "GONE", 404).await;

    let server = TestServer::start(h.config()).await;
    let response = reqwest::Client::new()
        .get(server.url("/documents/GONE/preview"))
        .header("Authorization", Caller::viewer().bearer())
        .send()
        .await
        .unwrap();

    assert_error(response, 404, "document_not_found").await;
    server.stop().await;
}

#[tokio::test]
async fn slow_upstream_preview_is_504() {
    let h = Harness::new().await;
    mount_jwks(&h.identity, 1).await;
    wiremock::Mock::given(wiremock::matchers::path("/api/v1/documents/get/"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&h.upstream)
        .await;

    let mut config = h.config();
    config.upstream.timeout = Duration::from_millis(200);
    config.upstream.retry.max_attempts = 0;

    let server = TestServer::start(config).await;
    let response = reqwest::Client::new()
        .get(server.url("/documents/SLOW/preview"))
        .header("Authorization", Caller::viewer().bearer())
        .send()
        .await
        .unwrap();

    assert_error(response, 504, "upstream_timeout").await;
    server.stop().await;
}

#[tokio::test]
async fn email_delivers_zip_through_graph() {
    let h = Harness::new().await;
    let config = h.config();
    mount_jwks(&h.identity, 1).await;
    mount_graph(&h.identity, &config, 1).await;
    mount_document(&h.upstream, "A", b"%PDF-A").await;
    mount_document_status(&h.upstream, "B", 404).await;

    let server = TestServer::start(config).await;
    let response = reqwest::Client::new()
        .post(server.url("/documents/email"))
        .header("Authorization", Caller::editor().bearer())
        .json(&serde_json::json!({
            "document_ids": ["A", "B"],
            "email": "jane.doe@tennantco.com"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "failed": { "document_ids": ["B"] } }));

    server.stop().await;
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let h = Harness::new().await;
    mount_jwks(&h.identity, 1).await;

    let expired = Caller {
        expires_in: -3600,
        ..Caller::editor()
    };

    let server = TestServer::start(h.config()).await;
    let response = reqwest::Client::new()
        .get(server.url("/documents/search"))
        .query(&[("part_numbers", "10")])
        .header("Authorization", expired.bearer())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(header(&response, "www-authenticate"), Some("Bearer"));
    assert_error(response, 401, "unauthorized").await;

    server.stop().await;
}

#[tokio::test]
async fn viewer_cannot_download() {
    let h = Harness::new().await;
    mount_jwks(&h.identity, 1).await;

    let server = TestServer::start(h.config()).await;
    let response = reqwest::Client::new()
        .post(server.url("/documents/download"))
        .header("Authorization", Caller::viewer().bearer())
        .json(&serde_json::json!({ "document_ids": ["A"] }))
        .send()
        .await
        .unwrap();

    assert_error(response, 403, "forbidden").await;
    server.stop().await;
}

#[tokio::test]
async fn signing_keys_are_fetched_once_across_requests() {
    let h = Harness::new().await;
    // Verified when the mock server drops
    mount_jwks(&h.identity, 1).await;
    mount_document(&h.upstream, "A", b"abc").await;

    let server = TestServer::start(h.config()).await;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let response = client
            .get(server.url("/documents/A/preview"))
            .header("Authorization", Caller::viewer().bearer())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["content_base64"], "YWJj");
    }

    server.stop().await;
}

#[tokio::test]
async fn unknown_key_ids_do_not_refetch_signing_keys() {
    let h = Harness::new().await;
    // Verified when the mock server drops
    mount_jwks(&h.identity, 1).await;

    let server = TestServer::start(h.config()).await;
    let client = reqwest::Client::new();

    for i in 0..5 {
        let token = Caller::editor().token_with_kid(&format!("forged-{i}"));
        let response = client
            .get(server.url("/documents/search"))
            .query(&[("part_numbers", "10")])
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .unwrap();

        assert_error(response, 401, "unauthorized").await;
    }

    server.stop().await;
}

#[tokio::test]
async fn health_needs_no_token() {
    let h = Harness::new().await;
    mount_jwks(&h.identity, 0).await;

    let server = TestServer::start(h.config()).await;
    let response = reqwest::get(server.url("/health")).await.unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    server.stop().await;
}
