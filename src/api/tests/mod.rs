use super::*;
use crate::auth::{ClaimSet, TokenVerifier};
use crate::config::{Config, UpstreamConfig};
use crate::documents::DocumentService;
use crate::email::{Mailer, SendMail};
use crate::error::{ApiError, UpstreamError};
use crate::types::{DocumentId, DocumentMetadata, PartNumbers};
use crate::upstream::DocumentSource;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use chrono::TimeZone;
use std::collections::HashMap;
use std::sync::Mutex;
use tower::ServiceExt;


/// In-memory upstream
#[derive(Default)]
struct FakeSource {
    documents: HashMap<String, Vec<u8>>,
    failing: Vec<String>,
    metadata: Vec<DocumentMetadata>,
}

impl FakeSource {
    fn with_documents(documents: &[(&str, &str)]) -> Self {
        Self {
            documents: documents
                .iter()
                .map(|(id, content)| (id.to_string(), content.as_bytes().to_vec()))
                .collect(),
            ..Self::default()
        }
    }

    fn failing(mut self, ids: &[&str]) -> Self {
        self.failing = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    fn with_metadata(mut self, part_numbers: &[(i64, &str)]) -> Self {
        self.metadata = part_numbers
            .iter()
            .map(|(part_number, id)| DocumentMetadata {
                id: DocumentId::from(*id),
                part_number: *part_number,
                revision: "A".to_string(),
                created_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                size_bytes: 1024,
            })
            .collect();
        self
    }
}

#[async_trait]
impl DocumentSource for FakeSource {
    async fn fetch_content(
        &self,
        id: &DocumentId,
    ) -> std::result::Result<Option<Vec<u8>>, UpstreamError> {
        if self.failing.iter().any(|f| f == id.as_str()) {
            return Err(UpstreamError::Status { status: 500 });
        }
        Ok(self.documents.get(id.as_str()).cloned())
    }

    async fn fetch_metadata(
        &self,
        part_numbers: &PartNumbers,
    ) -> std::result::Result<Vec<DocumentMetadata>, UpstreamError> {
        Ok(self
            .metadata
            .iter()
            .filter(|m| part_numbers.as_slice().contains(&m.part_number))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<SendMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: SendMail) -> crate::Result<()> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// Accepts `editor-token` and `viewer-token`, rejects anything else
struct StaticVerifier;

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> crate::Result<ClaimSet> {
        match token {
            "editor-token" => Ok(ClaimSet {
                groups: vec!["Editor".into()],
                ..ClaimSet::default()
            }),
            "viewer-token" => Ok(ClaimSet {
                roles: vec!["Viewer".into()],
                scp: Some("Document.Search Document.Preview".into()),
                ..ClaimSet::default()
            }),
            _ => Err(crate::Error::Authentication("invalid token".into())),
        }
    }
}

const EDITOR: Option<&str> = Some("Bearer editor-token");
const VIEWER: Option<&str> = Some("Bearer viewer-token");

fn test_config() -> Config {
    let mut config = Config {
        upstream: UpstreamConfig {
            base_url: "http://upstream.invalid".to_string(),
            ..UpstreamConfig::default()
        },
        ..Config::default()
    };
    config.auth.tenant_id = "tenant-1".to_string();
    config.auth.client_id = "client-1".to_string();
    config
}

fn test_state(source: FakeSource, mailer: Arc<RecordingMailer>, config: Config) -> AppState {
    let service = DocumentService::new(Arc::new(source), mailer, &config);
    AppState::new(service, Arc::new(config), Some(Arc::new(StaticVerifier)))
}

fn app_with(source: FakeSource, config: Config) -> Router {
    create_router(test_state(
        source,
        Arc::new(RecordingMailer::default()),
        config,
    ))
}

fn app(source: FakeSource) -> Router {
    app_with(source, test_config())
}

async fn get_request(app: Router, uri: &str, authorization: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(
    app: Router,
    uri: &str,
    authorization: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn error_code(response: Response<Body>) -> String {
    let error: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
    error.error.code
}

#[tokio::test]
async fn test_server_serves_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let state = test_state(
        FakeSource::default(),
        Arc::new(RecordingMailer::default()),
        test_config(),
    );
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, state, async {
        stopped.await.ok();
    }));

    let response = reqwest::get(format!("http://{address}/api/v1/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = get_request(app(FakeSource::default()), "/api/v1/downloads", EDITOR).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
