//! Microsoft Graph `sendMail` delivery

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::EmailConfig;
use crate::documents::encode_base64;
use crate::error::{Error, Result};

use super::{Mailer, SendMail};

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens are renewed this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailRequest<'a> {
    message: GraphMessage<'a>,
    save_to_sent_items: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage<'a> {
    subject: &'a str,
    body: ItemBody<'a>,
    to_recipients: Vec<Recipient<'a>>,
    attachments: Vec<FileAttachment<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody<'a> {
    content_type: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Recipient<'a> {
    email_address: EmailAddress<'a>,
}

#[derive(Serialize)]
struct EmailAddress<'a> {
    address: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileAttachment<'a> {
    #[serde(rename = "@odata.type")]
    odata_type: &'static str,
    name: &'a str,
    content_type: &'a str,
    content_bytes: String,
}

/// [`Mailer`] sending through Microsoft Graph from a shared mailbox
///
/// Uses the OAuth2 client-credentials flow; the access token is cached and
/// renewed shortly before it expires.
pub struct GraphMailer {
    http_client: reqwest::Client,
    config: EmailConfig,
    token: Mutex<Option<CachedToken>>,
}

impl GraphMailer {
    /// Create a mailer from the e-mail configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: EmailConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.access_token.clone());
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority_url.trim_end_matches('/'),
            self.config.tenant_id
        );

        let response = self
            .http_client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| Error::Email(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Email(format!(
                "token endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Email(format!("invalid token response: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        tracing::debug!(expires_in = token.expires_in, "Obtained Graph access token");

        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn forget_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl Mailer for GraphMailer {
    async fn send(&self, mail: SendMail) -> Result<()> {
        let access_token = self.access_token().await?;

        let request = SendMailRequest {
            message: GraphMessage {
                subject: &mail.subject,
                body: ItemBody {
                    content_type: "Text",
                    content: &mail.body,
                },
                to_recipients: vec![Recipient {
                    email_address: EmailAddress {
                        address: mail.recipient.as_str(),
                    },
                }],
                attachments: vec![FileAttachment {
                    odata_type: "#microsoft.graph.fileAttachment",
                    name: &mail.attachment.name,
                    content_type: &mail.attachment.content_type,
                    content_bytes: encode_base64(&mail.attachment.bytes),
                }],
            },
            save_to_sent_items: false,
        };

        let url = format!(
            "{}/v1.0/users/{}/sendMail",
            self.config.graph_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.sender_mailbox)
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Email(format!("sendMail request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.forget_token().await;
            }
            tracing::error!(
                status = status.as_u16(),
                recipient = %mail.recipient,
                "Graph rejected sendMail"
            );
            return Err(Error::Email(format!(
                "sendMail returned HTTP {}",
                status.as_u16()
            )));
        }

        tracing::info!(
            recipient = %mail.recipient,
            file_name = %mail.attachment.name,
            size_bytes = mail.attachment.bytes.len(),
            "E-mail sent"
        );

        Ok(())
    }
}
