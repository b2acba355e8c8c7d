//! E-mail delivery of packaged documents
//!
//! The document service only depends on the [`Mailer`] trait. Implementations:
//!
//! - [`GraphMailer`]: sends through Microsoft Graph with client credentials
//! - [`DisabledMailer`]: rejects every send, used when mail is not configured

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::RecipientAddress;

mod graph;

pub use graph::GraphMailer;

/// File attached to an outgoing message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailAttachment {
    /// File name shown to the recipient
    pub name: String,
    /// MIME type of `bytes`
    pub content_type: String,
    /// Raw attachment content
    pub bytes: Vec<u8>,
}

/// One outgoing message with a single attachment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendMail {
    /// Validated recipient
    pub recipient: RecipientAddress,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
    /// The packaged documents
    pub attachment: EmailAttachment,
}

/// Sends messages on behalf of the gateway
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message
    ///
    /// # Errors
    ///
    /// Returns [`Error::Email`] when the mail service rejects or fails the send
    async fn send(&self, mail: SendMail) -> Result<()>;
}

/// Mailer used when no mail credentials are configured
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, mail: SendMail) -> Result<()> {
        tracing::warn!(
            recipient = %mail.recipient,
            "E-mail requested but mail delivery is not configured"
        );
        Err(Error::Email("mail delivery is not configured".to_string()))
    }
}
