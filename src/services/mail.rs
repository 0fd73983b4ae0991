//! Mail transport abstraction.
//!
//! The core composes [`OutgoingMail`] values and hands them to a [`Mailer`].
//! [`SesMailer`] delivers through Amazon SES; [`DisabledMailer`] stands in
//! when no transport is configured and refuses every message.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use aws_sdk_sesv2::{
    Client as SesClient,
    error::DisplayErrorContext,
    primitives::Blob,
    types::{Destination, EmailContent, RawMessage},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Line length for base64 bodies in MIME parts.
const MIME_LINE: usize = 76;

/// A file attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// A fully composed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Sender address
    pub from: String,
    /// Sender display name
    pub from_name: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<Attachment>,
}

/// Anything that can deliver an [`OutgoingMail`].
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Hands the message to the transport. Returns once the transport accepted it.
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Used when no transport is configured. Every send fails, so callers never
/// report a delivery that did not happen.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        warn!(
            to = %mail.to,
            subject = %mail.subject,
            "Mail transport not configured, message not sent"
        );
        Err(Error::Mail {
            message: "no mail transport is configured".to_string(),
        })
    }
}

/// Delivers raw MIME messages through Amazon SES v2.
#[derive(Debug, Clone)]
pub struct SesMailer {
    client: SesClient,
}

impl SesMailer {
    /// Wraps an existing client.
    #[must_use]
    pub const fn new(client: SesClient) -> Self {
        Self { client }
    }

    /// Builds a client from the default AWS credential chain, optionally
    /// pinned to `region`.
    pub async fn from_env(region: Option<String>) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = match region {
            Some(region) => {
                let ses_config = aws_config
                    .to_builder()
                    .region(aws_config::Region::new(region))
                    .build();
                SesClient::new(&ses_config)
            }
            None => SesClient::new(&aws_config),
        };
        Self::new(client)
    }
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let boundary = format!("staffdesk-{}", Uuid::new_v4().simple());
        let raw = RawMessage::builder()
            .data(Blob::new(build_mime(mail, &boundary)))
            .build()
            .map_err(|e| Error::Mail {
                message: e.to_string(),
            })?;

        self.client
            .send_email()
            .from_email_address(&mail.from)
            .destination(Destination::builder().to_addresses(&mail.to).build())
            .content(EmailContent::builder().raw(raw).build())
            .send()
            .await
            .map_err(|e| Error::Mail {
                message: DisplayErrorContext(&e).to_string(),
            })?;

        info!(to = %mail.to, subject = %mail.subject, "Mail sent");
        Ok(())
    }
}

/// RFC 2047 encoded-word for header text that is not plain ASCII.
fn encode_header(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        text.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(text))
    }
}

/// Strips characters that would break out of a quoted header parameter.
fn header_param(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '"' | '\\' | '\r' | '\n'))
        .collect()
}

fn push_base64(out: &mut String, bytes: &[u8]) {
    let encoded = STANDARD.encode(bytes);
    for chunk in encoded.as_bytes().chunks(MIME_LINE) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push_str("\r\n");
    }
}

/// Renders `mail` as a `multipart/mixed` message: the HTML body first, then
/// each attachment, all base64 encoded.
#[must_use]
pub fn build_mime(mail: &OutgoingMail, boundary: &str) -> Vec<u8> {
    let mut out = String::new();
    let from = if mail.from_name.is_empty() {
        mail.from.clone()
    } else {
        format!("{} <{}>", encode_header(&mail.from_name), mail.from)
    };
    let _ = write!(
        out,
        "From: {from}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n",
        mail.to,
        encode_header(&mail.subject)
    );

    let _ = write!(
        out,
        "--{boundary}\r\nContent-Type: text/html; charset=UTF-8\r\n\
         Content-Transfer-Encoding: base64\r\n\r\n"
    );
    push_base64(&mut out, mail.html_body.as_bytes());

    for attachment in &mail.attachments {
        let name = header_param(&attachment.file_name);
        let _ = write!(
            out,
            "--{boundary}\r\nContent-Type: {}; name=\"{name}\"\r\n\
             Content-Disposition: attachment; filename=\"{name}\"\r\n\
             Content-Transfer-Encoding: base64\r\n\r\n",
            attachment.mime_type
        );
        push_base64(&mut out, &attachment.bytes);
    }
    let _ = write!(out, "--{boundary}--\r\n");
    out.into_bytes()
}

/// Records messages in memory. Can be switched into a failing mode to
/// exercise transport errors.
#[derive(Debug, Default, Clone)]
pub struct MemoryMailer {
    sent: Arc<RwLock<Vec<OutgoingMail>>>,
    failing: Arc<RwLock<bool>>,
}

impl MemoryMailer {
    /// Creates an empty, working mailer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail (or succeed again).
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    /// Messages accepted so far.
    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        if *self.failing.read().await {
            return Err(Error::Mail {
                message: format!("connection refused while sending to {}", mail.to),
            });
        }
        self.sent.write().await.push(mail.clone());
        Ok(())
    }
}
