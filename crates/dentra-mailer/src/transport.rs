use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::instrument;

use dentra_config::EmailConfig;

use crate::templates::RenderedEmail;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("Failed to send email: {0}")]
    Send(String),

    #[error("SMTP send timed out")]
    Timeout,
}

/// Outbound mail relay.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &RenderedEmail) -> Result<(), MailError>;
}

/// SMTP relay through `lettre`'s async transport.
///
/// Without credentials the transport talks plain SMTP (local relays such as
/// Mailpit); with credentials it uses the TLS relay builder.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    timeout: std::time::Duration,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let transport = if config.smtp_username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .timeout(Some(config.smtp_timeout))
                .build()
        } else {
            let creds = Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            );

            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| MailError::Build(format!("Failed to create SMTP relay: {}", e)))?
                .port(config.smtp_port)
                .credentials(creds)
                .timeout(Some(config.smtp_timeout))
                .build()
        };

        Ok(Self {
            transport,
            from: format!("{} <{}>", config.from_name, config.from_email),
            timeout: config.smtp_timeout,
        })
    }

    fn build_message(&self, email: &RenderedEmail) -> Result<Message, MailError> {
        Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| MailError::InvalidAddress(format!("from: {}", e)))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| MailError::InvalidAddress(format!("to: {}", e)))?)
            .subject(email.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    #[instrument(skip(self, email), fields(email.subject = %email.subject))]
    async fn send(&self, email: &RenderedEmail) -> Result<(), MailError> {
        let message = self.build_message(email)?;

        tokio::time::timeout(self.timeout, self.transport.send(message))
            .await
            .map_err(|_| MailError::Timeout)?
            .map_err(|e| MailError::Send(e.to_string()))?;

        Ok(())
    }
}

/// Records sent emails instead of relaying them.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<RenderedEmail>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<RenderedEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// While set, every send fails with [`MailError::Send`].
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }
}

#[async_trait]
impl MailTransport for MemoryMailer {
    async fn send(&self, email: &RenderedEmail) -> Result<(), MailError> {
        if self.failing.lock().map(|f| *f).unwrap_or(false) {
            return Err(MailError::Send("relay refused connection".to_string()));
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}
