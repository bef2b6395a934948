use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use dentra_config::QueueConfig;
use dentra_models::{EmailMessage, EmailType};
use dentra_observability::track_email_dispatch;
use dentra_queue::{MessagePublisher, QueueError, Record};

/// Hands email intents to the delivery side. Returning `Ok` means the
/// intent is durably queued, not that the email was sent.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send_verification_email(&self, email: &str, token: &str) -> Result<(), DispatchError>;

    async fn send_password_reset_email(&self, email: &str, token: &str)
    -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchFailure {
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Publish(#[from] QueueError),

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),
}

/// A failed handoff. The display text is safe to return to a client; the
/// topic and recipient are for logs.
#[derive(Debug, thiserror::Error)]
#[error("Failed to send {email_type} email: {reason}")]
pub struct DispatchError {
    pub topic: String,
    pub recipient: String,
    pub email_type: EmailType,
    #[source]
    pub reason: DispatchFailure,
}

/// Publishes [`EmailMessage`]s to one topic per email type, keyed by
/// recipient so that one recipient's messages share a partition.
#[derive(Clone)]
pub struct QueueEmailDispatcher {
    publisher: Arc<dyn MessagePublisher>,
    verification_topic: String,
    password_reset_topic: String,
    publish_timeout: Duration,
}

impl QueueEmailDispatcher {
    pub fn new(publisher: Arc<dyn MessagePublisher>, config: &QueueConfig) -> Self {
        Self {
            publisher,
            verification_topic: config.verification_topic.clone(),
            password_reset_topic: config.password_reset_topic.clone(),
            publish_timeout: config.publish_timeout,
        }
    }

    fn topic_for(&self, email_type: EmailType) -> &str {
        match email_type {
            EmailType::Verification => &self.verification_topic,
            EmailType::PasswordReset => &self.password_reset_topic,
        }
    }

    #[instrument(skip(self, message), fields(email.kind = %message.kind()))]
    async fn dispatch(&self, message: EmailMessage) -> Result<(), DispatchError> {
        let email_type = message.kind();
        let topic = self.topic_for(email_type).to_string();

        let result = self.publish(&topic, &message).await;
        track_email_dispatch(email_type.as_str(), result.is_ok());

        match result {
            Ok(entry_id) => {
                debug!(queue.topic = %topic, queue.entry_id = %entry_id, "Email queued");
                Ok(())
            }
            Err(reason) => Err(DispatchError {
                topic,
                recipient: message.to().to_string(),
                email_type,
                reason,
            }),
        }
    }

    async fn publish(&self, topic: &str, message: &EmailMessage) -> Result<String, DispatchFailure> {
        let payload = message.to_json()?;
        let record = Record::new(topic, message.to(), payload)
            .with_header("type", message.kind().as_str());

        let entry_id = tokio::time::timeout(self.publish_timeout, self.publisher.publish(record))
            .await
            .map_err(|_| DispatchFailure::Timeout(self.publish_timeout))??;

        Ok(entry_id)
    }
}

#[async_trait]
impl EmailDispatcher for QueueEmailDispatcher {
    async fn send_verification_email(&self, email: &str, token: &str) -> Result<(), DispatchError> {
        self.dispatch(EmailMessage::verification(email, token)).await
    }

    async fn send_password_reset_email(
        &self,
        email: &str,
        token: &str,
    ) -> Result<(), DispatchError> {
        self.dispatch(EmailMessage::password_reset(email, token)).await
    }
}
