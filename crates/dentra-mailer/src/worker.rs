//! Queue consumer that turns email intents into SMTP deliveries.
//!
//! Per record: parse the JSON payload, render the template for its `type`,
//! relay through the [`MailTransport`], then commit. Every outcome ends in a
//! commit; a failed delivery is logged and dropped, and an unparseable
//! payload is optionally forwarded to a dead-letter topic first.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use dentra_models::EmailMessage;
use dentra_queue::{Delivery, MessageConsumer, MessagePublisher, QueueError, Record};

use crate::templates::render_email;
use crate::transport::MailTransport;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

/// What happened to one record. The record is committed in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    DeliveryFailed,
    RenderFailed,
    Unparseable,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Sent => "sent",
            Outcome::DeliveryFailed => "delivery_failed",
            Outcome::RenderFailed => "render_failed",
            Outcome::Unparseable => "unparseable",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub frontend_url: String,
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub dead_letter_topic: Option<String>,
}

pub struct EmailWorker<C> {
    consumer: C,
    transport: Arc<dyn MailTransport>,
    dead_letter: Option<Arc<dyn MessagePublisher>>,
    settings: WorkerSettings,
}

impl<C: MessageConsumer> EmailWorker<C> {
    pub fn new(consumer: C, transport: Arc<dyn MailTransport>, settings: WorkerSettings) -> Self {
        Self {
            consumer,
            transport,
            dead_letter: None,
            settings,
        }
    }

    /// Publisher used to forward unparseable payloads to
    /// `settings.dead_letter_topic`. Without one they are only logged.
    pub fn with_dead_letter(mut self, publisher: Arc<dyn MessagePublisher>) -> Self {
        self.dead_letter = Some(publisher);
        self
    }

    /// Polls until `shutdown` turns true. The flag is checked between
    /// fetches, so a batch in progress is always finished and committed.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), WorkerError> {
        info!(
            batch_size = self.settings.batch_size,
            dead_letter = ?self.settings.dead_letter_topic,
            "Email worker started"
        );

        while !*shutdown.borrow() {
            let handled = match self.poll_once().await {
                Ok(handled) => handled,
                Err(e) => {
                    error!(error = %e, "Failed to fetch from queue");
                    0
                }
            };

            if handled == 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.settings.poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        info!("Email worker stopped");
        Ok(())
    }

    /// Fetches one batch and handles every record in it. Returns how many
    /// records were handled.
    pub async fn poll_once(&mut self) -> Result<usize, WorkerError> {
        let batch = self.consumer.fetch(self.settings.batch_size).await?;

        for delivery in &batch {
            let outcome = self.handle(delivery).await;
            counter!("email_worker_messages_total", "outcome" => outcome.as_str()).increment(1);

            if let Err(e) = self.consumer.commit(delivery).await {
                error!(
                    error = %e,
                    queue.topic = %delivery.record.topic,
                    queue.entry_id = %delivery.id,
                    "Failed to commit record"
                );
            }
        }

        Ok(batch.len())
    }

    #[instrument(
        skip(self, delivery),
        fields(
            queue.topic = %delivery.record.topic,
            queue.partition = delivery.partition,
            queue.entry_id = %delivery.id
        )
    )]
    async fn handle(&self, delivery: &Delivery) -> Outcome {
        let message = match EmailMessage::from_json(&delivery.record.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropping unparseable email message");
                self.forward_to_dead_letter(delivery).await;
                return Outcome::Unparseable;
            }
        };

        let email = match render_email(&message, &self.settings.frontend_url) {
            Ok(email) => email,
            Err(e) => {
                error!(
                    error = %e,
                    email.recipient = %message.to(),
                    email.kind = %message.kind(),
                    "Failed to render email"
                );
                return Outcome::RenderFailed;
            }
        };

        match self.transport.send(&email).await {
            Ok(()) => {
                debug!(email.recipient = %message.to(), email.kind = %message.kind(), "Email sent");
                Outcome::Sent
            }
            Err(e) => {
                error!(
                    error = %e,
                    email.recipient = %message.to(),
                    email.kind = %message.kind(),
                    "Failed to send email"
                );
                Outcome::DeliveryFailed
            }
        }
    }

    async fn forward_to_dead_letter(&self, delivery: &Delivery) {
        let (Some(publisher), Some(topic)) =
            (&self.dead_letter, &self.settings.dead_letter_topic)
        else {
            return;
        };

        let mut record = Record::new(topic, &delivery.record.key, delivery.record.payload.clone())
            .with_header("source-topic", &delivery.record.topic)
            .with_header("source-id", &delivery.id);
        for (name, value) in &delivery.record.headers {
            record.headers.entry(name.clone()).or_insert_with(|| value.clone());
        }

        if let Err(e) = publisher.publish(record).await {
            error!(error = %e, dead_letter.topic = %topic, "Failed to forward to dead-letter topic");
        }
    }
}
