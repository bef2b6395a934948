mod common;

use std::sync::Arc;
use std::time::Duration;

use common::generate_unique_email;
use dentra::modules::notifications::{EmailDispatcher, QueueEmailDispatcher};
use dentra_config::QueueConfig;
use dentra_mailer::{EmailWorker, MemoryMailer, WorkerSettings};
use dentra_queue::{MemoryBroker, MemoryConsumer, MessageConsumer, MessagePublisher, Record};

const GROUP: &str = "email-workers";
const CONSUMER: &str = "worker-p0-1-2-3";

fn topics() -> Vec<String> {
    QueueConfig::default().email_topics()
}

fn settings(dead_letter_topic: Option<&str>) -> WorkerSettings {
    WorkerSettings {
        frontend_url: "https://app.dentra.test".to_string(),
        batch_size: 8,
        poll_interval: Duration::from_millis(10),
        dead_letter_topic: dead_letter_topic.map(str::to_string),
    }
}

fn dispatcher(broker: &MemoryBroker) -> QueueEmailDispatcher {
    QueueEmailDispatcher::new(Arc::new(broker.clone()), &QueueConfig::default())
}

fn worker(broker: &MemoryBroker, mailer: &MemoryMailer) -> EmailWorker<MemoryConsumer> {
    EmailWorker::new(
        broker.consumer(GROUP, CONSUMER, &topics()),
        Arc::new(mailer.clone()),
        settings(None),
    )
}

async fn drain(worker: &mut EmailWorker<MemoryConsumer>) -> usize {
    let mut total = 0;
    loop {
        let handled = worker.poll_once().await.unwrap();
        if handled == 0 {
            return total;
        }
        total += handled;
    }
}

#[tokio::test]
async fn test_reset_email_delivered_with_frontend_link() {
    let broker = MemoryBroker::new(4);
    let mailer = MemoryMailer::new();
    let email = generate_unique_email();

    dispatcher(&broker)
        .send_password_reset_email(&email, "deadbeef")
        .await
        .unwrap();
    drain(&mut worker(&broker, &mailer)).await;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, email);
    assert_eq!(sent[0].subject, "Password Reset Request");
    assert!(
        sent[0]
            .text
            .contains("https://app.dentra.test/reset-password?token=deadbeef&email=")
    );
    assert_eq!(broker.pending_count(GROUP), 0);
}

#[tokio::test]
async fn test_messages_for_one_recipient_arrive_in_order() {
    let broker = MemoryBroker::new(4);
    let mailer = MemoryMailer::new();
    let dispatcher = dispatcher(&broker);
    let email = generate_unique_email();

    dispatcher
        .send_password_reset_email(&email, "token-a")
        .await
        .unwrap();
    for _ in 0..5 {
        dispatcher
            .send_password_reset_email(&generate_unique_email(), "noise")
            .await
            .unwrap();
    }
    dispatcher
        .send_password_reset_email(&email, "token-b")
        .await
        .unwrap();

    drain(&mut worker(&broker, &mailer)).await;

    let mine: Vec<_> = mailer.sent().into_iter().filter(|m| m.to == email).collect();
    assert_eq!(mine.len(), 2);
    assert!(mine[0].text.contains("token=token-a"));
    assert!(mine[1].text.contains("token=token-b"));
}

#[tokio::test]
async fn test_unparseable_payload_is_committed_and_dead_lettered() {
    let broker = MemoryBroker::new(2);
    let mailer = MemoryMailer::new();
    broker
        .publish(Record::new(
            "email.verification",
            "someone@clinic.test",
            b"{not json".to_vec(),
        ))
        .await
        .unwrap();

    let mut worker = EmailWorker::new(
        broker.consumer(GROUP, CONSUMER, &topics()),
        Arc::new(mailer.clone()),
        settings(Some("email.dead-letter")),
    )
    .with_dead_letter(Arc::new(broker.clone()));

    assert_eq!(drain(&mut worker).await, 1);
    assert!(mailer.sent().is_empty());
    assert_eq!(broker.pending_count(GROUP), 0);

    let dead = broker.records("email.dead-letter");
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].payload, b"{not json".to_vec());
    assert_eq!(dead[0].header("source-topic"), Some("email.verification"));
}

#[tokio::test]
async fn test_smtp_failure_is_committed_without_retry() {
    let broker = MemoryBroker::new(2);
    let mailer = MemoryMailer::new();
    mailer.set_failing(true);

    dispatcher(&broker)
        .send_verification_email(&generate_unique_email(), "jwt")
        .await
        .unwrap();

    let mut worker = worker(&broker, &mailer);
    assert_eq!(drain(&mut worker).await, 1);
    assert_eq!(broker.pending_count(GROUP), 0);

    mailer.set_failing(false);
    assert_eq!(drain(&mut worker).await, 0);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_uncommitted_messages_are_redelivered_after_restart() {
    let broker = MemoryBroker::new(1);
    let mailer = MemoryMailer::new();
    let email = generate_unique_email();

    dispatcher(&broker)
        .send_verification_email(&email, "jwt")
        .await
        .unwrap();

    {
        let mut crashed = broker.consumer(GROUP, CONSUMER, &topics());
        let batch = crashed.fetch(8).await.unwrap();
        assert_eq!(batch.len(), 1);
    }
    assert_eq!(broker.pending_count(GROUP), 1);

    drain(&mut worker(&broker, &mailer)).await;

    assert_eq!(mailer.sent().len(), 1);
    assert_eq!(mailer.sent()[0].to, email);
    assert_eq!(broker.pending_count(GROUP), 0);
}

#[tokio::test]
async fn test_idle_messages_of_a_crashed_worker_are_taken_over() {
    let broker = MemoryBroker::new(2);
    let mailer = MemoryMailer::new();
    let email = generate_unique_email();

    dispatcher(&broker)
        .send_password_reset_email(&email, "orphaned")
        .await
        .unwrap();

    {
        let mut crashed = broker.consumer(GROUP, "worker-100", &topics());
        assert_eq!(crashed.fetch(8).await.unwrap().len(), 1);
    }
    assert_eq!(broker.pending_for(GROUP, "worker-100"), 1);

    let consumer = broker
        .consumer(GROUP, "worker-200", &topics())
        .with_claim_min_idle(Duration::ZERO);
    let mut worker = EmailWorker::new(consumer, Arc::new(mailer.clone()), settings(None));
    drain(&mut worker).await;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, email);
    assert!(sent[0].text.contains("token=orphaned"));
    assert_eq!(broker.pending_count(GROUP), 0);
}
