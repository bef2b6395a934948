use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use dotenvy::dotenv;
use tokio::sync::watch;
use tracing::{error, info};

use dentra::shutdown::shutdown_signal;
use dentra_config::queue::default_consumer_name;
use dentra_config::{EmailConfig, QueueConfig};
use dentra_mailer::{EmailWorker, SmtpMailer, WorkerSettings};
use dentra_observability::{init_metrics, init_tracing, metrics_app};
use dentra_queue::{RedisStreamConsumer, RedisStreamPublisher};

#[derive(Parser)]
#[command(name = "dentra-email-worker")]
#[command(about = "Consumes queued Dentra email intents and delivers them over SMTP", long_about = None)]
struct Args {
    /// Consumer name inside the group (overrides CONSUMER_NAME)
    #[arg(long)]
    consumer_name: Option<String>,

    /// Partitions owned by this worker, comma separated (overrides CONSUMER_PARTITIONS)
    #[arg(long, value_delimiter = ',')]
    partitions: Vec<u32>,

    /// Listen address of the Prometheus endpoint
    #[arg(long, env = "WORKER_METRICS_ADDR", default_value = "0.0.0.0:9091")]
    metrics_addr: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();
    init_tracing("dentra-email-worker")?;

    let mut queue_config = QueueConfig::from_env();
    let name_from_env = std::env::var("CONSUMER_NAME").is_ok_and(|n| !n.trim().is_empty());
    if !args.partitions.is_empty() {
        if let Some(p) = args.partitions.iter().find(|p| **p >= queue_config.partitions) {
            bail!(
                "partition {} is out of range, topics have {} partitions",
                p,
                queue_config.partitions
            );
        }
        queue_config.owned_partitions = args.partitions;
        if !name_from_env {
            queue_config.consumer_name = default_consumer_name(&queue_config.owned_partitions);
        }
    }
    if let Some(name) = args.consumer_name {
        queue_config.consumer_name = name;
    }
    let email_config = EmailConfig::from_env();

    let mailer = SmtpMailer::new(&email_config).context("Failed to configure SMTP transport")?;
    let consumer = RedisStreamConsumer::connect(&queue_config, &queue_config.email_topics())
        .await
        .context("Failed to join consumer group")?;

    let settings = WorkerSettings {
        frontend_url: email_config.frontend_url.clone(),
        batch_size: queue_config.batch_size,
        poll_interval: queue_config.poll_interval,
        dead_letter_topic: queue_config.dead_letter_topic.clone(),
    };
    let mut worker = EmailWorker::new(consumer, Arc::new(mailer), settings);
    if queue_config.dead_letter_topic.is_some() {
        let publisher = RedisStreamPublisher::connect(&queue_config)
            .await
            .context("Failed to connect dead-letter publisher")?;
        worker = worker.with_dead_letter(Arc::new(publisher));
    }

    if let Some(handle) = init_metrics()? {
        let listener = tokio::net::TcpListener::bind(&args.metrics_addr)
            .await
            .with_context(|| format!("Failed to bind {}", args.metrics_addr))?;
        info!(addr = %args.metrics_addr, "Metrics endpoint listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, metrics_app(handle)).await {
                error!(error = %e, "Metrics server failed");
            }
        });
    }

    info!(
        group = %queue_config.consumer_group,
        consumer = %queue_config.consumer_name,
        partitions = ?queue_config.owned_partitions,
        "Email worker connected"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(worker.run(shutdown_rx));

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
    worker.await??;

    Ok(())
}
