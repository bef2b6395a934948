//! Message queue configuration.
//!
//! Topics are split into `partitions` partitions. Messages are routed to a
//! partition by hashing their key (the recipient email), so every message for
//! one recipient lands in the same partition. A worker owns the partitions in
//! `owned_partitions`; two workers in the same consumer group must be given
//! disjoint sets.
//!
//! # Environment Variables
//!
//! - `REDIS_URL`: broker URL (default: `redis://127.0.0.1:6379`)
//! - `QUEUE_PREFIX`: key prefix for all stream keys (default: `dentra`)
//! - `VERIFICATION_TOPIC`: topic for verification emails (default: `email.verification`)
//! - `PASSWORD_RESET_TOPIC`: topic for reset emails (default: `email.password-reset`)
//! - `QUEUE_PARTITIONS`: partitions per topic (default: `4`)
//! - `CONSUMER_GROUP`: consumer group id (default: `email-workers`)
//! - `CONSUMER_NAME`: consumer name inside the group (default: derived from the
//!   owned partitions, e.g. `worker-p0-1-2-3`, so it survives restarts)
//! - `CONSUMER_PARTITIONS`: partitions owned by this worker, comma separated (default: all)
//! - `DEAD_LETTER_TOPIC`: where unparseable messages are forwarded (default: unset, drop)
//! - `QUEUE_PUBLISH_TIMEOUT_SECS`: publish deadline (default: `5`)
//! - `QUEUE_POLL_INTERVAL_MS`: idle sleep between empty fetches (default: `500`)
//! - `QUEUE_BATCH_SIZE`: max messages per fetch (default: `16`)
//! - `QUEUE_CLAIM_MIN_IDLE_SECS`: how long an entry must sit unacknowledged in
//!   another member's pending list before this worker takes it over (default: `60`)

use std::env;
use std::time::Duration;

use crate::{env_list, env_or};

#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub redis_url: String,
    pub key_prefix: String,
    pub verification_topic: String,
    pub password_reset_topic: String,
    pub partitions: u32,
    pub consumer_group: String,
    pub consumer_name: String,
    pub owned_partitions: Vec<u32>,
    pub dead_letter_topic: Option<String>,
    pub publish_timeout: Duration,
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub claim_min_idle: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".into(),
            key_prefix: "dentra".into(),
            verification_topic: "email.verification".into(),
            password_reset_topic: "email.password-reset".into(),
            partitions: 4,
            consumer_group: "email-workers".into(),
            consumer_name: default_consumer_name(&[0, 1, 2, 3]),
            owned_partitions: (0..4).collect(),
            dead_letter_topic: None,
            publish_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
            batch_size: 16,
            claim_min_idle: Duration::from_secs(60),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let partitions = env_or::<u32>("QUEUE_PARTITIONS", defaults.partitions).max(1);

        let mut owned_partitions: Vec<u32> = env_list("CONSUMER_PARTITIONS")
            .iter()
            .filter_map(|p| p.parse().ok())
            .filter(|p| *p < partitions)
            .collect();
        if owned_partitions.is_empty() {
            owned_partitions = (0..partitions).collect();
        }

        Self {
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            key_prefix: env::var("QUEUE_PREFIX").unwrap_or(defaults.key_prefix),
            verification_topic: env::var("VERIFICATION_TOPIC").unwrap_or(defaults.verification_topic),
            password_reset_topic: env::var("PASSWORD_RESET_TOPIC")
                .unwrap_or(defaults.password_reset_topic),
            partitions,
            consumer_group: env::var("CONSUMER_GROUP").unwrap_or(defaults.consumer_group),
            consumer_name: env::var("CONSUMER_NAME")
                .ok()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| default_consumer_name(&owned_partitions)),
            owned_partitions,
            dead_letter_topic: env::var("DEAD_LETTER_TOPIC").ok().filter(|t| !t.trim().is_empty()),
            publish_timeout: Duration::from_secs(env_or("QUEUE_PUBLISH_TIMEOUT_SECS", 5)),
            poll_interval: Duration::from_millis(env_or("QUEUE_POLL_INTERVAL_MS", 500)),
            batch_size: env_or::<usize>("QUEUE_BATCH_SIZE", defaults.batch_size).max(1),
            claim_min_idle: Duration::from_secs(env_or("QUEUE_CLAIM_MIN_IDLE_SECS", 60)),
        }
    }

    /// Topics the email worker subscribes to.
    pub fn email_topics(&self) -> Vec<String> {
        vec![
            self.verification_topic.clone(),
            self.password_reset_topic.clone(),
        ]
    }
}

/// Consumer name for a worker owning `partitions`.
///
/// Owned partition sets are disjoint within a group, so the name is unique
/// per worker and identical across restarts of the same worker.
pub fn default_consumer_name(partitions: &[u32]) -> String {
    let owned: Vec<String> = partitions.iter().map(u32::to_string).collect();
    format!("worker-p{}", owned.join("-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_owns_every_partition() {
        let config = QueueConfig::default();
        assert_eq!(config.owned_partitions, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_email_topics() {
        let config = QueueConfig::default();
        assert_eq!(
            config.email_topics(),
            vec!["email.verification".to_string(), "email.password-reset".to_string()]
        );
    }

    #[test]
    fn test_default_consumer_name_is_stable() {
        let first = QueueConfig::default();
        let second = QueueConfig::default();

        assert_eq!(first.consumer_name, second.consumer_name);
        assert_eq!(first.consumer_name, "worker-p0-1-2-3");
        assert_eq!(default_consumer_name(&[2, 3]), "worker-p2-3");
    }
}
