//! Redis Streams implementation of the queue ports.
//!
//! - publish: `XADD {prefix}:{topic}:{p} * key <key> payload <bytes> h:<name> <value>...`
//! - fetch: `XREADGROUP GROUP <group> <consumer> COUNT <n> STREAMS ...`
//! - commit: `XACK`
//! - takeover: `XAUTOCLAIM ... <min-idle> <cursor> COUNT 100 JUSTID`
//!
//! On start a consumer claims every entry that has sat unacknowledged in any
//! member's pending list for at least `claim_min_idle`, then reads its own
//! pending entries (id `0`) on every owned stream before it switches that
//! stream to new entries (id `>`). The takeover is repeated once per
//! `claim_min_idle` while the consumer runs, so entries left behind by a
//! crashed member are redelivered even when it never comes back.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, info, instrument, warn};

use dentra_config::QueueConfig;

use crate::error::QueueError;
use crate::partition::{partition_for, stream_key};
use crate::record::{Delivery, Record};
use crate::{MessageConsumer, MessagePublisher};

const KEY_FIELD: &str = "key";
const PAYLOAD_FIELD: &str = "payload";
const HEADER_PREFIX: &str = "h:";
const CLAIM_BATCH: usize = 100;

async fn connect_manager(redis_url: &str) -> Result<ConnectionManager, QueueError> {
    let client = Client::open(redis_url)?;
    Ok(ConnectionManager::new(client).await?)
}

/// Publishes records with `XADD`.
#[derive(Clone)]
pub struct RedisStreamPublisher {
    conn: ConnectionManager,
    key_prefix: String,
    partitions: u32,
}

impl std::fmt::Debug for RedisStreamPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamPublisher")
            .field("key_prefix", &self.key_prefix)
            .field("partitions", &self.partitions)
            .finish_non_exhaustive()
    }
}

impl RedisStreamPublisher {
    /// # Errors
    ///
    /// Returns `QueueError::Connection` if the broker cannot be reached.
    pub async fn connect(config: &QueueConfig) -> Result<Self, QueueError> {
        let conn = connect_manager(&config.redis_url).await?;

        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
            partitions: config.partitions,
        })
    }
}

#[async_trait::async_trait]
impl MessagePublisher for RedisStreamPublisher {
    #[instrument(skip(self, record), fields(queue.topic = %record.topic, queue.operation = "XADD"))]
    async fn publish(&self, record: Record) -> Result<String, QueueError> {
        let partition = partition_for(&record.key, self.partitions);
        let stream = stream_key(&self.key_prefix, &record.topic, partition);

        let mut fields: Vec<(String, Vec<u8>)> = Vec::with_capacity(2 + record.headers.len());
        fields.push((KEY_FIELD.to_string(), record.key.into_bytes()));
        fields.push((PAYLOAD_FIELD.to_string(), record.payload));
        for (name, value) in record.headers {
            fields.push((format!("{}{}", HEADER_PREFIX, name), value.into_bytes()));
        }

        let mut conn = self.conn.clone();
        let id: String = conn.xadd(&stream, "*", fields.as_slice()).await?;

        debug!(queue.stream = %stream, queue.entry_id = %id, "Record appended");

        Ok(id)
    }
}

#[derive(Debug)]
enum Cursor {
    /// Still replaying this consumer's unacknowledged entries after the id.
    Pending(String),
    New,
}

#[derive(Debug)]
struct OwnedStream {
    key: String,
    topic: String,
    partition: u32,
    cursor: Cursor,
}

impl OwnedStream {
    fn read_id(&self) -> &str {
        match &self.cursor {
            Cursor::Pending(id) => id,
            Cursor::New => ">",
        }
    }
}

/// Consumer-group member reading the partitions it owns.
pub struct RedisStreamConsumer {
    conn: ConnectionManager,
    group: String,
    consumer: String,
    streams: Vec<OwnedStream>,
    buffered: VecDeque<Delivery>,
    claim_min_idle: Duration,
    last_claim: Option<Instant>,
}

impl std::fmt::Debug for RedisStreamConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamConsumer")
            .field("group", &self.group)
            .field("consumer", &self.consumer)
            .field("streams", &self.streams.len())
            .field("claim_min_idle", &self.claim_min_idle)
            .finish_non_exhaustive()
    }
}

impl RedisStreamConsumer {
    /// Joins `config.consumer_group` on every owned partition of `topics`,
    /// creating the streams and the group when they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Connection` if the broker cannot be reached or
    /// group creation fails for a reason other than the group existing.
    pub async fn connect(config: &QueueConfig, topics: &[String]) -> Result<Self, QueueError> {
        let mut conn = connect_manager(&config.redis_url).await?;

        let mut streams = Vec::new();
        for topic in topics {
            for &partition in &config.owned_partitions {
                let key = stream_key(&config.key_prefix, topic, partition);

                match conn
                    .xgroup_create_mkstream::<_, _, _, ()>(&key, &config.consumer_group, "0")
                    .await
                {
                    Ok(()) => info!(queue.stream = %key, "Consumer group created"),
                    Err(e) if e.code() == Some("BUSYGROUP") => {}
                    Err(e) => return Err(e.into()),
                }

                streams.push(OwnedStream {
                    key,
                    topic: topic.clone(),
                    partition,
                    cursor: Cursor::Pending("0".to_string()),
                });
            }
        }

        let mut consumer = Self {
            conn,
            group: config.consumer_group.clone(),
            consumer: config.consumer_name.clone(),
            streams,
            buffered: VecDeque::new(),
            claim_min_idle: config.claim_min_idle,
            last_claim: None,
        };
        consumer.claim_idle_entries().await?;

        Ok(consumer)
    }

    /// Moves entries idle for at least `claim_min_idle` in any member's
    /// pending list into this consumer's, and rewinds the affected streams so
    /// the next read replays them.
    async fn claim_idle_entries(&mut self) -> Result<usize, QueueError> {
        let min_idle_ms = self.claim_min_idle.as_millis() as u64;
        let mut total = 0;

        for stream in &mut self.streams {
            let mut cursor = "0-0".to_string();
            let mut claimed_here = 0;

            loop {
                let reply: Vec<redis::Value> = redis::cmd("XAUTOCLAIM")
                    .arg(&stream.key)
                    .arg(&self.group)
                    .arg(&self.consumer)
                    .arg(min_idle_ms)
                    .arg(&cursor)
                    .arg("COUNT")
                    .arg(CLAIM_BATCH)
                    .arg("JUSTID")
                    .query_async(&mut self.conn)
                    .await?;

                let mut parts = reply.iter();
                let next: String = match parts.next() {
                    Some(value) => redis::from_redis_value(value)?,
                    None => break,
                };
                let ids: Vec<String> = match parts.next() {
                    Some(value) => redis::from_redis_value(value)?,
                    None => Vec::new(),
                };
                claimed_here += ids.len();

                cursor = next;
                if cursor == "0-0" {
                    break;
                }
            }

            if claimed_here > 0 {
                info!(
                    queue.stream = %stream.key,
                    queue.claimed = claimed_here,
                    "Took over idle pending entries"
                );
                stream.cursor = Cursor::Pending("0".to_string());
            }
            total += claimed_here;
        }

        self.last_claim = Some(Instant::now());
        Ok(total)
    }

    fn claim_due(&self) -> bool {
        self.last_claim
            .is_none_or(|at| at.elapsed() >= self.claim_min_idle)
    }

    async fn read_batch(&mut self, count: usize) -> Result<(), QueueError> {
        let keys: Vec<&str> = self.streams.iter().map(|s| s.key.as_str()).collect();
        let ids: Vec<&str> = self.streams.iter().map(OwnedStream::read_id).collect();
        let options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(count);

        let reply: Option<StreamReadReply> =
            self.conn.xread_options(keys.as_slice(), ids.as_slice(), &options).await?;
        let reply = reply.map(|r| r.keys).unwrap_or_default();

        let mut stale = Vec::new();
        for stream in &mut self.streams {
            let entries = reply
                .iter()
                .find(|k| k.key == stream.key)
                .map(|k| k.ids.as_slice())
                .unwrap_or_default();

            if let Cursor::Pending(_) = stream.cursor {
                stream.cursor = match entries.last() {
                    Some(last) => Cursor::Pending(last.id.clone()),
                    None => {
                        debug!(queue.stream = %stream.key, "Pending entries replayed");
                        Cursor::New
                    }
                };
            }

            for entry in entries {
                match decode_entry(stream, entry) {
                    Ok(delivery) => self.buffered.push_back(delivery),
                    Err(e) => {
                        warn!(error = %e, "Skipping unreadable stream entry");
                        stale.push((stream.key.clone(), entry.id.clone()));
                    }
                }
            }
        }

        for (key, id) in stale {
            self.conn.xack::<_, _, _, i64>(&key, &self.group, &[&id]).await?;
        }

        Ok(())
    }
}

fn decode_entry(stream: &OwnedStream, entry: &StreamId) -> Result<Delivery, QueueError> {
    let malformed = |field| QueueError::MalformedEntry {
        stream: stream.key.clone(),
        id: entry.id.clone(),
        field,
    };

    let key: String = entry.get(KEY_FIELD).ok_or_else(|| malformed(KEY_FIELD))?;
    let payload: Vec<u8> = entry
        .get(PAYLOAD_FIELD)
        .ok_or_else(|| malformed(PAYLOAD_FIELD))?;

    let mut headers = BTreeMap::new();
    for (field, value) in &entry.map {
        let Some(name) = field.strip_prefix(HEADER_PREFIX) else {
            continue;
        };
        if let Ok(value) = redis::from_redis_value::<String>(value) {
            headers.insert(name.to_string(), value);
        }
    }

    Ok(Delivery {
        partition: stream.partition,
        id: entry.id.clone(),
        record: Record {
            topic: stream.topic.clone(),
            key,
            payload,
            headers,
        },
        stream: stream.key.clone(),
    })
}

#[async_trait::async_trait]
impl MessageConsumer for RedisStreamConsumer {
    #[instrument(skip(self), fields(queue.operation = "XREADGROUP"))]
    async fn fetch(&mut self, max: usize) -> Result<Vec<Delivery>, QueueError> {
        if self.buffered.is_empty() {
            if self.claim_due() {
                self.claim_idle_entries().await?;
            }
            self.read_batch(max.max(1)).await?;
        }

        let take = max.min(self.buffered.len());
        Ok(self.buffered.drain(..take).collect())
    }

    #[instrument(skip(self, delivery), fields(queue.operation = "XACK", queue.entry_id = %delivery.id))]
    async fn commit(&mut self, delivery: &Delivery) -> Result<(), QueueError> {
        self.conn
            .xack::<_, _, _, i64>(&delivery.stream, &self.group, &[&delivery.id])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_config() -> QueueConfig {
        QueueConfig {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: format!("dentra-test-{}", std::process::id()),
            partitions: 2,
            owned_partitions: vec![0, 1],
            ..QueueConfig::default()
        }
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_publish_fetch_commit() {
        let config = live_config();
        let topics = vec!["email.verification".to_string()];
        let publisher = RedisStreamPublisher::connect(&config).await.unwrap();
        let mut consumer = RedisStreamConsumer::connect(&config, &topics).await.unwrap();

        for body in ["first", "second"] {
            publisher
                .publish(
                    Record::new("email.verification", "same@example.com", body.into())
                        .with_header("type", "verification"),
                )
                .await
                .unwrap();
        }

        let batch = consumer.fetch(10).await.unwrap();
        let batch = if batch.is_empty() {
            consumer.fetch(10).await.unwrap()
        } else {
            batch
        };

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].record.payload, b"first".to_vec());
        assert_eq!(batch[1].record.payload, b"second".to_vec());
        assert_eq!(batch[0].record.header("type"), Some("verification"));

        for delivery in &batch {
            consumer.commit(delivery).await.unwrap();
        }
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_uncommitted_entries_redelivered_after_reconnect() {
        let config = live_config();
        let topics = vec!["email.password-reset".to_string()];
        let publisher = RedisStreamPublisher::connect(&config).await.unwrap();

        let mut first = RedisStreamConsumer::connect(&config, &topics).await.unwrap();
        publisher
            .publish(Record::new("email.password-reset", "r@example.com", b"x".to_vec()))
            .await
            .unwrap();

        let mut delivered = first.fetch(10).await.unwrap();
        if delivered.is_empty() {
            delivered = first.fetch(10).await.unwrap();
        }
        assert_eq!(delivered.len(), 1);
        drop(first);

        let mut second = RedisStreamConsumer::connect(&config, &topics).await.unwrap();
        let replayed = second.fetch(10).await.unwrap();
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].id, delivered[0].id);
        second.commit(&replayed[0]).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_idle_entries_taken_over_by_renamed_consumer() {
        let config = QueueConfig {
            key_prefix: format!("dentra-test-claim-{}", std::process::id()),
            claim_min_idle: Duration::ZERO,
            ..live_config()
        };
        let topics = vec!["email.verification".to_string()];
        let publisher = RedisStreamPublisher::connect(&config).await.unwrap();

        let crashed_config = QueueConfig {
            consumer_name: "worker-100".to_string(),
            ..config.clone()
        };
        let mut crashed = RedisStreamConsumer::connect(&crashed_config, &topics)
            .await
            .unwrap();
        publisher
            .publish(Record::new("email.verification", "c@example.com", b"x".to_vec()))
            .await
            .unwrap();

        let mut delivered = crashed.fetch(10).await.unwrap();
        if delivered.is_empty() {
            delivered = crashed.fetch(10).await.unwrap();
        }
        assert_eq!(delivered.len(), 1);
        drop(crashed);

        let restarted_config = QueueConfig {
            consumer_name: "worker-200".to_string(),
            ..config
        };
        let mut restarted = RedisStreamConsumer::connect(&restarted_config, &topics)
            .await
            .unwrap();
        let replayed = restarted.fetch(10).await.unwrap();

        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].id, delivered[0].id);
        restarted.commit(&replayed[0]).await.unwrap();
    }
}
