//! In-process broker with consumer-group semantics.
//!
//! Streams and group offsets live behind one mutex shared by every clone of
//! the broker. Delivered records stay pending under the consumer name that
//! received them, as in a Redis pending entries list: a consumer that comes
//! back under the same name replays them, and any other member takes them
//! over once they have been idle for its `claim_min_idle`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::QueueError;
use crate::partition::{partition_for, stream_key};
use crate::record::{Delivery, Record};
use crate::{MessageConsumer, MessagePublisher};

const MEMORY_PREFIX: &str = "memory";
const DEFAULT_CLAIM_MIN_IDLE: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct PendingEntry {
    owner: String,
    delivered_at: Instant,
}

#[derive(Debug, Default)]
struct GroupOffsets {
    /// Index of the first entry never delivered to the group.
    next: usize,
    /// Delivered but uncommitted entry indexes.
    pending: BTreeMap<usize, PendingEntry>,
}

#[derive(Debug, Default)]
struct BrokerState {
    streams: HashMap<String, Vec<Record>>,
    groups: HashMap<(String, String), GroupOffsets>,
    unavailable: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryBroker {
    partitions: u32,
    state: Arc<Mutex<BrokerState>>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(4)
    }
}

impl MemoryBroker {
    pub fn new(partitions: u32) -> Self {
        Self {
            partitions: partitions.max(1),
            state: Arc::new(Mutex::new(BrokerState::default())),
        }
    }

    /// Makes every publish fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Every record published to `topic`, partition by partition.
    pub fn records(&self, topic: &str) -> Vec<Record> {
        let state = self.lock();
        (0..self.partitions)
            .filter_map(|p| state.streams.get(&stream_key(MEMORY_PREFIX, topic, p)))
            .flatten()
            .cloned()
            .collect()
    }

    /// Records of `group` delivered but not yet committed.
    pub fn pending_count(&self, group: &str) -> usize {
        self.lock()
            .groups
            .iter()
            .filter(|((g, _), _)| g == group)
            .map(|(_, offsets)| offsets.pending.len())
            .sum()
    }

    /// Records of `group` pending under `consumer`.
    pub fn pending_for(&self, group: &str, consumer: &str) -> usize {
        self.lock()
            .groups
            .iter()
            .filter(|((g, _), _)| g == group)
            .flat_map(|(_, offsets)| offsets.pending.values())
            .filter(|entry| entry.owner == consumer)
            .count()
    }

    /// Joins `group` as `name` on every partition of `topics`.
    pub fn consumer(&self, group: &str, name: &str, topics: &[String]) -> MemoryConsumer {
        let partitions: Vec<u32> = (0..self.partitions).collect();
        self.consumer_for_partitions(group, name, topics, &partitions)
    }

    /// Joins `group` as `name` on the given partitions of `topics` only.
    pub fn consumer_for_partitions(
        &self,
        group: &str,
        name: &str,
        topics: &[String],
        partitions: &[u32],
    ) -> MemoryConsumer {
        let mut streams = Vec::new();
        for topic in topics {
            for &partition in partitions {
                streams.push((
                    topic.clone(),
                    partition,
                    stream_key(MEMORY_PREFIX, topic, partition),
                ));
            }
        }

        MemoryConsumer {
            broker: self.clone(),
            group: group.to_string(),
            name: name.to_string(),
            streams,
            replaying: true,
            claim_min_idle: DEFAULT_CLAIM_MIN_IDLE,
            last_claim: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MessagePublisher for MemoryBroker {
    async fn publish(&self, record: Record) -> Result<String, QueueError> {
        let mut state = self.lock();
        if state.unavailable {
            return Err(QueueError::Unavailable("broker is down".to_string()));
        }

        let partition = partition_for(&record.key, self.partitions);
        let entries = state
            .streams
            .entry(stream_key(MEMORY_PREFIX, &record.topic, partition))
            .or_default();
        entries.push(record);

        Ok(format!("{}-0", entries.len()))
    }
}

#[derive(Debug)]
pub struct MemoryConsumer {
    broker: MemoryBroker,
    group: String,
    name: String,
    streams: Vec<(String, u32, String)>,
    /// True while this consumer's own pending records are being replayed.
    replaying: bool,
    claim_min_idle: Duration,
    last_claim: Option<Instant>,
}

impl MemoryConsumer {
    /// Sets how long another member's pending record must be idle before
    /// this consumer takes it over.
    pub fn with_claim_min_idle(mut self, min_idle: Duration) -> Self {
        self.claim_min_idle = min_idle;
        self
    }

    fn delivery(topic: &str, partition: u32, stream: &str, index: usize, record: &Record) -> Delivery {
        Delivery {
            partition,
            id: format!("{}-0", index + 1),
            record: Record {
                topic: topic.to_string(),
                ..record.clone()
            },
            stream: stream.to_string(),
        }
    }

    fn claim_idle(&mut self, groups: &mut HashMap<(String, String), GroupOffsets>, now: Instant) {
        let mut claimed = 0;
        for (_, _, stream) in &self.streams {
            let Some(offsets) = groups.get_mut(&(self.group.clone(), stream.clone())) else {
                continue;
            };
            for entry in offsets.pending.values_mut() {
                if entry.owner != self.name
                    && now.duration_since(entry.delivered_at) >= self.claim_min_idle
                {
                    entry.owner = self.name.clone();
                    entry.delivered_at = now;
                    claimed += 1;
                }
            }
        }

        if claimed > 0 {
            self.replaying = true;
        }
        self.last_claim = Some(now);
    }
}

#[async_trait]
impl MessageConsumer for MemoryConsumer {
    async fn fetch(&mut self, max: usize) -> Result<Vec<Delivery>, QueueError> {
        let broker = self.broker.clone();
        let mut state = broker.lock();
        let BrokerState {
            streams, groups, ..
        } = &mut *state;
        let now = Instant::now();

        if self
            .last_claim
            .is_none_or(|at| now.duration_since(at) >= self.claim_min_idle)
        {
            self.claim_idle(groups, now);
        }

        let mut batch = Vec::new();

        if self.replaying {
            for (topic, partition, stream) in &self.streams {
                let Some(entries) = streams.get(stream) else {
                    continue;
                };
                let offsets = groups
                    .entry((self.group.clone(), stream.clone()))
                    .or_default();
                for (&index, entry) in offsets.pending.iter_mut() {
                    if entry.owner != self.name {
                        continue;
                    }
                    if batch.len() == max {
                        return Ok(batch);
                    }
                    entry.delivered_at = now;
                    batch.push(Self::delivery(topic, *partition, stream, index, &entries[index]));
                }
            }
            self.replaying = false;
            if !batch.is_empty() {
                return Ok(batch);
            }
        }

        for (topic, partition, stream) in &self.streams {
            let Some(entries) = streams.get(stream) else {
                continue;
            };
            let offsets = groups
                .entry((self.group.clone(), stream.clone()))
                .or_default();
            while offsets.next < entries.len() && batch.len() < max {
                let index = offsets.next;
                offsets.pending.insert(
                    index,
                    PendingEntry {
                        owner: self.name.clone(),
                        delivered_at: now,
                    },
                );
                offsets.next += 1;
                batch.push(Self::delivery(topic, *partition, stream, index, &entries[index]));
            }
        }

        Ok(batch)
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), QueueError> {
        let index = delivery
            .id
            .split('-')
            .next()
            .and_then(|n| n.parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(|| QueueError::MalformedEntry {
                stream: delivery.stream.clone(),
                id: delivery.id.clone(),
                field: "id",
            })?;

        let mut state = self.broker.lock();
        if let Some(offsets) = state
            .groups
            .get_mut(&(self.group.clone(), delivery.stream.clone()))
        {
            offsets.pending.remove(&index);
        }
        Ok(())
    }
}
