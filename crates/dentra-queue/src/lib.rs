//! # Dentra Queue
//!
//! Partitioned, at-least-once message queue used to hand email intents from
//! the API to the email worker.
//!
//! A topic `T` with `N` partitions is stored as `N` Redis streams named
//! `{prefix}:{T}:{p}`. A record's partition is derived from its key (see
//! [`partition_for`]), so every record with the same key lands in the same
//! stream and is consumed in publication order.
//!
//! This crate provides:
//!
//! - [`MessagePublisher`] / [`MessageConsumer`]: the ports used by the
//!   dispatcher and the worker
//! - [`RedisStreamPublisher`] / [`RedisStreamConsumer`]: Redis Streams
//!   implementations (`XADD`, `XREADGROUP`, `XACK`)
//! - [`MemoryBroker`]: an in-process broker with the same delivery semantics
//!   for tests
//!
//! # Example
//!
//! ```ignore
//! use dentra_config::QueueConfig;
//! use dentra_queue::{MessagePublisher, Record, RedisStreamPublisher};
//!
//! let config = QueueConfig::from_env();
//! let publisher = RedisStreamPublisher::connect(&config).await?;
//! publisher
//!     .publish(Record::new("email.verification", "user@example.com", payload))
//!     .await?;
//! ```

pub mod error;
pub mod memory;
pub mod partition;
pub mod record;
pub mod streams;

use async_trait::async_trait;

pub use error::QueueError;
pub use memory::{MemoryBroker, MemoryConsumer};
pub use partition::{partition_for, stream_key};
pub use record::{Delivery, Record};
pub use streams::{RedisStreamConsumer, RedisStreamPublisher};

/// Appends records to a topic.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Returns once the broker has acknowledged the append, yielding the
    /// entry id assigned by the broker.
    async fn publish(&self, record: Record) -> Result<String, QueueError>;
}

/// Reads records as a member of a consumer group.
///
/// Delivered records stay pending until [`commit`](MessageConsumer::commit)
/// is called. A consumer that restarts under the same name receives its
/// pending records again before any new ones, and any member takes over
/// records left idle in another member's pending list.
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    /// Returns up to `max` records. An empty batch means nothing is
    /// available right now; the call does not block waiting for data.
    async fn fetch(&mut self, max: usize) -> Result<Vec<Delivery>, QueueError>;

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), QueueError>;
}
