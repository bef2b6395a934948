/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] ::redis::RedisError),

    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed entry {id} on {stream}: missing {field}")]
    MalformedEntry {
        stream: String,
        id: String,
        field: &'static str,
    },
}
