use std::collections::BTreeMap;

/// A message to publish: routing key, opaque payload and string headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
    pub headers: BTreeMap<String, String>,
}

impl Record {
    pub fn new(topic: &str, key: &str, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.to_string(),
            key: key.to_string(),
            payload,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// A record handed to a consumer, together with where it came from.
///
/// Pass it back to [`MessageConsumer::commit`](crate::MessageConsumer::commit)
/// once it has been handled.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub partition: u32,
    pub id: String,
    pub record: Record,
    pub(crate) stream: String,
}

impl Delivery {
    pub fn stream(&self) -> &str {
        &self.stream
    }
}
