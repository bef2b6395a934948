use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use dentra_core::Clock;

use crate::error::StoreError;
use crate::repository::BlacklistStore;

#[derive(Debug, Clone)]
pub struct MemoryBlacklistStore {
    entries: Arc<RwLock<HashMap<String, i64>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryBlacklistStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl BlacklistStore for MemoryBlacklistStore {
    async fn insert(&self, token: &str, expire_time: i64) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(token.to_string(), expire_time);
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        let now = self.clock.now().timestamp();
        Ok(self
            .entries
            .read()
            .await
            .get(token)
            .is_some_and(|expire_time| *expire_time > now))
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let now = self.clock.now().timestamp();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, expire_time| *expire_time > now);
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use dentra_core::FixedClock;

    #[tokio::test]
    async fn test_insert_twice_is_upsert() {
        let clock = FixedClock::default();
        let store = MemoryBlacklistStore::new(Arc::new(clock.clone()));
        let exp = (clock.now() + Duration::hours(24)).timestamp();

        store.insert("jwt", exp).await.unwrap();
        store.insert("jwt", exp).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert!(store.is_blacklisted("jwt").await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_past_entries() {
        let clock = FixedClock::default();
        let store = MemoryBlacklistStore::new(Arc::new(clock.clone()));
        let now = clock.now().timestamp();

        store.insert("old", now - 60).await.unwrap();
        store.insert("fresh", now + 3600).await.unwrap();

        assert!(!store.is_blacklisted("old").await.unwrap());
        assert_eq!(store.delete_expired().await.unwrap(), 1);
        assert!(store.is_blacklisted("fresh").await.unwrap());
        assert_eq!(store.len().await, 1);
    }
}
