use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use dentra_core::Clock;

use crate::error::StoreError;
use crate::repository::BlacklistStore;

#[derive(Debug, Clone)]
pub struct PgBlacklistStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgBlacklistStore {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl BlacklistStore for PgBlacklistStore {
    #[instrument(skip(self, token))]
    async fn insert(&self, token: &str, expire_time: i64) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO blacklisted_tokens (id, token, expire_time) VALUES ($1, $2, $3)
             ON CONFLICT (token) DO UPDATE SET expire_time = EXCLUDED.expire_time",
        )
        .bind(Uuid::new_v4())
        .bind(token)
        .bind(expire_time)
        .execute(&self.pool)
        .await
        .map_err(StoreError::persistence("blacklist_insert"))?;

        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM blacklisted_tokens WHERE token = $1 AND expire_time > $2)",
        )
        .bind(token)
        .bind(self.clock.now().timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::persistence("blacklist_lookup"))?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM blacklisted_tokens WHERE expire_time <= $1")
            .bind(self.clock.now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(StoreError::persistence("delete_expired_blacklist"))?;

        Ok(result.rows_affected())
    }
}
