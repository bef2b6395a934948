use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use dentra_core::Clock;

use crate::error::StoreError;
use crate::repository::{PasswordResetStore, RedeemedReset};

/// Redeems reset tokens inside a single transaction.
///
/// The token row is locked with `FOR UPDATE` before the password is written,
/// so a second redemption of the same token waits for the first to commit and
/// then no longer matches `is_used = false`.
#[derive(Debug, Clone)]
pub struct PgPasswordResetStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgPasswordResetStore {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl PasswordResetStore for PgPasswordResetStore {
    #[instrument(skip(self, value, password_hash))]
    async fn redeem(
        &self,
        value: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<RedeemedReset, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(StoreError::persistence("begin_reset"))?;

        let token_id: Uuid = sqlx::query_scalar(
            "SELECT id FROM password_reset_tokens
             WHERE token = $1 AND email = $2 AND is_used = false AND expires_at > $3
             FOR UPDATE",
        )
        .bind(value)
        .bind(email)
        .bind(self.clock.now())
        .fetch_optional(&mut *tx)
        .await
        .map_err(StoreError::persistence("lock_reset_token"))?
        .ok_or(StoreError::NotFoundOrExpired)?;

        let user_id: Uuid = sqlx::query_scalar(
            "UPDATE users SET password_hash = $1, updated_at = NOW()
             WHERE email = $2
             RETURNING id",
        )
        .bind(password_hash)
        .bind(email)
        .fetch_optional(&mut *tx)
        .await
        .map_err(StoreError::persistence("reset_password"))?
        .ok_or(StoreError::NotFound)?;

        sqlx::query("UPDATE password_reset_tokens SET is_used = true WHERE id = $1")
            .bind(token_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::persistence("consume_reset_token"))?;

        tx.commit()
            .await
            .map_err(StoreError::persistence("commit_reset"))?;

        debug!(%token_id, %user_id, "Password reset committed");

        Ok(RedeemedReset { user_id, token_id })
    }
}
