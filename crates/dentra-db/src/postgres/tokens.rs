use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use dentra_core::Clock;
use dentra_models::PasswordResetToken;

use crate::error::StoreError;
use crate::repository::TokenStore;
use crate::token::generate_token;

const TOKEN_COLUMNS: &str = "id, token, email, expires_at, is_used, created_at";

/// Password-reset tokens in the `password_reset_tokens` table.
///
/// Expiry comparisons use the injected clock rather than the database's
/// `NOW()`.
#[derive(Debug, Clone)]
pub struct PgTokenStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl PgTokenStore {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { pool, clock, ttl }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    #[instrument(skip(self))]
    async fn create_token(&self, email: &str) -> Result<PasswordResetToken, StoreError> {
        let now = self.clock.now();

        let token = sqlx::query_as::<_, PasswordResetToken>(&format!(
            "INSERT INTO password_reset_tokens (id, token, email, expires_at, is_used, created_at)
             VALUES ($1, $2, $3, $4, false, $5)
             RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(generate_token())
        .bind(email)
        .bind(now + self.ttl)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::persistence("create_token"))?;

        debug!(token_id = %token.id, "Password reset token created");

        Ok(token)
    }

    #[instrument(skip(self, value))]
    async fn validate(&self, value: &str, email: &str) -> Result<PasswordResetToken, StoreError> {
        sqlx::query_as::<_, PasswordResetToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM password_reset_tokens
             WHERE token = $1 AND email = $2 AND is_used = false AND expires_at > $3"
        ))
        .bind(value)
        .bind(email)
        .bind(self.clock.now())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::persistence("validate_token"))?
        .ok_or(StoreError::NotFoundOrExpired)
    }

    #[instrument(skip(self))]
    async fn mark_used(&self, token_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE password_reset_tokens SET is_used = true WHERE id = $1")
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::persistence("mark_used"))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_all_for_email(&self, email: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE password_reset_tokens SET is_used = true WHERE email = $1 AND is_used = false",
        )
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(StoreError::persistence("invalidate_all_for_email"))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at <= $1")
            .bind(self.clock.now())
            .execute(&self.pool)
            .await
            .map_err(StoreError::persistence("delete_expired_tokens"))?;

        Ok(result.rows_affected())
    }
}
