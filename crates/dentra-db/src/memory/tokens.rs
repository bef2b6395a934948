use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use dentra_core::Clock;
use dentra_models::PasswordResetToken;

use crate::error::StoreError;
use crate::repository::TokenStore;
use crate::token::generate_token;

#[derive(Debug, Clone)]
pub struct MemoryTokenStore {
    pub(crate) tokens: Arc<RwLock<Vec<PasswordResetToken>>>,
    pub(crate) clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl MemoryTokenStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            tokens: Arc::new(RwLock::new(Vec::new())),
            clock,
            ttl,
        }
    }

    /// Snapshot of every stored token for `email`, oldest first.
    pub async fn tokens_for(&self, email: &str) -> Vec<PasswordResetToken> {
        self.tokens
            .read()
            .await
            .iter()
            .filter(|t| t.email == email)
            .cloned()
            .collect()
    }

    /// Number of tokens for `email` that are still usable now.
    pub async fn active_count(&self, email: &str) -> usize {
        let now = self.clock.now();
        self.tokens
            .read()
            .await
            .iter()
            .filter(|t| t.email == email && t.is_active_at(now))
            .count()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn create_token(&self, email: &str) -> Result<PasswordResetToken, StoreError> {
        let now = self.clock.now();
        let token = PasswordResetToken {
            id: Uuid::new_v4(),
            token: generate_token(),
            email: email.to_string(),
            expires_at: now + self.ttl,
            is_used: false,
            created_at: now,
        };

        self.tokens.write().await.push(token.clone());
        Ok(token)
    }

    async fn validate(&self, value: &str, email: &str) -> Result<PasswordResetToken, StoreError> {
        let now = self.clock.now();
        self.tokens
            .read()
            .await
            .iter()
            .find(|t| t.token == value && t.email == email && t.is_active_at(now))
            .cloned()
            .ok_or(StoreError::NotFoundOrExpired)
    }

    async fn mark_used(&self, token_id: Uuid) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().await;
        if let Some(token) = tokens.iter_mut().find(|t| t.id == token_id) {
            token.is_used = true;
        }
        Ok(())
    }

    async fn invalidate_all_for_email(&self, email: &str) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.write().await;
        let mut changed = 0;
        for token in tokens.iter_mut().filter(|t| t.email == email && !t.is_used) {
            token.is_used = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|t| t.expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}
