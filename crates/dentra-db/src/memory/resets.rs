use async_trait::async_trait;
use chrono::Utc;

use crate::error::StoreError;
use crate::memory::{MemoryTokenStore, MemoryUserRepository};
use crate::repository::{PasswordResetStore, RedeemedReset};

/// Redeems tokens against a [`MemoryTokenStore`] and [`MemoryUserRepository`]
/// pair while holding both write locks.
///
/// Locks are always taken tokens first, then users.
#[derive(Debug, Clone)]
pub struct MemoryPasswordResetStore {
    users: MemoryUserRepository,
    tokens: MemoryTokenStore,
}

impl MemoryPasswordResetStore {
    pub fn new(users: MemoryUserRepository, tokens: MemoryTokenStore) -> Self {
        Self { users, tokens }
    }
}

#[async_trait]
impl PasswordResetStore for MemoryPasswordResetStore {
    async fn redeem(
        &self,
        value: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<RedeemedReset, StoreError> {
        let now = self.tokens.clock.now();
        let mut tokens = self.tokens.tokens.write().await;
        let token = tokens
            .iter_mut()
            .find(|t| t.token == value && t.email == email && t.is_active_at(now))
            .ok_or(StoreError::NotFoundOrExpired)?;

        let mut users = self.users.users.write().await;
        let user = users
            .values_mut()
            .find(|u| u.email == email)
            .ok_or(StoreError::NotFound)?;

        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        token.is_used = true;

        Ok(RedeemedReset {
            user_id: user.id,
            token_id: token.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use dentra_core::FixedClock;
    use dentra_models::User;

    use super::*;
    use crate::repository::{TokenStore, UserRepository};

    const EMAIL: &str = "patient@clinic.test";

    fn stores() -> (MemoryUserRepository, MemoryTokenStore, MemoryPasswordResetStore) {
        let users = MemoryUserRepository::new();
        let tokens = MemoryTokenStore::new(Arc::new(FixedClock::default()), Duration::hours(1));
        let resets = MemoryPasswordResetStore::new(users.clone(), tokens.clone());
        (users, tokens, resets)
    }

    #[tokio::test]
    async fn test_redeem_updates_password_and_consumes_token() {
        let (users, tokens, resets) = stores();
        let user = User::new(EMAIL, "old-hash".to_string(), "A", "B");
        let user_id = user.id;
        users.insert(user).await;
        let token = tokens.create_token(EMAIL).await.unwrap();

        let redeemed = resets.redeem(&token.token, EMAIL, "new-hash").await.unwrap();

        assert_eq!(redeemed.user_id, user_id);
        assert_eq!(redeemed.token_id, token.id);
        let stored = users.find_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert!(tokens.validate(&token.token, EMAIL).await.is_err());

        let again = resets.redeem(&token.token, EMAIL, "other-hash").await;
        assert!(matches!(again, Err(StoreError::NotFoundOrExpired)));
    }

    #[tokio::test]
    async fn test_redeem_without_user_leaves_token_active() {
        let (_, tokens, resets) = stores();
        let token = tokens.create_token(EMAIL).await.unwrap();

        let result = resets.redeem(&token.token, EMAIL, "new-hash").await;

        assert!(matches!(result, Err(StoreError::NotFound)));
        assert!(tokens.validate(&token.token, EMAIL).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redeems_have_one_winner() {
        let (users, tokens, resets) = stores();
        users
            .insert(User::new(EMAIL, "old-hash".to_string(), "A", "B"))
            .await;
        let token = tokens.create_token(EMAIL).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let resets = resets.clone();
                let value = token.token.clone();
                tokio::spawn(async move {
                    let hash = format!("hash-{i}");
                    resets.redeem(&value, EMAIL, &hash).await.map(|_| hash)
                })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(hash) => winners.push(hash),
                Err(StoreError::NotFoundOrExpired) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(winners.len(), 1);
        let stored = users.find_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, winners[0]);
    }
}
