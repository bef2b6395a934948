//! Storage ports used by the services.
//!
//! The services hold these as `Arc<dyn Trait>` so that the HTTP layer, the
//! CLI and the tests can plug in PostgreSQL or in-memory implementations.

use async_trait::async_trait;
use uuid::Uuid;

use dentra_models::{PasswordResetToken, User};

use crate::error::StoreError;

/// Read access to users plus the two updates the auth core performs.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Replaces the stored hash. Fails with [`StoreError::NotFound`] when no
    /// row was updated.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;

    async fn mark_email_verified(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Single-use, time-bounded password-reset tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Issues and persists a fresh token for `email`, expiring one TTL from now.
    async fn create_token(&self, email: &str) -> Result<PasswordResetToken, StoreError>;

    /// Returns the token matching `value` and `email` when it is unused and
    /// `expires_at` is strictly after now. Read-only.
    async fn validate(&self, value: &str, email: &str) -> Result<PasswordResetToken, StoreError>;

    /// Flags the token as used. Calling it again on a used token succeeds.
    async fn mark_used(&self, token_id: Uuid) -> Result<(), StoreError>;

    /// Flags every active token of `email` as used and returns how many
    /// changed. Zero is not an error.
    async fn invalidate_all_for_email(&self, email: &str) -> Result<u64, StoreError>;

    /// Physically removes tokens whose expiry has passed.
    async fn delete_expired(&self) -> Result<u64, StoreError>;
}

/// Revoked authentication tokens.
#[async_trait]
pub trait BlacklistStore: Send + Sync {
    /// Upserts `token` with `expire_time` in epoch seconds.
    async fn insert(&self, token: &str, expire_time: i64) -> Result<(), StoreError>;

    /// True only while a matching entry has `expire_time` in the future.
    async fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError>;

    async fn delete_expired(&self) -> Result<u64, StoreError>;
}

/// Ids touched by a successful [`PasswordResetStore::redeem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemedReset {
    pub user_id: Uuid,
    pub token_id: Uuid,
}

/// Applies a password reset as one unit of work.
#[async_trait]
pub trait PasswordResetStore: Send + Sync {
    /// Consumes the active token matching `value` and `email` and stores
    /// `password_hash` for the user with that email, or does neither.
    ///
    /// Fails with [`StoreError::NotFoundOrExpired`] when no active token
    /// matches, which is also what the loser of two concurrent redemptions
    /// of one token gets, and with [`StoreError::NotFound`] when no user
    /// has `email`.
    async fn redeem(
        &self,
        value: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<RedeemedReset, StoreError>;
}
