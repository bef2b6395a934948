//! Password-reset orchestration.
//!
//! A reset token moves `Active -> Used | Expired | Invalidated` and never
//! leaves a terminal state. Invalidation is stored as `is_used = true`.
//!
//! `reset_password` hands the token check, the password write and the token
//! consumption to a [`PasswordResetStore`] as one unit. A failure part-way
//! leaves both the token and the old password in place, and of two
//! concurrent resets with the same token only one succeeds.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use dentra_db::{PasswordResetStore, TokenStore, UserRepository};
use dentra_models::PasswordResetToken;
use dentra_observability::{track_password_reset_completed, track_password_reset_requested};

use super::error::PasswordResetError;
use crate::modules::notifications::EmailDispatcher;

#[derive(Clone)]
pub struct PasswordResetService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenStore>,
    resets: Arc<dyn PasswordResetStore>,
    dispatcher: Arc<dyn EmailDispatcher>,
}

impl PasswordResetService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenStore>,
        resets: Arc<dyn PasswordResetStore>,
        dispatcher: Arc<dyn EmailDispatcher>,
    ) -> Self {
        Self {
            users,
            tokens,
            resets,
            dispatcher,
        }
    }

    /// Issues a fresh token for an active user and queues the reset email.
    ///
    /// Every earlier token of the address is invalidated first. A failed
    /// handoff is logged but does not fail the call, since the token is
    /// already stored. Returns the id of the new token.
    #[instrument(skip(self))]
    pub async fn request_password_reset(&self, email: &str) -> Result<Uuid, PasswordResetError> {
        let token = match self.issue_token(email).await {
            Ok(token) => token,
            Err(PasswordResetError::NotFound) => {
                track_password_reset_requested("unknown_email");
                return Err(PasswordResetError::NotFound);
            }
            Err(e) => return Err(e),
        };
        track_password_reset_requested("issued");

        if let Err(e) = self
            .dispatcher
            .send_password_reset_email(email, &token.token)
            .await
        {
            error!(
                error = %e,
                queue.topic = %e.topic,
                email.recipient = %e.recipient,
                email.kind = %e.email_type,
                token_id = %token.id,
                "Failed to queue password reset email"
            );
        }

        Ok(token.id)
    }

    /// Same as [`request_password_reset`](Self::request_password_reset) but
    /// a failed handoff is returned to the caller.
    #[instrument(skip(self))]
    pub async fn resend_password_reset(&self, email: &str) -> Result<Uuid, PasswordResetError> {
        let token = self.issue_token(email).await?;

        self.dispatcher
            .send_password_reset_email(email, &token.token)
            .await?;

        info!(token_id = %token.id, "Password reset email re-sent");
        Ok(token.id)
    }

    /// Read-only check that `value` is an active token for `email`.
    #[instrument(skip(self, value))]
    pub async fn validate_reset_token(
        &self,
        value: &str,
        email: &str,
    ) -> Result<PasswordResetToken, PasswordResetError> {
        Ok(self.tokens.validate(value, email).await?)
    }

    /// Replaces the password of `email` and consumes the token.
    ///
    /// `new_password_hash` must already be hashed; plaintext never reaches
    /// this layer.
    #[instrument(skip(self, value, new_password_hash))]
    pub async fn reset_password(
        &self,
        value: &str,
        email: &str,
        new_password_hash: &str,
    ) -> Result<(), PasswordResetError> {
        let result = self.apply_reset(value, email, new_password_hash).await;
        track_password_reset_completed(result.is_ok());
        result
    }

    async fn apply_reset(
        &self,
        value: &str,
        email: &str,
        new_password_hash: &str,
    ) -> Result<(), PasswordResetError> {
        let redeemed = self.resets.redeem(value, email, new_password_hash).await?;

        info!(
            user_id = %redeemed.user_id,
            token_id = %redeemed.token_id,
            "Password reset completed"
        );
        Ok(())
    }

    async fn issue_token(&self, email: &str) -> Result<PasswordResetToken, PasswordResetError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(PasswordResetError::NotFound)?;

        if !user.is_active {
            warn!(user_id = %user.id, "Password reset requested for inactive user");
            return Err(PasswordResetError::NotFound);
        }

        let invalidated = self.tokens.invalidate_all_for_email(email).await?;
        let token = self.tokens.create_token(email).await?;

        info!(
            user_id = %user.id,
            token_id = %token.id,
            invalidated,
            "Password reset token issued"
        );
        Ok(token)
    }
}
