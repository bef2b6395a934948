//! Token records owned by the token store.
//!
//! A [`PasswordResetToken`] moves through a small state machine:
//!
//! ```text
//! Active ──reset_password──▶ Used
//!    │ ──time passes──────▶ Expired
//!    └ ──newer request────▶ Invalidated (stored as is_used = true)
//! ```
//!
//! No transition leaves a terminal state. A [`BlacklistedToken`] is an
//! authentication token revoked before its natural expiry.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lifecycle state derived from the stored flags and the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Used,
    Expired,
}

/// A single-use, time-bounded password-reset token.
///
/// The token value is secret; `Debug` redacts it and only `id` should appear
/// in logs.
#[derive(Clone, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for PasswordResetToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordResetToken")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("is_used", &self.is_used)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl PasswordResetToken {
    /// Used takes precedence over expired; both are terminal.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.is_used {
            TokenState::Used
        } else if self.expires_at <= now {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == TokenState::Active
    }
}

/// A revoked authentication token. `expire_time` is in epoch seconds.
#[derive(Clone, sqlx::FromRow)]
pub struct BlacklistedToken {
    pub id: Uuid,
    pub token: String,
    pub expire_time: i64,
}

impl std::fmt::Debug for BlacklistedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlacklistedToken")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .field("expire_time", &self.expire_time)
            .finish()
    }
}

impl BlacklistedToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_time <= now.timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_in: Duration, is_used: bool) -> (PasswordResetToken, DateTime<Utc>) {
        let now = Utc::now();
        (
            PasswordResetToken {
                id: Uuid::new_v4(),
                token: "a".repeat(64),
                email: "patient@clinic.test".to_string(),
                expires_at: now + expires_in,
                is_used,
                created_at: now,
            },
            now,
        )
    }

    #[test]
    fn test_state_active() {
        let (t, now) = token(Duration::hours(1), false);
        assert_eq!(t.state_at(now), TokenState::Active);
        assert!(t.is_active_at(now));
    }

    #[test]
    fn test_state_expired_at_boundary() {
        let (t, now) = token(Duration::zero(), false);
        assert_eq!(t.state_at(now), TokenState::Expired);
    }

    #[test]
    fn test_used_wins_over_expired() {
        let (t, now) = token(Duration::hours(-1), true);
        assert_eq!(t.state_at(now), TokenState::Used);
    }

    #[test]
    fn test_debug_redacts_token_value() {
        let (t, _) = token(Duration::hours(1), false);
        let debug = format!("{:?}", t);
        assert!(!debug.contains(&"a".repeat(64)));
        assert!(debug.contains(&t.id.to_string()));
    }

    #[test]
    fn test_blacklisted_token_expiry() {
        let now = Utc::now();
        let entry = BlacklistedToken {
            id: Uuid::new_v4(),
            token: "jwt".to_string(),
            expire_time: now.timestamp() - 1,
        };
        assert!(entry.is_expired_at(now));
    }
}
