//! JWT signing configuration.
//!
//! The signing secret is always injected through this struct; nothing in the
//! codebase holds key material in a global.
//!
//! # Rotation
//!
//! New tokens are signed with `JWT_SECRET`. Verification additionally accepts
//! every secret listed in `JWT_PREVIOUS_SECRETS` (comma separated). To rotate,
//! move the current secret into `JWT_PREVIOUS_SECRETS`, set a new
//! `JWT_SECRET`, and drop the old one once `JWT_ACCESS_EXPIRY` has elapsed.
//!
//! # Environment Variables
//!
//! - `JWT_SECRET`: current signing secret (required, at least 32 bytes)
//! - `JWT_PREVIOUS_SECRETS`: secrets still accepted for verification
//! - `JWT_ACCESS_EXPIRY`: access token lifetime in seconds (default: `86400`)
//! - `JWT_VERIFICATION_EXPIRY`: email-verification token lifetime in seconds (default: `86400`)
//! - `AUTH_COOKIE_SECURE`: mark the session cookie `Secure` (default: `true`)

use std::env;

use crate::{ConfigError, env_flag, env_list, env_or};

const MIN_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub previous_secrets: Vec<String>,
    pub access_token_expiry: i64,
    pub verification_token_expiry: i64,
    pub cookie_secure: bool,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("previous_secrets", &self.previous_secrets.len())
            .field("access_token_expiry", &self.access_token_expiry)
            .field("verification_token_expiry", &self.verification_token_expiry)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

impl JwtConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: format!("must be at least {} bytes", MIN_SECRET_LEN),
            });
        }

        Ok(Self {
            secret,
            previous_secrets: env_list("JWT_PREVIOUS_SECRETS"),
            access_token_expiry: positive_seconds(
                "JWT_ACCESS_EXPIRY",
                env_or("JWT_ACCESS_EXPIRY", 86400),
            )?,
            verification_token_expiry: positive_seconds(
                "JWT_VERIFICATION_EXPIRY",
                env_or("JWT_VERIFICATION_EXPIRY", 86400),
            )?,
            cookie_secure: env_flag("AUTH_COOKIE_SECURE", true),
        })
    }

    /// Secrets accepted for verification, current first.
    pub fn verification_secrets(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.secret.as_str()).chain(self.previous_secrets.iter().map(String::as_str))
    }
}

fn positive_seconds(name: &'static str, value: i64) -> Result<i64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("must be a positive number of seconds, got {}", value),
        });
    }
    Ok(value)
}
