//! # Dentra Config
//!
//! Configuration types for the Dentra API and the email worker.
//!
//! Every structure is loaded from environment variables (a `.env` file is
//! read by the binaries through `dotenvy` before any of these run):
//!
//! - [`cors`]: CORS configuration
//! - [`database`]: PostgreSQL pool settings
//! - [`email`]: SMTP relay and frontend link settings
//! - [`jwt`]: JWT signing keys, rotation, and cookie settings
//! - [`queue`]: Message queue topics, partitions, and consumer group
//! - [`server`]: Listener address, request timeout, sweep interval, reset-token TTL
//!
//! # Example
//!
//! ```ignore
//! use dentra_config::{JwtConfig, QueueConfig};
//!
//! let jwt_config = JwtConfig::from_env()?;
//! let queue_config = QueueConfig::from_env();
//! ```

pub mod cors;
pub mod database;
pub mod email;
pub mod jwt;
pub mod queue;
pub mod server;

// Re-export commonly used types at crate root
pub use cors::CorsConfig;
pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use jwt::JwtConfig;
pub use queue::QueueConfig;
pub use server::ServerConfig;

use std::env;
use std::str::FromStr;

/// Error raised when a required setting is missing or unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Reads and parses an environment variable, falling back to `default` when
/// it is unset or does not parse.
pub(crate) fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Boolean flags accept `true`/`1` (case-insensitive).
pub(crate) fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}

/// Comma-separated list with blanks removed.
pub(crate) fn env_list(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
