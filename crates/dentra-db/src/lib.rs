//! # Dentra DB
//!
//! Database pool, repositories and token stores for the Dentra API.
//!
//! This crate provides:
//!
//! - [`init_db_pool`]: PostgreSQL pool initialization
//! - [`repository`]: the [`UserRepository`], [`TokenStore`],
//!   [`PasswordResetStore`] and [`BlacklistStore`] traits the services depend on
//! - [`postgres`]: `sqlx` implementations of those traits
//! - [`memory`]: in-process implementations for tests and local development
//!
//! Every store takes an injected [`Clock`](dentra_core::Clock) so that token
//! expiry can be driven from tests.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dentra_config::DatabaseConfig;
//! use dentra_core::SystemClock;
//! use dentra_db::{PgTokenStore, init_db_pool};
//!
//! let pool = init_db_pool(&DatabaseConfig::from_env()?).await?;
//! let tokens = PgTokenStore::new(pool, Arc::new(SystemClock), chrono::Duration::hours(1));
//! ```

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod token;

use sqlx::postgres::PgPoolOptions;

use dentra_config::DatabaseConfig;

pub use error::StoreError;
pub use memory::{
    MemoryBlacklistStore, MemoryPasswordResetStore, MemoryTokenStore, MemoryUserRepository,
};
pub use postgres::{PgBlacklistStore, PgPasswordResetStore, PgTokenStore, PgUserRepository};
pub use repository::{
    BlacklistStore, PasswordResetStore, RedeemedReset, TokenStore, UserRepository,
};
pub use token::generate_token;

// Re-export PgPool for convenience
pub use sqlx::PgPool;

/// Initializes a PostgreSQL connection pool.
///
/// The pool is cheaply cloneable and should be created once during startup
/// and handed to every store. Waiting for a connection is bounded by
/// [`DatabaseConfig::acquire_timeout`].
///
/// # Errors
///
/// Returns the underlying `sqlx` error if the database cannot be reached.
pub async fn init_db_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
}
