//! PostgreSQL implementations of the storage ports.
//!
//! Queries use the runtime-checked `sqlx::query`/`query_as` API so the crate
//! builds without a live database.

mod blacklist;
mod resets;
mod tokens;
mod users;

pub use blacklist::PgBlacklistStore;
pub use resets::PgPasswordResetStore;
pub use tokens::PgTokenStore;
pub use users::PgUserRepository;
