//! In-process implementations of the storage ports.
//!
//! They keep the same semantics as the PostgreSQL stores (strict expiry,
//! idempotent `mark_used`, blacklist upsert) and back the HTTP tests and the
//! `dentra` binary when no database is wanted.

mod blacklist;
mod resets;
mod tokens;
mod users;

pub use blacklist::MemoryBlacklistStore;
pub use resets::MemoryPasswordResetStore;
pub use tokens::MemoryTokenStore;
pub use users::MemoryUserRepository;
