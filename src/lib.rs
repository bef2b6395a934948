//! # Dentra API
//!
//! Authentication core of the Dentra dental-clinic backend: sessions, email
//! verification and password reset, with email delivery handed off to a
//! separate worker over a partitioned message queue.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── bin/              # dentra-email-worker, dentra-cli
//! ├── middleware/       # AuthUser extractor, request timeout
//! ├── modules/          # Feature modules
//! │   ├── auth/          # login, logout, me, email verification
//! │   ├── notifications/ # EmailDispatcher and its queue implementation
//! │   └── password_reset/# forgot/reset password
//! ├── docs.rs           # OpenAPI document
//! ├── router.rs         # Main application router
//! ├── shutdown.rs       # Ctrl-C / SIGTERM future
//! ├── state.rs          # Shared application state
//! ├── sweeper.rs        # Expired-token sweep
//! └── validator.rs      # ValidatedJson extractor
//! ```
//!
//! Workspace crates:
//!
//! | Crate | Contents |
//! |-------|----------|
//! | `dentra-core` | `AppError`, bcrypt helpers, `Clock` |
//! | `dentra-config` | `*Config::from_env()` structs |
//! | `dentra-models` | users, tokens, email messages, DTOs |
//! | `dentra-auth` | JWT claims, signing with key rotation |
//! | `dentra-db` | repositories and token stores (PostgreSQL, in-memory) |
//! | `dentra-queue` | Redis Streams publisher/consumer, in-memory broker |
//! | `dentra-mailer` | templates, SMTP transport, `EmailWorker` |
//! | `dentra-observability` | tracing setup, request logging, Prometheus |
//!
//! ## Request flow for a password reset
//!
//! 1. `POST /api/auth/forgot-password` invalidates older tokens, stores a new
//!    one and publishes a `password-reset` message keyed by the email.
//! 2. The email worker renders the template and relays it over SMTP.
//! 3. `POST /api/auth/reset-password` checks the token, stores the new hash
//!    and marks the token used.
//!
//! ## API Documentation
//!
//! Scalar is served at `http://localhost:3000/scalar`.

pub mod docs;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod shutdown;
pub mod state;
pub mod sweeper;
pub mod validator;

// Re-export workspace crates for convenience
pub use dentra_auth;
pub use dentra_config;
pub use dentra_core;
pub use dentra_db;
pub use dentra_mailer;
pub use dentra_models;
pub use dentra_observability;
pub use dentra_queue;
