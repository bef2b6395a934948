//! Dentra Observability
//!
//! Provides:
//! - Structured logging via `tracing` (console, error log file, JSON log file)
//! - HTTP request/response logging middleware
//! - Prometheus metrics and business counters
//!
//! Metrics can be switched off at runtime with `OBSERVABILITY_ENABLED=false`;
//! the `track_*` helpers then do nothing.
//!
//! # Examples
//!
//! ```ignore
//! use dentra_observability::{init_metrics, init_tracing};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     init_tracing("dentra")?;
//!     let _handle = init_metrics()?;
//!     Ok(())
//! }
//! ```

pub mod logging;
pub mod metrics;

pub use self::logging::{init_tracing, logging_middleware};
pub use self::metrics::{
    init_metrics, is_observability_enabled, metrics_app, metrics_middleware,
    track_email_dispatch, track_login_failure, track_login_success,
    track_password_reset_completed, track_password_reset_requested, track_tokens_swept,
};
pub use metrics_exporter_prometheus::PrometheusHandle;
