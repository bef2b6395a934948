//! # Dentra Mailer
//!
//! Everything on the delivery side of the email queue:
//!
//! - [`templates`]: HTML/text rendering with `{{placeholder}}` substitution
//!   and frontend link construction
//! - [`transport`]: the [`MailTransport`] port, the `lettre` SMTP relay and an
//!   in-memory recorder
//! - [`worker`]: the [`EmailWorker`] consume-render-send-commit loop
//!
//! The API process never depends on this crate; it only publishes
//! [`EmailMessage`](dentra_models::EmailMessage)s.

pub mod templates;
pub mod transport;
pub mod worker;

pub use templates::{RenderedEmail, TemplateError, build_link, render_email};
pub use transport::{MailError, MailTransport, MemoryMailer, SmtpMailer};
pub use worker::{EmailWorker, Outcome, WorkerError, WorkerSettings};
