//! # Dentra Models
//!
//! Domain models and DTOs for the Dentra API.
//!
//! # Modules
//!
//! - [`auth`]: Authentication request/response DTOs (login, password reset, verification)
//! - [`email`]: The queued email-intent message exchanged with the email worker
//! - [`tokens`]: Password-reset tokens and blacklisted authentication tokens
//! - [`users`]: The user record as seen by the authentication core
//!
//! # Example
//!
//! ```ignore
//! use dentra_models::email::{EmailMessage, EmailType};
//!
//! let message = EmailMessage::password_reset("user@example.com", "9f2c...");
//! assert_eq!(message.kind(), EmailType::PasswordReset);
//! ```

pub mod auth;
pub mod email;
pub mod tokens;
pub mod users;

// Re-export commonly used types at crate root for convenience
pub use auth::{
    Claims, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    ResetPasswordRequest, VerifyEmailRequest,
};
pub use email::{EmailMessage, EmailType};
pub use tokens::{BlacklistedToken, PasswordResetToken};
pub use users::User;
