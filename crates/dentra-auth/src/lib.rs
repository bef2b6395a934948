//! # Dentra Auth
//!
//! Authentication claim types and JWT utilities for the Dentra API.
//!
//! This crate provides:
//!
//! - [`claims`]: JWT claim structures for session and email-verification tokens
//! - [`jwt`]: Token creation and verification utilities
//!
//! # Token Types
//!
//! - **Access Token** ([`Claims`]): session token carried in the `access_token`
//!   cookie (or a bearer header). Each token has a unique `jti`, so revoking
//!   one session through the blacklist never affects another.
//! - **Email Verification Token** ([`EmailVerificationClaims`]): purpose-tagged
//!   token mailed to the user; it is rejected anywhere a session is expected.
//!
//! Signing keys always come from the [`JwtConfig`](dentra_config::JwtConfig)
//! passed in by the caller.
//!
//! # Example
//!
//! ```ignore
//! use dentra_auth::{create_access_token, verify_token};
//! use dentra_config::JwtConfig;
//!
//! let config = JwtConfig::from_env()?;
//! let token = create_access_token(user_id, "user@example.com", None, &config)?;
//! let claims = verify_token(&token, &config)?;
//! ```

pub mod claims;
pub mod jwt;

// Re-export commonly used types at crate root
pub use claims::{Claims, EMAIL_VERIFICATION_PURPOSE, EmailVerificationClaims};
pub use jwt::{
    create_access_token, create_email_verification_token, verify_email_verification_token,
    verify_token,
};
