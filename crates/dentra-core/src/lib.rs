//! # Dentra Core
//!
//! Core types, errors, and utilities for the Dentra API.
//!
//! This crate provides foundational types used throughout the Dentra application:
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`password`]: Secure password hashing and verification
//! - [`clock`]: Injectable time source used by every expiry check
//!
//! # Example
//!
//! ```ignore
//! use dentra_core::errors::AppError;
//! use dentra_core::password::{hash_password, verify_password};
//!
//! // Create an error
//! let error = AppError::not_found(anyhow::anyhow!("User not found"));
//!
//! // Hash a password
//! let hash = hash_password("secure_password")?;
//! assert!(verify_password("secure_password", &hash)?);
//! ```

pub mod clock;
pub mod errors;
pub mod password;

// Re-export commonly used types at crate root
pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::AppError;
pub use password::{hash_password, verify_dummy_password, verify_password};
