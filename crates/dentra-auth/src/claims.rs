//! JWT claim structures.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const EMAIL_VERIFICATION_PURPOSE: &str = "email_verification";

/// JWT claims for session (access) tokens.
///
/// # Fields
///
/// - `sub`: User ID (subject)
/// - `email`: User's email address
/// - `clinic_id`: Clinic affiliation, if any
/// - `exp`: Token expiration timestamp
/// - `iat`: Token issued-at timestamp
/// - `jti`: Unique token identifier
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    /// User's email address
    pub email: String,
    /// Clinic the user belongs to
    pub clinic_id: Option<Uuid>,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
    /// Unique token identifier (JWT ID)
    pub jti: String,
}

/// JWT claims for email verification tokens.
///
/// `purpose` must equal [`EMAIL_VERIFICATION_PURPOSE`]; a session token
/// presented to the verification endpoint fails deserialization because it
/// has no `purpose` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailVerificationClaims {
    pub sub: String,
    pub email: String,
    pub purpose: String,
    pub exp: usize,
    pub iat: usize,
}
