//! JWT (JSON Web Token) utilities.
//!
//! Tokens are HS256-signed with [`JwtConfig::secret`]. Verification walks
//! [`JwtConfig::verification_secrets`] so tokens signed with a rotated-out
//! secret keep working until they expire.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use dentra_config::JwtConfig;
use dentra_core::AppError;

use crate::claims::{Claims, EMAIL_VERIFICATION_PURPOSE, EmailVerificationClaims};

/// Creates a session token for `user_id`.
///
/// # Errors
///
/// Returns an internal error if encoding fails.
pub fn create_access_token(
    user_id: Uuid,
    email: &str,
    clinic_id: Option<Uuid>,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let exp = expires_at(now, jwt_config.access_token_expiry);
    let now = now as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        clinic_id,
        exp,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

/// Verifies a session token and returns its claims.
///
/// # Errors
///
/// Returns an unauthorized error if the signature matches none of the
/// accepted secrets, the token has expired, or it is malformed.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode_with_rotation::<Claims>(token, jwt_config)
        .ok_or_else(|| AppError::unauthorized("Invalid or expired token".to_string()))
}

/// Creates a purpose-tagged email verification token.
pub fn create_email_verification_token(
    user_id: Uuid,
    email: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let exp = expires_at(now, jwt_config.verification_token_expiry);
    let now = now as usize;

    let claims = EmailVerificationClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        purpose: EMAIL_VERIFICATION_PURPOSE.to_string(),
        exp,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| {
        AppError::internal_error(format!("Failed to create verification token: {}", e))
    })
}

/// Verifies an email verification token.
///
/// # Errors
///
/// Returns an unauthorized error if the token is invalid, expired, or not
/// tagged for email verification.
pub fn verify_email_verification_token(
    token: &str,
    jwt_config: &JwtConfig,
) -> Result<EmailVerificationClaims, AppError> {
    let claims = decode_with_rotation::<EmailVerificationClaims>(token, jwt_config)
        .ok_or_else(|| {
            AppError::unauthorized("Invalid or expired verification token".to_string())
        })?;

    if claims.purpose != EMAIL_VERIFICATION_PURPOSE {
        return Err(AppError::unauthorized(
            "Invalid verification token".to_string(),
        ));
    }

    Ok(claims)
}

/// `exp` claim for a token issued at `now` that lives `lifetime` seconds.
/// A negative lifetime yields a timestamp in the past, clamped at the epoch.
fn expires_at(now: i64, lifetime: i64) -> usize {
    now.saturating_add(lifetime).max(0) as usize
}

fn decode_with_rotation<T: DeserializeOwned>(token: &str, jwt_config: &JwtConfig) -> Option<T> {
    let validation = Validation::new(Algorithm::HS256);

    jwt_config.verification_secrets().find_map(|secret| {
        decode::<T>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .ok()
        .map(|data| data.claims)
    })
}
