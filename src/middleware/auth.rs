use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, warn};
use uuid::Uuid;

use dentra_auth::{Claims, verify_token};
use dentra_core::AppError;

use crate::state::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Extractor that authenticates the request and carries the verified claims
/// along with the raw token, which logout needs to revoke it.
///
/// The token is read from the `access_token` cookie, falling back to an
/// `Authorization: Bearer` header. Revoked tokens are rejected with 401.
#[derive(Clone)]
pub struct AuthUser {
    pub claims: Claims,
    pub token: String,
}

impl std::fmt::Debug for AuthUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthUser")
            .field("sub", &self.claims.sub)
            .field("jti", &self.claims.jti)
            .finish_non_exhaustive()
    }
}

impl AuthUser {
    /// Get the user ID as UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.claims.sub)
            .map_err(|_| AppError::unauthorized("Invalid user ID in token".to_string()))
    }

    pub fn email(&self) -> &str {
        &self.claims.email
    }
}

fn extract_token(parts: &Parts) -> Result<String, AppError> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        return Ok(cookie.value().to_string());
    }

    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing authentication token".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AppError::unauthorized("Invalid authorization header format".to_string()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let claims = verify_token(&token, &state.jwt_config)?;

        let revoked = state.blacklist.is_blacklisted(&token).await.map_err(|e| {
            error!(error = %e, "Blacklist lookup failed");
            AppError::internal_error("Failed to verify session".to_string())
        })?;
        if revoked {
            warn!(jti = %claims.jti, "Rejected blacklisted token");
            return Err(AppError::unauthorized("Token has been revoked".to_string()));
        }

        Ok(AuthUser { claims, token })
    }
}
