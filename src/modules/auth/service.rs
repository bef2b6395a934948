use anyhow::anyhow;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use dentra_auth::{
    create_access_token, create_email_verification_token, verify_email_verification_token,
};
use dentra_config::JwtConfig;
use dentra_core::{AppError, verify_dummy_password, verify_password};
use dentra_db::{BlacklistStore, StoreError, UserRepository};
use dentra_models::{LoginRequest, User};
use dentra_observability::{track_login_failure, track_login_success};

use crate::middleware::auth::AuthUser;
use crate::modules::notifications::EmailDispatcher;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const INVALID_VERIFICATION_TOKEN: &str = "Invalid or expired verification token";

fn persistence_error(e: StoreError) -> AppError {
    error!(error = %e, "Store call failed");
    AppError::internal_error("Internal server error".to_string())
}

pub struct AuthService;

impl AuthService {
    /// Checks credentials and issues a session token. Unknown email, wrong
    /// password and inactive account all produce the same 401, and an
    /// unknown email still pays for one bcrypt verification.
    #[instrument(skip(users, dto, jwt_config), fields(email = %dto.email))]
    pub async fn login_user(
        users: &dyn UserRepository,
        dto: &LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<(String, User), AppError> {
        let Some(user) = users
            .find_by_email(&dto.email)
            .await
            .map_err(persistence_error)?
        else {
            verify_dummy_password(&dto.password);
            track_login_failure("unknown_email");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&dto.password, &user.password_hash)? {
            track_login_failure("invalid_password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if !user.is_active {
            warn!(user_id = %user.id, "Login attempt for inactive user");
            track_login_failure("inactive");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let token = create_access_token(user.id, &user.email, user.clinic_id, jwt_config)?;
        track_login_success();
        info!(user_id = %user.id, "User logged in");

        Ok((token, user))
    }

    /// Revokes the caller's token until its own expiry.
    #[instrument(skip(blacklist, auth_user), fields(jti = %auth_user.claims.jti))]
    pub async fn logout(blacklist: &dyn BlacklistStore, auth_user: &AuthUser) -> Result<(), AppError> {
        blacklist
            .insert(&auth_user.token, auth_user.claims.exp as i64)
            .await
            .map_err(persistence_error)?;

        info!(user_id = %auth_user.claims.sub, "User logged out");
        Ok(())
    }

    #[instrument(skip(users))]
    pub async fn get_current_user(users: &dyn UserRepository, user_id: Uuid) -> Result<User, AppError> {
        users
            .find_by_id(user_id)
            .await
            .map_err(persistence_error)?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    /// Generates a verification token for the caller and queues the email.
    /// Every failure is reported as 404 with the underlying message.
    #[instrument(skip(dispatcher, auth_user, jwt_config), fields(user_id = %auth_user.claims.sub))]
    pub async fn send_verification_email(
        dispatcher: &dyn EmailDispatcher,
        auth_user: &AuthUser,
        jwt_config: &JwtConfig,
    ) -> Result<(), AppError> {
        let user_id = Uuid::parse_str(&auth_user.claims.sub)
            .map_err(|e| AppError::not_found(anyhow!("Invalid user id in token: {}", e)))?;

        let token = create_email_verification_token(user_id, auth_user.email(), jwt_config)
            .map_err(|e| AppError::not_found(e.error))?;

        dispatcher
            .send_verification_email(auth_user.email(), &token)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    queue.topic = %e.topic,
                    email.recipient = %e.recipient,
                    email.kind = %e.email_type,
                    "Failed to queue verification email"
                );
                AppError::not_found(e)
            })?;

        Ok(())
    }

    /// Marks the token's user as verified. The token must still name the
    /// user's current email address.
    #[instrument(skip(users, token, jwt_config))]
    pub async fn verify_email(
        users: &dyn UserRepository,
        token: &str,
        jwt_config: &JwtConfig,
    ) -> Result<(), AppError> {
        let claims = verify_email_verification_token(token, jwt_config)
            .map_err(|_| AppError::bad_request(anyhow!(INVALID_VERIFICATION_TOKEN)))?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::bad_request(anyhow!(INVALID_VERIFICATION_TOKEN)))?;

        let user = users
            .find_by_id(user_id)
            .await
            .map_err(persistence_error)?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;

        if user.email != claims.email {
            warn!(user_id = %user.id, "Verification token issued for a previous email");
            return Err(AppError::bad_request(anyhow!(INVALID_VERIFICATION_TOKEN)));
        }

        users
            .mark_email_verified(user.id)
            .await
            .map_err(persistence_error)?;

        info!(user_id = %user.id, "Email verified");
        Ok(())
    }
}
