use axum::Json;
use axum::extract::State;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::instrument;
use utoipa::ToSchema;

use dentra_core::AppError;
use dentra_models::{LoginRequest, LoginResponse, MessageResponse, User, VerifyEmailRequest};

use super::service::AuthService;
use crate::middleware::auth::{ACCESS_TOKEN_COOKIE, AuthUser};
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[derive(ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Login and receive the session cookie
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, `access_token` cookie set", body = LoginResponse),
        (status = 400, description = "Bad request - validation error", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, jar, dto))]
pub async fn login_user(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let (token, user) = AuthService::login_user(&*state.users, &dto, &state.jwt_config).await?;

    let cookie = Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.jwt_config.cookie_secure)
        .same_site(SameSite::Lax);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Login successful".to_string(),
            user,
        }),
    ))
}

/// Revoke the current session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
#[instrument(skip(state, jar))]
pub async fn logout_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    AuthService::logout(&*state.blacklist, &auth_user).await?;

    let jar = jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"));
    Ok((jar, Json(MessageResponse::new("Logged out successfully"))))
}

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<User>, AppError> {
    let user_id = auth_user.user_id()?;
    let user = AuthService::get_current_user(&*state.users, user_id).await?;
    Ok(Json(user))
}

/// Email a verification link to the authenticated user
#[utoipa::path(
    post,
    path = "/api/auth/send-verification-email",
    responses(
        (status = 200, description = "Verification email queued", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Could not generate or queue the email", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("cookie_auth" = []), ("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn send_verification_email(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::send_verification_email(&*state.dispatcher, &auth_user, &state.jwt_config).await?;
    Ok(Json(MessageResponse::new("Verification email sent")))
}

/// Confirm an email address with the mailed token
#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn verify_email(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::verify_email(&*state.users, &dto.token, &state.jwt_config).await?;
    Ok(Json(MessageResponse::new("Email verified successfully")))
}
