use anyhow::anyhow;
use axum::{Json, extract::State};
use tracing::{error, instrument, warn};

use dentra_core::{AppError, hash_password};
use dentra_models::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest};

use super::error::PasswordResetError;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

pub const FORGOT_PASSWORD_MESSAGE: &str = "If the email exists, a password reset link has been sent";
pub const RESET_SUCCESS_MESSAGE: &str = "Password reset successful";
pub const RESET_FAILED_MESSAGE: &str = "Password reset failed";

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email queued if the account exists", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    match state.password_reset.request_password_reset(&dto.email).await {
        Ok(_) | Err(PasswordResetError::NotFound) => {
            Ok(Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)))
        }
        Err(e) => {
            error!(error = %e, "Password reset request failed");
            Err(AppError::internal_error(
                "Failed to process password reset request".to_string(),
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset successful", body = MessageResponse),
        (status = 400, description = "Missing fields, invalid or expired token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let password_hash = hash_password(&dto.new_password)?;

    state
        .password_reset
        .reset_password(&dto.token, &dto.email, &password_hash)
        .await
        .map_err(|e| {
            warn!(error = %e, "Password reset rejected");
            AppError::bad_request(anyhow!(RESET_FAILED_MESSAGE))
        })?;

    Ok(Json(MessageResponse::new(RESET_SUCCESS_MESSAGE)))
}
