use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{get_me, login_user, logout_user, send_verification_email, verify_email};
use crate::modules::password_reset::router::init_password_reset_router;
use crate::state::AppState;

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login_user))
        .route("/logout", post(logout_user))
        .route("/me", get(get_me))
        .route("/send-verification-email", post(send_verification_email))
        .route("/verify-email", post(verify_email))
        .merge(init_password_reset_router())
}
