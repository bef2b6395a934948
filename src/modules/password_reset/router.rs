use axum::{Router, routing::post};

use crate::modules::password_reset::controller::{forgot_password, reset_password};
use crate::state::AppState;

pub fn init_password_reset_router() -> Router<AppState> {
    Router::new()
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}
