use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use dentra_core::AppError;

use crate::state::AppState;

/// Bounds every request by `server_config.request_timeout`. On expiry the
/// handler future is dropped and the client gets 504.
pub async fn timeout_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let limit = state.server_config.request_timeout;
    let path = req.uri().path().to_string();

    match tokio::time::timeout(limit, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(path = %path, timeout_ms = limit.as_millis() as u64, "Request timed out");
            AppError::gateway_timeout("Request timed out".to_string()).into_response()
        }
    }
}
