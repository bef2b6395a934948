use std::sync::Arc;

use dentra_config::{CorsConfig, JwtConfig, ServerConfig};
use dentra_db::{BlacklistStore, UserRepository};

use crate::modules::notifications::EmailDispatcher;
use crate::modules::password_reset::PasswordResetService;

/// Shared handler state. Every store is a trait object so the same router
/// runs against PostgreSQL in production and in-memory stores in tests.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub blacklist: Arc<dyn BlacklistStore>,
    pub dispatcher: Arc<dyn EmailDispatcher>,
    pub password_reset: PasswordResetService,
    pub jwt_config: JwtConfig,
    pub server_config: ServerConfig,
    pub cors_config: CorsConfig,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        blacklist: Arc<dyn BlacklistStore>,
        dispatcher: Arc<dyn EmailDispatcher>,
        password_reset: PasswordResetService,
        jwt_config: JwtConfig,
        server_config: ServerConfig,
        cors_config: CorsConfig,
    ) -> Self {
        Self {
            users,
            blacklist,
            dispatcher,
            password_reset,
            jwt_config,
            server_config,
            cors_config,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("jwt_config", &self.jwt_config)
            .field("server_config", &self.server_config)
            .field("cors_config", &self.cors_config)
            .finish_non_exhaustive()
    }
}
