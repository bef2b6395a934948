//! API process settings.
//!
//! # Environment Variables
//!
//! - `SERVER_ADDR`: listener address (default: `0.0.0.0:3000`)
//! - `REQUEST_TIMEOUT_SECS`: per-request deadline, answered with 504 (default: `30`)
//! - `SWEEP_INTERVAL_SECS`: expiry sweep period (default: `10`)
//! - `RESET_TOKEN_TTL_SECS`: password-reset token lifetime (default: `3600`)

use std::env;
use std::time::Duration;

use crate::env_or;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: String,
    pub request_timeout: Duration,
    pub sweep_interval: Duration,
    pub reset_token_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".to_string(),
            request_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(10),
            reset_token_ttl: Duration::from_secs(3600),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            addr: env::var("SERVER_ADDR").unwrap_or(defaults.addr),
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", 30)),
            sweep_interval: Duration::from_secs(env_or::<u64>("SWEEP_INTERVAL_SECS", 10).max(1)),
            reset_token_ttl: Duration::from_secs(env_or("RESET_TOKEN_TTL_SECS", 3600)),
        }
    }
}
