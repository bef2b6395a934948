use std::env;
use std::time::Duration;

use crate::env_or;

/// SMTP relay and link settings used by the email worker.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_timeout: Duration,
    pub from_email: String,
    pub from_name: String,
    pub frontend_url: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("smtp_timeout", &self.smtp_timeout)
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("frontend_url", &self.frontend_url)
            .finish()
    }
}

impl EmailConfig {
    pub fn from_env() -> Self {
        Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            smtp_port: env_or("SMTP_PORT", 1025),
            smtp_username: env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            smtp_timeout: Duration::from_secs(env_or("SMTP_TIMEOUT_SECS", 30)),
            from_email: env::var("FROM_EMAIL").unwrap_or_else(|_| "noreply@dentra.app".to_string()),
            from_name: env::var("FROM_NAME").unwrap_or_else(|_| "Dentra".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        }
    }
}
