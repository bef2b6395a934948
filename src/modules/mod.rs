pub mod auth;
pub mod notifications;
pub mod password_reset;
