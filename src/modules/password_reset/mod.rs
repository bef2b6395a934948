pub mod controller;
pub mod error;
pub mod router;
pub mod service;

pub use error::PasswordResetError;
pub use service::PasswordResetService;
