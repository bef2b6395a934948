//! Authentication request and response DTOs.
//!
//! Request bodies are validated through the `ValidatedJson` extractor; a
//! failed validation answers 400 with the messages declared here.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::users::User;

// Re-export JWT claim types from dentra-auth
pub use dentra_auth::{Claims, EmailVerificationClaims};

pub const RESET_FIELDS_REQUIRED: &str = "Token, email and new_password are required";

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    #[schema(example = "dentist@clinic.test")]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "password123")]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub user: User,
}

/// Starts a password reset. The response never reveals whether the email
/// belongs to an account.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "A valid email is required"))]
    #[schema(example = "patient@example.com")]
    pub email: String,
}

/// Completes a password reset with the token received by email.
///
/// Missing fields deserialize as blank so that every incomplete body gets
/// the same error message.
#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Token, email and new_password are required"))]
    pub token: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Token, email and new_password are required"))]
    #[schema(example = "patient@example.com")]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Token, email and new_password are required"))]
    #[schema(example = "NewPass123")]
    pub new_password: String,
}

impl std::fmt::Debug for ResetPasswordRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetPasswordRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Deserialize, Validate, ToSchema)]
pub struct VerifyEmailRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

impl std::fmt::Debug for VerifyEmailRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyEmailRequest").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_invalid_email() {
        let request = LoginRequest {
            email: "invalid-email".to_string(),
            password: "password123".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_login_request_debug_hides_password() {
        let request = LoginRequest {
            email: "valid@example.com".to_string(),
            password: "hunter22".to_string(),
        };
        assert!(!format!("{:?}", request).contains("hunter22"));
    }

    #[test]
    fn test_reset_request_missing_fields_are_blank() {
        let request: ResetPasswordRequest =
            serde_json::from_str(r#"{"email":"a@b.test"}"#).unwrap();
        assert!(request.token.is_empty());

        let errors = request.validate().unwrap_err();
        let messages: Vec<String> = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter().filter_map(|e| e.message.as_ref().map(|m| m.to_string())))
            .collect();
        assert!(messages.iter().all(|m| m == RESET_FIELDS_REQUIRED));
    }

    #[test]
    fn test_reset_request_whitespace_is_blank() {
        let request = ResetPasswordRequest {
            token: "   ".to_string(),
            email: "a@b.test".to_string(),
            new_password: "NewPass123".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_reset_request_complete() {
        let request = ResetPasswordRequest {
            token: "abc".to_string(),
            email: "a@b.test".to_string(),
            new_password: "NewPass123".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_forgot_password_requires_email_format() {
        let request = ForgotPasswordRequest {
            email: "nope".to_string(),
        };
        assert!(request.validate().is_err());
    }
}
