//! Email-intent messages exchanged between the API and the email worker.
//!
//! Wire format:
//!
//! ```json
//! { "type": "password-reset", "to": "user@example.com", "data": { "token": "…" } }
//! ```
//!
//! Messages are published with the recipient address as the partition key
//! and a `type` header duplicating the body field.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailType {
    Verification,
    PasswordReset,
}

impl EmailType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailType::Verification => "verification",
            EmailType::PasswordReset => "password-reset",
        }
    }
}

impl std::fmt::Display for EmailType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmailType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verification" => Ok(EmailType::Verification),
            "password-reset" => Ok(EmailType::PasswordReset),
            other => Err(format!("unknown email type: {}", other)),
        }
    }
}

/// An immutable request to send one templated email.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    #[serde(rename = "type")]
    kind: EmailType,
    to: String,
    data: BTreeMap<String, String>,
}

impl std::fmt::Debug for EmailMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailMessage")
            .field("type", &self.kind)
            .field("to", &self.to)
            .field("data", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EmailMessage {
    pub fn new(kind: EmailType, to: &str, data: BTreeMap<String, String>) -> Self {
        Self {
            kind,
            to: to.to_string(),
            data,
        }
    }

    pub fn verification(to: &str, token: &str) -> Self {
        let mut data = BTreeMap::new();
        data.insert("token".to_string(), token.to_string());
        Self::new(EmailType::Verification, to, data)
    }

    pub fn password_reset(to: &str, token: &str) -> Self {
        let mut data = BTreeMap::new();
        data.insert("token".to_string(), token.to_string());
        data.insert("email".to_string(), to.to_string());
        Self::new(EmailType::PasswordReset, to, data)
    }

    pub fn kind(&self) -> EmailType {
        self.kind
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn data(&self) -> &BTreeMap<String, String> {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_reset_wire_shape() {
        let message = EmailMessage::password_reset("user@example.com", "abc123");
        let value: serde_json::Value = serde_json::from_slice(&message.to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "password-reset");
        assert_eq!(value["to"], "user@example.com");
        assert_eq!(value["data"]["token"], "abc123");
    }

    #[test]
    fn test_verification_type_tag() {
        let message = EmailMessage::verification("user@example.com", "jwt");
        let value: serde_json::Value = serde_json::from_slice(&message.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "verification");
    }

    #[test]
    fn test_parse_from_foreign_producer() {
        let raw = br#"{"type":"verification","to":"a@b.test","data":{"token":"t","extra":"x"}}"#;
        let message = EmailMessage::from_json(raw).unwrap();

        assert_eq!(message.kind(), EmailType::Verification);
        assert_eq!(message.get("token"), Some("t"));
        assert_eq!(message.get("extra"), Some("x"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let raw = br#"{"type":"newsletter","to":"a@b.test","data":{}}"#;
        assert!(EmailMessage::from_json(raw).is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let message = EmailMessage::password_reset("user@example.com", "very-secret-token");
        assert!(!format!("{:?}", message).contains("very-secret-token"));
    }

    #[test]
    fn test_email_type_from_str() {
        assert_eq!("password-reset".parse::<EmailType>(), Ok(EmailType::PasswordReset));
        assert!("other".parse::<EmailType>().is_err());
    }
}
