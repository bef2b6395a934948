use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// A user account.
///
/// Users belong to the clinic-management CRUD subsystem; the authentication
/// core only reads them, replaces the password hash, and flips
/// `email_verified`. The password hash is never serialized.
#[derive(Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub clinic_id: Option<Uuid>,
    pub is_active: bool,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("clinic_id", &self.clinic_id)
            .field("is_active", &self.is_active)
            .field("email_verified", &self.email_verified)
            .finish_non_exhaustive()
    }
}

impl User {
    /// Builds a fresh active, unverified user. Used by seeding code and tests.
    pub fn new(email: &str, password_hash: String, first_name: &str, last_name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            clinic_id: None,
            is_active: true,
            email_verified: false,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
