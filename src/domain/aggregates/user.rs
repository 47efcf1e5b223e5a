//! Users and their shipping profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// An account provisioned by the identity service.
#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UserProfile {
    #[serde(skip_deserializing)]
    pub user_id: Uuid,
    #[validate(length(max = 100))]
    pub full_name: String,
    #[validate(length(max = 20))]
    pub phone: String,
    #[validate(length(max = 255))]
    pub address: String,
    #[validate(length(max = 100))]
    pub city: String,
    #[validate(length(max = 20))]
    pub postal_code: String,
    #[validate(length(max = 100))]
    pub country: String,
}

impl UserProfile {
    pub fn empty(user_id: Uuid) -> Self { Self { user_id, ..Default::default() } }

    /// Fields that must be filled in before the user can check out.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", &self.full_name),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_complete(&self) -> bool { self.missing_fields().is_empty() }
}
