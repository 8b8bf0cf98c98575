//! Identity model and related payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Identity entity
///
/// The phone number is the unique subject key carried by session tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub phone: String,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Whether `other` is the same identity
    pub fn is_same(&self, other: &Identity) -> bool {
        self.id == other.id
    }
}

/// Self-registration payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    /// Requested role; absent means USER
    #[serde(default)]
    pub role: Option<Role>,
}

/// New identity creation payload, password already hashed
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub phone: String,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Profile fields an update may touch. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.address.is_none()
            && self.phone.is_none()
            && self.gender.is_none()
    }
}

/// Privileged update payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityChanges {
    #[serde(flatten)]
    pub profile: ProfileChanges,
    #[serde(default)]
    pub role: Option<Role>,
}

impl IdentityChanges {
    pub fn is_empty(&self) -> bool {
        self.profile.is_empty() && self.role.is_none()
    }
}
