//! In-memory identity store for tests and local runs

use async_trait::async_trait;
use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, IdentityStore};
use crate::models::{Identity, IdentityChanges, NewIdentity};

/// Identities kept in a map keyed by id
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityStore {
    identities: Arc<RwLock<HashMap<Uuid, Identity>>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored identities
    pub async fn len(&self) -> usize {
        self.identities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.identities.read().await.is_empty()
    }
}

fn phone_taken(identities: &HashMap<Uuid, Identity>, phone: &str, except: Option<Uuid>) -> bool {
    identities
        .values()
        .any(|identity| identity.phone == phone && Some(identity.id) != except)
}

#[async_trait]
impl CredentialStore for InMemoryIdentityStore {
    async fn find_by_key(&self, key: &str) -> DatabaseResult<Option<Identity>> {
        let identities = self.identities.read().await;
        Ok(identities
            .values()
            .find(|identity| identity.phone == key)
            .cloned())
    }

    async fn exists_by_key(&self, key: &str) -> DatabaseResult<bool> {
        let identities = self.identities.read().await;
        Ok(phone_taken(&identities, key, None))
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Identity>> {
        Ok(self.identities.read().await.get(&id).cloned())
    }

    async fn insert(&self, new_identity: NewIdentity) -> DatabaseResult<Identity> {
        let mut identities = self.identities.write().await;
        if phone_taken(&identities, &new_identity.phone, None) {
            return Err(DatabaseError::UniqueViolation("users_phone_key".to_string()));
        }

        let now = Utc::now();
        let identity = Identity {
            id: Uuid::new_v4(),
            phone: new_identity.phone,
            name: new_identity.name,
            email: new_identity.email,
            address: new_identity.address,
            gender: new_identity.gender,
            password_hash: new_identity.password_hash,
            role: new_identity.role,
            created_at: now,
            updated_at: now,
        };
        identities.insert(identity.id, identity.clone());

        Ok(identity)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &IdentityChanges,
    ) -> DatabaseResult<Option<Identity>> {
        let mut identities = self.identities.write().await;
        if let Some(phone) = &changes.profile.phone {
            if phone_taken(&identities, phone, Some(id)) {
                return Err(DatabaseError::UniqueViolation("users_phone_key".to_string()));
            }
        }

        let Some(identity) = identities.get_mut(&id) else {
            return Ok(None);
        };

        let profile = &changes.profile;
        if let Some(name) = &profile.name {
            identity.name = name.clone();
        }
        if let Some(email) = &profile.email {
            identity.email = Some(email.clone());
        }
        if let Some(address) = &profile.address {
            identity.address = Some(address.clone());
        }
        if let Some(phone) = &profile.phone {
            identity.phone = phone.clone();
        }
        if let Some(gender) = &profile.gender {
            identity.gender = Some(gender.clone());
        }
        if let Some(role) = changes.role {
            identity.role = role;
        }
        identity.updated_at = Utc::now();

        Ok(Some(identity.clone()))
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        Ok(self.identities.write().await.remove(&id).is_some())
    }
}
