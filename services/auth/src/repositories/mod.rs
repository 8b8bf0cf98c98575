//! Identity persistence
//!
//! The core only consumes [`CredentialStore`]; registration and privileged
//! updates go through the wider [`IdentityStore`].

use async_trait::async_trait;
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{Identity, IdentityChanges, NewIdentity};

pub mod memory;
pub mod user;

pub use memory::InMemoryIdentityStore;
pub use user::UserRepository;

/// Lookup of identities by subject key (phone number)
///
/// Implementations are the single source of truth for the current role and
/// password hash and must not cache.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find the identity owning `key`
    async fn find_by_key(&self, key: &str) -> DatabaseResult<Option<Identity>>;

    /// Whether any identity owns `key`
    async fn exists_by_key(&self, key: &str) -> DatabaseResult<bool>;
}

/// Full persistence collaborator for identities
#[async_trait]
pub trait IdentityStore: CredentialStore {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Identity>>;

    /// Persist a new identity. A duplicate phone number is reported as
    /// `DatabaseError::UniqueViolation`.
    async fn insert(&self, new_identity: NewIdentity) -> DatabaseResult<Identity>;

    /// Apply `changes` and return the updated identity, or `None` when the
    /// identity does not exist.
    async fn update(&self, id: Uuid, changes: &IdentityChanges)
        -> DatabaseResult<Option<Identity>>;

    /// Remove an identity; returns whether one was removed
    async fn delete(&self, id: Uuid) -> DatabaseResult<bool>;
}
