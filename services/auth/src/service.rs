//! Account workflows: registration, login and privileged reads, updates and
//! deletions
//!
//! Each workflow runs the core components in order and delegates the
//! actual persistence to the identity store.

use chrono::{DateTime, Utc};
use common::error::DatabaseError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    guard::{self, Action},
    models::{Identity, IdentityChanges, NewIdentity, RegistrationRequest, Role},
    password,
    repositories::IdentityStore,
    token::TokenCodec,
    validation,
};

/// Token handed out on successful login
#[derive(Debug, Clone, Serialize)]
pub struct SessionToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
}

/// Account workflows over an identity store
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn IdentityStore>,
    codec: Arc<TokenCodec>,
}

fn conflict_on_duplicate(error: DatabaseError) -> AuthError {
    match error {
        DatabaseError::UniqueViolation(_) => AuthError::PhoneAlreadyRegistered,
        other => AuthError::Database(other),
    }
}

impl AccountService {
    /// Create a new account service
    pub fn new(store: Arc<dyn IdentityStore>, codec: Arc<TokenCodec>) -> Self {
        Self { store, codec }
    }

    /// Self-register a new identity.
    ///
    /// Requesting ADMIN is refused before any other input is looked at.
    pub async fn register(&self, request: RegistrationRequest) -> AuthResult<Identity> {
        let requested_role = request.role.unwrap_or_default();
        guard::authorize_registration(requested_role)
            .into_result()
            .inspect_err(|_| warn!("Registration requesting {} refused", requested_role))?;

        validation::validate_registration(&request).map_err(AuthError::Validation)?;

        if self.store.exists_by_key(&request.phone).await? {
            return Err(AuthError::PhoneAlreadyRegistered);
        }

        let password_hash = password::hash_password(&request.password)?;
        let identity = self
            .store
            .insert(NewIdentity {
                phone: request.phone,
                name: request.name,
                email: request.email,
                address: request.address,
                gender: request.gender,
                password_hash,
                role: requested_role,
            })
            .await
            .map_err(conflict_on_duplicate)?;

        info!("Registered user {}", identity.id);
        Ok(identity)
    }

    /// Check credentials and issue a session token
    pub async fn login(&self, phone: &str, secret: &str) -> AuthResult<SessionToken> {
        self.login_at(phone, secret, Utc::now()).await
    }

    /// Check credentials and issue a session token starting at `now`.
    ///
    /// Unknown phone numbers and wrong passwords fail identically.
    pub async fn login_at(
        &self,
        phone: &str,
        secret: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<SessionToken> {
        let identity = match self.store.find_by_key(phone).await? {
            Some(identity) if password::verify_password(secret, &identity.password_hash) => {
                identity
            }
            Some(_) => return Err(AuthError::InvalidCredentials),
            None => {
                password::verify_against_dummy(secret);
                return Err(AuthError::InvalidCredentials);
            }
        };

        let issued = self.codec.issue(&identity.phone, now)?;
        let expires_at = issued
            .claims
            .expires_at()
            .ok_or_else(|| AuthError::TokenIssue("expiry out of range".to_string()))?;

        info!("User {} logged in", identity.id);
        Ok(SessionToken {
            access_token: issued.token,
            token_type: "Bearer".to_string(),
            expires_in: self.codec.expires_in(),
            expires_at,
        })
    }

    /// Apply `changes` to the identity `target_id` on behalf of `acting`.
    ///
    /// `acting` must have been resolved for this request.
    pub async fn update_identity(
        &self,
        acting: &Identity,
        target_id: Uuid,
        changes: IdentityChanges,
    ) -> AuthResult<Identity> {
        if changes.is_empty() {
            return Err(AuthError::Validation("No fields to update".to_string()));
        }

        let target = self.load_target(acting, target_id).await?;

        if !changes.profile.is_empty() {
            guard::authorize(acting, Action::UpdateProfile, Some(&target)).into_result()?;
        }
        if let Some(role) = changes.role {
            guard::authorize(acting, Action::ChangeRole(role), Some(&target)).into_result()?;
        }

        validation::validate_profile_changes(&changes.profile).map_err(AuthError::Validation)?;

        if let Some(phone) = &changes.profile.phone {
            if *phone != target.phone && self.store.exists_by_key(phone).await? {
                return Err(AuthError::PhoneAlreadyRegistered);
            }
        }

        let updated = self
            .store
            .update(target.id, &changes)
            .await
            .map_err(conflict_on_duplicate)?
            .ok_or(AuthError::IdentityNotFound)?;

        if let Some(role) = changes.role {
            if role != target.role {
                info!(
                    "User {} changed role of user {} from {} to {}",
                    acting.id, updated.id, target.role, role
                );
            }
        }
        info!("User {} updated user {}", acting.id, updated.id);

        Ok(updated)
    }

    /// Fetch the identity `target_id` on behalf of `acting`
    pub async fn get_identity(&self, acting: &Identity, target_id: Uuid) -> AuthResult<Identity> {
        let target = self.load_target(acting, target_id).await?;
        guard::authorize(acting, Action::ViewIdentity, Some(&target)).into_result()?;

        Ok(target)
    }

    /// Delete the identity `target_id` on behalf of `acting`.
    ///
    /// Tokens already issued to the deleted identity stop resolving.
    pub async fn delete_identity(&self, acting: &Identity, target_id: Uuid) -> AuthResult<()> {
        let target = self.load_target(acting, target_id).await?;
        guard::authorize(acting, Action::DeleteIdentity, Some(&target)).into_result()?;

        if !self.store.delete(target.id).await? {
            return Err(AuthError::IdentityNotFound);
        }

        info!("User {} deleted user {}", acting.id, target.id);
        Ok(())
    }

    async fn load_target(&self, acting: &Identity, target_id: Uuid) -> AuthResult<Identity> {
        if target_id == acting.id {
            return Ok(acting.clone());
        }

        match self.store.find_by_id(target_id).await? {
            Some(target) => Ok(target),
            None if acting.role.is_admin() => Err(AuthError::IdentityNotFound),
            // Non-admins learn nothing about other identities
            None => Err(AuthError::InsufficientRole),
        }
    }

    /// Seed an ADMIN identity from operator configuration.
    ///
    /// Returns `None` when the phone number is already registered.
    pub async fn bootstrap_admin(
        &self,
        phone: &str,
        secret: &str,
        name: &str,
    ) -> AuthResult<Option<Identity>> {
        if self.store.exists_by_key(phone).await? {
            return Ok(None);
        }

        validation::validate_phone(phone).map_err(AuthError::Validation)?;
        validation::validate_password(secret).map_err(AuthError::Validation)?;
        validation::validate_name(name).map_err(AuthError::Validation)?;

        let password_hash = password::hash_password(secret)?;
        let identity = self
            .store
            .insert(NewIdentity {
                phone: phone.to_string(),
                name: name.to_string(),
                email: None,
                address: None,
                gender: None,
                password_hash,
                role: Role::Admin,
            })
            .await
            .map_err(conflict_on_duplicate)?;

        info!("Bootstrapped admin user {}", identity.id);
        Ok(Some(identity))
    }
}
