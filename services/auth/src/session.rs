//! Session resolution
//!
//! Turns a presented token into the identity acting on the request. The
//! identity is loaded from the credential store on every call so that role
//! changes and deletions take effect on the very next request.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    error::{AuthError, AuthResult},
    models::Identity,
    repositories::CredentialStore,
    token::TokenCodec,
};

/// Resolves session tokens to current identities
#[derive(Clone)]
pub struct SessionResolver {
    codec: Arc<TokenCodec>,
    store: Arc<dyn CredentialStore>,
}

impl SessionResolver {
    /// Create a new session resolver
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn CredentialStore>) -> Self {
        Self { codec, store }
    }

    /// Resolve `token` against the current wall clock
    pub async fn resolve(&self, token: &str) -> AuthResult<Identity> {
        self.resolve_at(token, Utc::now()).await
    }

    /// Resolve `token` as seen at `now`
    pub async fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Identity> {
        let claims = self.codec.decode(token, now).map_err(|e| {
            warn!("Session token rejected: {}", e);
            AuthError::from(e)
        })?;

        match self.store.find_by_key(&claims.sub).await? {
            Some(identity) => {
                debug!("Resolved session for user {}", identity.id);
                Ok(identity)
            }
            None => {
                warn!("Session token subject no longer exists");
                Err(AuthError::IdentityGone)
            }
        }
    }
}
