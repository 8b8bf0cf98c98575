//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    rate_limiter::RateLimiter, repositories::IdentityStore, service::AccountService,
    session::SessionResolver, token::TokenCodec,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub sessions: SessionResolver,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Wire the account service and the session resolver over one store
    pub fn new<S>(store: Arc<S>, codec: Arc<TokenCodec>, rate_limiter: RateLimiter) -> Self
    where
        S: IdentityStore + 'static,
    {
        Self {
            accounts: AccountService::new(store.clone(), codec.clone()),
            sessions: SessionResolver::new(codec, store),
            rate_limiter,
        }
    }
}
