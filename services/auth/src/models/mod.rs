//! Identity service models

pub mod identity;
pub mod role;

// Re-export for convenience
pub use identity::{Identity, IdentityChanges, NewIdentity, ProfileChanges, RegistrationRequest};
pub use role::Role;
