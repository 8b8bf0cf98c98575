//! Authorization guard
//!
//! Pure role-based decisions over a closed policy table. The acting identity
//! is always passed in explicitly.
//!
//! | Action                         | Rule                                              |
//! |--------------------------------|---------------------------------------------------|
//! | view own identity              | allowed                                           |
//! | view another identity          | ADMIN only                                        |
//! | delete an identity             | ADMIN only                                        |
//! | update own profile             | allowed                                           |
//! | update another's profile       | ADMIN only                                        |
//! | change another's role          | ADMIN only                                        |
//! | assign ADMIN to oneself        | ADMIN only, otherwise `SelfElevationForbidden`    |
//! | self-registration as ADMIN     | always `SelfElevationForbidden`                   |

use crate::{
    error::AuthError,
    models::{Identity, Role},
};

/// Privileged action requested by an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read an identity's profile
    ViewIdentity,
    /// Remove an identity
    DeleteIdentity,
    /// Change name, email, address, phone or gender
    UpdateProfile,
    /// Assign the given role
    ChangeRole(Role),
    /// Self-registration asking for the given role
    Register(Role),
}

/// Why an action was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    InsufficientRole,
    SelfElevationForbidden,
}

impl DenyReason {
    pub fn code(self) -> &'static str {
        match self {
            DenyReason::InsufficientRole => "INSUFFICIENT_ROLE",
            DenyReason::SelfElevationForbidden => "SELF_ELEVATION_FORBIDDEN",
        }
    }
}

/// Outcome of an authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Allow,
    Deny(DenyReason),
}

impl AuthorizationDecision {
    pub fn is_allowed(self) -> bool {
        self == AuthorizationDecision::Allow
    }

    /// Turn a denial into the matching error kind
    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            AuthorizationDecision::Allow => Ok(()),
            AuthorizationDecision::Deny(DenyReason::InsufficientRole) => {
                Err(AuthError::InsufficientRole)
            }
            AuthorizationDecision::Deny(DenyReason::SelfElevationForbidden) => {
                Err(AuthError::SelfElevationForbidden)
            }
        }
    }
}

/// Decide whether `acting` may perform `action` on `target`.
///
/// A missing target means the action applies to the acting identity itself.
pub fn authorize(
    acting: &Identity,
    action: Action,
    target: Option<&Identity>,
) -> AuthorizationDecision {
    let on_self = target.is_none_or(|target| acting.is_same(target));

    match action {
        Action::Register(requested) => authorize_registration(requested),
        Action::ViewIdentity if on_self || acting.role.is_admin() => AuthorizationDecision::Allow,
        Action::ViewIdentity => AuthorizationDecision::Deny(DenyReason::InsufficientRole),
        Action::DeleteIdentity if acting.role.is_admin() => AuthorizationDecision::Allow,
        Action::DeleteIdentity => AuthorizationDecision::Deny(DenyReason::InsufficientRole),
        Action::UpdateProfile if on_self || acting.role.is_admin() => AuthorizationDecision::Allow,
        Action::UpdateProfile => AuthorizationDecision::Deny(DenyReason::InsufficientRole),
        Action::ChangeRole(_) if acting.role.is_admin() => AuthorizationDecision::Allow,
        Action::ChangeRole(Role::Admin) if on_self => {
            AuthorizationDecision::Deny(DenyReason::SelfElevationForbidden)
        }
        // Re-assigning one's current role is a no-op
        Action::ChangeRole(role) if on_self && role == acting.role => AuthorizationDecision::Allow,
        Action::ChangeRole(_) => AuthorizationDecision::Deny(DenyReason::InsufficientRole),
    }
}

/// Registration rule: no authenticated actor exists yet, and ADMIN can never
/// be self-assigned.
pub fn authorize_registration(requested: Role) -> AuthorizationDecision {
    match requested {
        Role::User => AuthorizationDecision::Allow,
        Role::Admin => AuthorizationDecision::Deny(DenyReason::SelfElevationForbidden),
    }
}
