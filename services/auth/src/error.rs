//! Error kinds reported by the identity and access-control core
//!
//! Every failure carries a stable, enumerable kind. HTTP callers see a
//! generic message per category; the specific kind is logged.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Failure decoding a session token
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// The token could not be parsed as a signed token
    #[error("token is malformed")]
    Malformed,

    /// The signature does not verify against the signing secret
    #[error("token signature is invalid")]
    BadSignature,

    /// The current time is at or past the token expiry
    #[error("token has expired")]
    Expired,
}

/// Authentication and authorization failures
#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown phone number or wrong password, never distinguished
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No bearer token was presented
    #[error("missing bearer token")]
    MissingToken,

    #[error("token is malformed")]
    TokenMalformed,

    #[error("token signature is invalid")]
    TokenBadSignature,

    #[error("token has expired")]
    TokenExpired,

    /// The token is valid but its subject no longer exists
    #[error("identity referenced by the token no longer exists")]
    IdentityGone,

    /// The acting identity lacks the role required by the action
    #[error("insufficient role for the requested action")]
    InsufficientRole,

    /// An identity tried to grant itself the ADMIN role
    #[error("self elevation to ADMIN is forbidden")]
    SelfElevationForbidden,

    /// The phone number already belongs to an identity
    #[error("phone number already registered")]
    PhoneAlreadyRegistered,

    /// The target of a privileged update does not exist
    #[error("identity not found")]
    IdentityNotFound,

    /// Input rejected by validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Login throttled for this phone number
    #[error("too many login attempts")]
    TooManyAttempts,

    /// The password hasher failed (not a mismatch)
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// Signing a new token failed
    #[error("token issuance failed: {0}")]
    TokenIssue(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// How a failure is surfaced to the outside world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Re-authenticate
    Unauthenticated,
    Forbidden,
    BadRequest,
    Conflict,
    NotFound,
    Throttled,
    Internal,
}

impl ErrorCategory {
    /// Stable code returned to HTTP clients
    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::Unauthenticated => "UNAUTHENTICATED",
            ErrorCategory::Forbidden => "FORBIDDEN",
            ErrorCategory::BadRequest => "BAD_REQUEST",
            ErrorCategory::Conflict => "CONFLICT",
            ErrorCategory::NotFound => "NOT_FOUND",
            ErrorCategory::Throttled => "TOO_MANY_REQUESTS",
            ErrorCategory::Internal => "INTERNAL",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            ErrorCategory::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCategory::Forbidden => StatusCode::FORBIDDEN,
            ErrorCategory::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCategory::Conflict => StatusCode::CONFLICT,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Throttled => StatusCode::TOO_MANY_REQUESTS,
            ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AuthError {
    /// Stable machine-readable kind
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::TokenMalformed => "TOKEN_MALFORMED",
            AuthError::TokenBadSignature => "TOKEN_BAD_SIGNATURE",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::IdentityGone => "IDENTITY_GONE",
            AuthError::InsufficientRole => "INSUFFICIENT_ROLE",
            AuthError::SelfElevationForbidden => "SELF_ELEVATION_FORBIDDEN",
            AuthError::PhoneAlreadyRegistered => "PHONE_ALREADY_REGISTERED",
            AuthError::IdentityNotFound => "IDENTITY_NOT_FOUND",
            AuthError::Validation(_) => "VALIDATION_FAILED",
            AuthError::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            AuthError::PasswordHash(_) => "PASSWORD_HASH_FAILED",
            AuthError::TokenIssue(_) => "TOKEN_ISSUE_FAILED",
            AuthError::Database(_) => "DATABASE_ERROR",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::TokenMalformed
            | AuthError::TokenBadSignature
            | AuthError::TokenExpired
            | AuthError::IdentityGone => ErrorCategory::Unauthenticated,
            AuthError::InsufficientRole | AuthError::SelfElevationForbidden => {
                ErrorCategory::Forbidden
            }
            AuthError::Validation(_) => ErrorCategory::BadRequest,
            AuthError::PhoneAlreadyRegistered => ErrorCategory::Conflict,
            AuthError::IdentityNotFound => ErrorCategory::NotFound,
            AuthError::TooManyAttempts => ErrorCategory::Throttled,
            AuthError::PasswordHash(_) | AuthError::TokenIssue(_) => ErrorCategory::Internal,
            AuthError::Database(DatabaseError::UniqueViolation(_)) => ErrorCategory::Conflict,
            AuthError::Database(_) => ErrorCategory::Internal,
        }
    }

    /// Message safe to show to an end user.
    ///
    /// Authentication failures stay generic; expired sessions get their own
    /// wording so clients can prompt for a fresh login.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Invalid phone number or password".to_string(),
            AuthError::TokenExpired => "Session expired, please log in again".to_string(),
            AuthError::MissingToken
            | AuthError::TokenMalformed
            | AuthError::TokenBadSignature
            | AuthError::IdentityGone => "Invalid session, please log in again".to_string(),
            AuthError::InsufficientRole | AuthError::SelfElevationForbidden => {
                "Forbidden".to_string()
            }
            AuthError::PhoneAlreadyRegistered => "Phone number already registered".to_string(),
            AuthError::IdentityNotFound => "User not found".to_string(),
            AuthError::Validation(message) => message.clone(),
            AuthError::TooManyAttempts => {
                "Too many login attempts, please try again later".to_string()
            }
            AuthError::PasswordHash(_) | AuthError::TokenIssue(_) => {
                "Internal server error".to_string()
            }
            AuthError::Database(DatabaseError::UniqueViolation(_)) => {
                "Phone number already registered".to_string()
            }
            AuthError::Database(_) => "Internal server error".to_string(),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Malformed => AuthError::TokenMalformed,
            TokenError::BadSignature => AuthError::TokenBadSignature,
            TokenError::Expired => AuthError::TokenExpired,
        }
    }
}

/// Unreadable request bodies are reported like any other invalid input
impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AuthError {
    fn from(rejection: PathRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let category = self.category();

        if category == ErrorCategory::Internal {
            error!(code = self.code(), "Request failed: {}", self);
        } else {
            warn!(code = self.code(), "Request rejected");
        }

        let body = Json(json!({
            "error": self.public_message(),
            "code": category.code(),
        }));

        (category.status(), body).into_response()
    }
}

/// Type alias for results of the identity core
pub type AuthResult<T> = Result<T, AuthError>;
