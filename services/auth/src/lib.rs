//! Identity and access control for the tour booking platform
//!
//! The core is four stateless components:
//!
//! - [`password`] hashes and verifies secrets,
//! - [`token`] issues and decodes signed, time-bounded session tokens,
//! - [`session`] resolves a token to the identity currently behind it,
//! - [`guard`] decides whether an identity may perform a privileged action.
//!
//! [`service::AccountService`] runs them for registration, login and
//! privileged updates, and [`routes`] exposes those workflows over HTTP.

pub mod config;
pub mod database;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod service;
pub mod session;
pub mod state;
pub mod token;
pub mod validation;

pub use error::{AuthError, AuthResult, TokenError};
pub use state::AppState;
