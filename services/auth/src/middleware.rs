//! Middleware resolving the acting identity from the bearer token

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{error::AuthError, models::Identity, state::AppState};

/// Identity resolved for the current request
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

/// Resolve the bearer token on every request and expose the identity to
/// handlers as a [`CurrentIdentity`] extension
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::MissingToken)?;

    let identity = state.sessions.resolve(bearer.token()).await?;

    req.extensions_mut().insert(CurrentIdentity(identity));

    Ok(next.run(req).await)
}
