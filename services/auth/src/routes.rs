//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::AuthError,
    guard,
    middleware::{CurrentIdentity, auth_middleware},
    models::{IdentityChanges, RegistrationRequest, Role},
    state::AppState,
    validation,
};

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/users/me", get(current_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Role named in a raw registration body, if it is a known one
fn requested_role(body: &Value) -> Option<Role> {
    body.get("role")?.as_str()?.parse().ok()
}

/// Self-registration endpoint
///
/// The requested role is checked before the rest of the body is parsed, so
/// asking for ADMIN is refused whatever else the payload holds.
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<Value>, AuthError>,
) -> Result<impl IntoResponse, AuthError> {
    if let Some(role) = requested_role(&body) {
        guard::authorize_registration(role)
            .into_result()
            .inspect_err(|_| warn!("Registration requesting {} refused", role))?;
    }

    let request: RegistrationRequest =
        serde_json::from_value(body).map_err(|e| AuthError::Validation(e.to_string()))?;
    let identity = state.accounts.register(request).await?;

    Ok((StatusCode::CREATED, Json(identity)))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AuthError>,
) -> Result<impl IntoResponse, AuthError> {
    // No account can own a malformed number; reject before it is tracked
    if validation::validate_phone(&payload.phone).is_err() {
        debug!("Login rejected for malformed phone number");
        return Err(AuthError::InvalidCredentials);
    }

    if !state.rate_limiter.is_allowed(&payload.phone).await {
        return Err(AuthError::TooManyAttempts);
    }

    debug!("Login attempt for phone: {}", payload.phone);
    let session = state
        .accounts
        .login(&payload.phone, &payload.password)
        .await?;
    state.rate_limiter.reset(&payload.phone).await;

    Ok((StatusCode::OK, Json(session)))
}

/// Identity behind the presented token
pub async fn current_user(
    Extension(CurrentIdentity(identity)): Extension<CurrentIdentity>,
) -> impl IntoResponse {
    Json(identity)
}

/// Read one identity; others are visible to ADMIN only
pub async fn get_user(
    State(state): State<AppState>,
    Extension(CurrentIdentity(acting)): Extension<CurrentIdentity>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AuthError>,
) -> Result<impl IntoResponse, AuthError> {
    let identity = state.accounts.get_identity(&acting, id).await?;

    Ok(Json(identity))
}

/// Privileged update of an identity's profile and role
pub async fn update_user(
    State(state): State<AppState>,
    Extension(CurrentIdentity(acting)): Extension<CurrentIdentity>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AuthError>,
    WithRejection(Json(changes), _): WithRejection<Json<IdentityChanges>, AuthError>,
) -> Result<impl IntoResponse, AuthError> {
    let updated = state.accounts.update_identity(&acting, id, changes).await?;

    Ok(Json(updated))
}

/// Remove an identity; ADMIN only
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(CurrentIdentity(acting)): Extension<CurrentIdentity>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AuthError>,
) -> Result<impl IntoResponse, AuthError> {
    state.accounts.delete_identity(&acting, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
