//! HTTP surface exercised through the router without a listener

use std::sync::Arc;

use auth::{
    AppState,
    models::{NewIdentity, Role},
    password,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{IdentityStore, InMemoryIdentityStore},
    routes::create_router,
    token::{TokenCodec, TokenConfig},
};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app_with_limit(max_attempts: u32) -> (Router, Arc<InMemoryIdentityStore>) {
    let store = Arc::new(InMemoryIdentityStore::new());
    let codec = Arc::new(
        TokenCodec::new(&TokenConfig {
            secret: "http-api-test-secret-0123456789abcdef".to_string(),
            token_expiry: 3600,
        })
        .unwrap(),
    );
    let rate_limiter = RateLimiter::new(RateLimiterConfig {
        max_attempts,
        ..Default::default()
    });

    let state = AppState::new(store.clone(), codec, rate_limiter);
    (create_router(state), store)
}

fn app() -> (Router, Arc<InMemoryIdentityStore>) {
    app_with_limit(5)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    empty_request("GET", uri, token)
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn register(app: &Router, phone: &str) -> Value {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({ "name": "Lan", "phone": phone, "password": "correct" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn login(app: &Router, phone: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "phone": phone, "password": password }),
        ),
    )
    .await
}

async fn token_for(app: &Router, phone: &str) -> String {
    let (status, body) = login(app, phone, "correct").await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(&app, get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_hides_password_hash() {
    let (app, _) = app();
    let body = register(&app, "0900000001").await;

    assert_eq!(body["phone"], "0900000001");
    assert_eq!(body["role"], "USER");
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_register_as_admin_is_forbidden() {
    let (app, store) = app();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({ "name": "Eve", "phone": "0900000666", "password": "correct", "role": "ADMIN" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_register_as_admin_is_forbidden_in_any_case() {
    let (app, store) = app();

    for role in ["admin", "Admin", "aDmIn"] {
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/auth/register",
                None,
                json!({ "name": "Eve", "phone": "0900000666", "password": "correct", "role": role }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "role {role}");
        assert_eq!(body["code"], "FORBIDDEN");
    }

    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_register_as_admin_is_forbidden_with_incomplete_payload() {
    let (app, store) = app();

    for payload in [
        json!({ "phone": "0900000666", "role": "ADMIN" }),
        json!({ "role": "admin" }),
        json!({ "name": 42, "phone": "bad", "role": "Admin" }),
    ] {
        let (status, body) = send(
            &app,
            json_request("POST", "/auth/register", None, payload),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
    }

    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_register_accepts_lowercase_user_role() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({ "name": "Lan", "phone": "0900000001", "password": "correct", "role": "user" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "USER");
}

#[tokio::test]
async fn test_unreadable_bodies_get_a_stable_code() {
    let (app, _) = app();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({ "phone": "0900000001" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let broken = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"phone\":"))
        .unwrap();
    let (status, body) = send(&app, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_malformed_update_gets_a_stable_code() {
    let (app, _) = app();
    let me = register(&app, "0900000001").await;
    let token = token_for(&app, "0900000001").await;
    let uri = format!("/users/{}", me["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        json_request("PUT", &uri, Some(&token), json!({ "role": "superadmin" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = send(
        &app,
        json_request("PUT", "/users/not-a-uuid", Some(&token), json!({ "name": "Lan" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    // a lowercase role is read like an uppercase one
    let (status, body) = send(
        &app,
        json_request("PUT", &uri, Some(&token), json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let (app, _) = app();
    register(&app, "0900000001").await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({ "name": "Lan", "phone": "0900000001", "password": "correct" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_and_fetch_current_user() {
    let (app, _) = app();
    let registered = register(&app, "0900000001").await;

    let (status, session) = login(&app, "0900000001", "correct").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["token_type"], "Bearer");
    assert_eq!(session["expires_in"], 3600);

    let token = session["access_token"].as_str().unwrap();
    let (status, me) = send(&app, get("/users/me", Some(token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], registered["id"]);
}

#[tokio::test]
async fn test_login_failures_share_one_response() {
    let (app, _) = app();
    register(&app, "0900000001").await;

    let wrong_password = login(&app, "0900000001", "incorrect").await;
    let unknown_phone = login(&app, "0900000009", "correct").await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_phone);
}

#[tokio::test]
async fn test_protected_routes_need_a_valid_token() {
    let (app, _) = app();

    let (status, body) = send(&app, get("/users/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, _) = send(&app, get("/users/me", Some("not-a-token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_of_deleted_user_is_rejected() {
    let (app, store) = app();
    let registered = register(&app, "0900000001").await;
    let token = token_for(&app, "0900000001").await;

    let id = registered["id"].as_str().unwrap().parse().unwrap();
    assert!(store.delete(id).await.unwrap());

    let (status, _) = send(&app, get("/users/me", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_updates_self_but_not_others() {
    let (app, _) = app();
    let me = register(&app, "0900000001").await;
    let other = register(&app, "0900000002").await;
    let token = token_for(&app, "0900000001").await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{}", me["id"].as_str().unwrap()),
            Some(&token),
            json!({ "name": "Lan Nguyen" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Lan Nguyen");

    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{}", other["id"].as_str().unwrap()),
            Some(&token),
            json!({ "role": "ADMIN" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{}", me["id"].as_str().unwrap()),
            Some(&token),
            json!({ "role": "ADMIN" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

async fn seed_admin(store: &InMemoryIdentityStore, phone: &str) -> Value {
    let admin = store
        .insert(NewIdentity {
            phone: phone.to_string(),
            name: "Admin".to_string(),
            email: None,
            address: None,
            gender: None,
            password_hash: password::hash_password("correct").unwrap(),
            role: Role::Admin,
        })
        .await
        .unwrap();
    serde_json::to_value(admin).unwrap()
}

#[tokio::test]
async fn test_admin_promotes_another_user() {
    let (app, store) = app();
    seed_admin(&store, "0900000000").await;
    let user = register(&app, "0900000001").await;
    let token = token_for(&app, "0900000000").await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{}", user["id"].as_str().unwrap()),
            Some(&token),
            json!({ "role": "ADMIN" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "ADMIN");
}

#[tokio::test]
async fn test_repeated_login_failures_are_throttled() {
    let (app, _) = app_with_limit(2);
    register(&app, "0900000001").await;

    assert_eq!(
        login(&app, "0900000001", "incorrect").await.0,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login(&app, "0900000001", "incorrect").await.0,
        StatusCode::UNAUTHORIZED
    );

    let (status, body) = login(&app, "0900000001", "correct").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "TOO_MANY_REQUESTS");
}

#[tokio::test]
async fn test_get_user_self_or_admin() {
    let (app, store) = app();
    let admin = seed_admin(&store, "0900000000").await;
    let user = register(&app, "0900000001").await;
    let user_token = token_for(&app, "0900000001").await;
    let admin_token = token_for(&app, "0900000000").await;
    let user_uri = format!("/users/{}", user["id"].as_str().unwrap());
    let admin_uri = format!("/users/{}", admin["id"].as_str().unwrap());

    let (status, body) = send(&app, get(&user_uri, Some(&user_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user["id"]);

    let (status, _) = send(&app, get(&admin_uri, Some(&user_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, get(&user_uri, Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_admin_deletion_invalidates_existing_token() {
    let (app, store) = app();
    seed_admin(&store, "0900000000").await;
    let user = register(&app, "0900000001").await;
    let other = register(&app, "0900000002").await;
    let user_token = token_for(&app, "0900000001").await;
    let admin_token = token_for(&app, "0900000000").await;
    let user_uri = format!("/users/{}", user["id"].as_str().unwrap());
    let other_uri = format!("/users/{}", other["id"].as_str().unwrap());

    let (status, _) = send(&app, empty_request("DELETE", &other_uri, Some(&user_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, get("/users/me", Some(&user_token))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, empty_request("DELETE", &user_uri, Some(&admin_token))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, get("/users/me", Some(&user_token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, body) = send(&app, empty_request("DELETE", &user_uri, Some(&admin_token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_phones_are_not_tracked_by_throttling() {
    let (app, _) = app_with_limit(1);

    for i in 0..5 {
        let (status, body) = login(&app, &format!("junk-{i}"), "whatever").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");
    }
    for _ in 0..3 {
        let (status, _) = login(&app, "not a phone", "whatever").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
