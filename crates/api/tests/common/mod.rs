// All functions in this module are shared test helpers. Not every test
// binary uses every helper, so we suppress dead_code warnings at the module
// level.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use huddle_api::auth::jwt::TokenSigner;
use huddle_api::config::{AuthConfig, JwtConfig, RoomsConfig, ServerConfig};
use huddle_api::router::build_app_router;
use huddle_api::state::AppState;
use huddle_api::ws::RoomHub;

/// RSA key pair used only by tests.
pub const TEST_PRIVATE_PEM: &str = include_str!("../fixtures/jwt_test_key.pem");
pub const TEST_PUBLIC_PEM: &str = include_str!("../fixtures/jwt_test_key.pub.pem");

/// Build a test `ServerConfig` with safe defaults and the test key pair.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_grace_secs: 10,
        auth: AuthConfig {
            jwt: JwtConfig {
                private_key_pem: TEST_PRIVATE_PEM.to_string(),
                public_key_pem: TEST_PUBLIC_PEM.to_string(),
                ..JwtConfig::default()
            },
            ..AuthConfig::default()
        },
        rooms: RoomsConfig::default(),
    }
}

/// Build the full application router plus its state, sharing the exact
/// middleware stack production uses.
pub fn build_test_state_and_app(pool: PgPool) -> (AppState, Router) {
    let config = test_config();
    let signer = TokenSigner::from_config(&config.auth.jwt).expect("test keys should parse");
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        signer: Arc::new(signer),
        hub: Arc::new(RoomHub::new()),
    };
    let app = build_app_router(state.clone(), &config);
    (state, app)
}

/// Build just the application router.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_state_and_app(pool).1
}

// ---------------------------------------------------------------------------
// Shared HTTP test helpers
// ---------------------------------------------------------------------------

/// Collect the response body into a `serde_json::Value`.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Send a JSON request with the given HTTP method.
pub async fn send_json(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> axum::response::Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST JSON to the given URI and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: serde_json::Value,
) -> axum::response::Response {
    send_json(app, Method::POST, uri, body).await
}

/// GET from the given URI.
pub async fn get(app: Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

// ---------------------------------------------------------------------------
// Authenticated HTTP test helpers
// ---------------------------------------------------------------------------

/// A registered user with a minted access token, as the headers expect it.
#[derive(Debug, Clone)]
pub struct Authed {
    pub user_id: i64,
    pub token: String,
}

/// Send a JSON request carrying `Authorization` and `X-User-ID`.
pub async fn send_json_auth(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
    auth: &Authed,
) -> axum::response::Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", auth.token))
        .header("x-user-id", auth.user_id.to_string())
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST JSON with credentials.
pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    auth: &Authed,
) -> axum::response::Response {
    send_json_auth(app, Method::POST, uri, body, auth).await
}

/// GET with credentials.
pub async fn get_auth(app: Router, uri: &str, auth: &Authed) -> axum::response::Response {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {}", auth.token))
        .header("x-user-id", auth.user_id.to_string())
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// DELETE with credentials.
pub async fn delete_auth(app: Router, uri: &str, auth: &Authed) -> axum::response::Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("authorization", format!("Bearer {}", auth.token))
        .header("x-user-id", auth.user_id.to_string())
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

// ---------------------------------------------------------------------------
// Auth-flow helpers
// ---------------------------------------------------------------------------

/// Register a user through the API and return the full response JSON.
pub async fn register_json(app: Router, email: &str, password: &str) -> serde_json::Value {
    let body = serde_json::json!({ "email": email, "password": password });
    let response = post_json(app, "/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

/// Register a user and return ready-to-use credentials.
pub async fn register_user(app: Router, email: &str, password: &str) -> Authed {
    let json = register_json(app, email, password).await;
    Authed {
        user_id: json["user"]["id"].as_i64().expect("user id"),
        token: json["access_token"].as_str().expect("access token").to_string(),
    }
}

/// Shorthand for the error code inside the response envelope.
pub fn error_code(json: &serde_json::Value) -> &str {
    json["error"]["code"].as_str().unwrap_or_default()
}
