#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::Value;
use std::collections::HashMap;
use tower::ServiceExt;

use owlstore::api;
use owlstore::auth::{hash_password, issue_token_pair};
use owlstore::config::Config;
use owlstore::db;
use owlstore::domain::NewUser;
use owlstore::infrastructure::AppState;
use owlstore::models::user;
use owlstore::modules::integrations::oauth::default_endpoints;

pub const PASSWORD: &str = "correct-horse-9";

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        port: 0,
        cors_allowed_origins: Vec::new(),
        profile: "test".to_string(),
        frontend_url: "https://owls.test".to_string(),
        oauth_callback_url: "https://owls.test/auth/callback".to_string(),
        ghn_api_url: "http://127.0.0.1:9/unused".to_string(),
        ghn_api_token: None,
        rate_limit_per_minute: 1000,
        oauth_credentials: HashMap::new(),
        oauth_endpoints: default_endpoints(),
    }
}

pub async fn setup_with(config: Config) -> AppState {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    AppState::new(db, config)
}

pub async fn setup() -> AppState {
    setup_with(test_config()).await
}

/// The `/api` tree without the outer middleware stack.
pub fn app(state: &AppState) -> Router {
    Router::new().nest("/api", api::api_router(state.clone()))
}

pub async fn create_user(state: &AppState, email: &str, role: &str) -> (user::Model, String) {
    let user = state
        .user_repo
        .create(NewUser {
            email: email.to_string(),
            password_hash: Some(hash_password(PASSWORD).expect("hash")),
            first_name: "Lan".to_string(),
            last_name: "Nguyen".to_string(),
            role: role.to_string(),
            is_email_verified: true,
        })
        .await
        .expect("Failed to create user");
    let token = issue_token_pair(&user).expect("tokens").access_token;
    (user, token)
}

pub async fn customer(state: &AppState, email: &str) -> (user::Model, String) {
    create_user(state, email, user::ROLE_CUSTOMER).await
}

pub async fn admin(state: &AppState) -> (user::Model, String) {
    create_user(state, "admin@owls.test", user::ROLE_ADMIN).await
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, request("GET", uri, token, None)).await
}

pub async fn post(app: &Router, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    send(app, request("POST", uri, token, Some(body))).await
}

pub async fn patch(app: &Router, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    send(app, request("PATCH", uri, token, Some(body))).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, request("DELETE", uri, token, None)).await
}

pub fn order_body(unit_price: i64) -> Value {
    serde_json::json!({
        "items": [{
            "product_id": "owl-plush",
            "product_name": "Owl plush",
            "quantity": 2,
            "unit_price": unit_price,
        }],
        "shipping_fee": 30000,
        "recipient_name": "Lan Nguyen",
        "phone": "0901234567",
        "address": "12 Hang Bac, Hoan Kiem",
    })
}

/// Places a COD order for `token` and returns its JSON.
pub async fn place_order(app: &Router, token: &str) -> Value {
    let (status, body) = post(app, "/api/orders", Some(token), order_body(100_000)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}
