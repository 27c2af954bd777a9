mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};

use owlstore::server;

use common::{admin, app, customer, delete, get, post, send, setup, setup_with, test_config};

fn from_ip(method: &str, uri: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", ip)
        .header("user-agent", "Mozilla/5.0")
        .body(Body::empty())
        .unwrap()
}

async fn with_api_key(app: &Router, method: &str, uri: &str, key: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-API-Key", key);
    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    send(app, builder.body(body).unwrap()).await
}

#[tokio::test]
async fn test_api_key_lifecycle() {
    let state = setup().await;
    let app = app(&state);
    let (_, token) = customer(&state, "lan@example.vn").await;

    let (status, created) = post(
        &app,
        "/api/security/api-keys",
        Some(&token),
        json!({ "name": "Inventory sync" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["permission"], "read");
    let key = created["key"].as_str().unwrap().to_string();
    let id = created["id"].as_str().unwrap().to_string();

    let (status, me) = with_api_key(&app, "GET", "/api/auth/me", &key, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "lan@example.vn");

    // Read keys cannot write
    let (status, _) = with_api_key(
        &app,
        "PATCH",
        "/api/auth/me",
        &key,
        Some(json!({ "first_name": "Hacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, keys) = get(&app, "/api/security/api-keys", Some(&token)).await;
    assert_eq!(keys[0]["usage_count"], 2);
    assert!(keys[0].get("key").is_none());
    assert_eq!(keys[0]["key_prefix"], &key[..12]);

    let (status, _) = post(
        &app,
        "/api/security/api-keys",
        Some(&token),
        json!({ "name": "Root", "permission": "admin" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = delete(&app, &format!("/api/security/api-keys/{}", id), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = with_api_key(&app, "GET", "/api/auth/me", &key, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_overview_and_login_history() {
    let state = setup().await;
    let app = app(&state);
    let (_, token) = customer(&state, "lan@example.vn").await;

    post(
        &app,
        "/api/auth/login",
        None,
        json!({ "email": "lan@example.vn", "password": "nope-nope" }),
    )
    .await;
    post(
        &app,
        "/api/auth/login",
        None,
        json!({ "email": "lan@example.vn", "password": common::PASSWORD }),
    )
    .await;

    let (_, history) = get(&app, "/api/security/login-history", Some(&token)).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["success"], true);
    assert_eq!(history[1]["success"], false);

    let (_, overview) = get(&app, "/api/security/overview", Some(&token)).await;
    assert_eq!(overview["two_factor_enabled"], false);
    assert_eq!(overview["api_keys_count"], 0);
    assert!(overview["last_login"]["at"].is_string());
}

#[tokio::test]
async fn test_admin_blacklist() {
    let state = setup().await;
    let app = app(&state);
    let (_, buyer) = customer(&state, "lan@example.vn").await;
    let (_, admin_token) = admin(&state).await;

    let (status, _) = post(
        &app,
        "/api/security/admin/ip-blacklist",
        Some(&buyer),
        json!({ "ip_address": "203.0.113.7" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post(
        &app,
        "/api/security/admin/ip-blacklist",
        Some(&admin_token),
        json!({ "ip_address": "not-an-ip" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, entry) = post(
        &app,
        "/api/security/admin/ip-blacklist",
        Some(&admin_token),
        json!({ "ip_address": "203.0.113.7", "hours": 2, "description": "card testing" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["reason"], "manual");
    assert_eq!(entry["is_permanent"], false);

    let (_, listed) = get(&app, "/api/security/admin/ip-blacklist", Some(&admin_token)).await;
    assert_eq!(listed["count"], 1);

    let (status, _) = delete(
        &app,
        "/api/security/admin/ip-blacklist/203.0.113.7",
        Some(&admin_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = delete(
        &app,
        "/api/security/admin/ip-blacklist/203.0.113.7",
        Some(&admin_token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_honeypot_blocks_the_caller() {
    let state = setup().await;
    let app = server::build_router(state.clone());

    let (status, body) = send(&app, from_ip("POST", "/api/security/honeypot/login", "198.51.100.4")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied");

    // Every later request from that address is turned away by the guard
    let (status, body) = send(&app, from_ip("GET", "/api/health", "198.51.100.4")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "IP_BLOCKED");

    let (status, _) = send(&app, from_ip("GET", "/api/health", "198.51.100.5")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, check) = send(&app, from_ip("GET", "/api/security/check-ip", "198.51.100.5")).await;
    assert_eq!(check, json!({ "ip": "198.51.100.5", "blocked": false }));
}

#[tokio::test]
async fn test_rate_limit_per_ip() {
    let mut config = test_config();
    config.rate_limit_per_minute = 3;
    let state = setup_with(config).await;
    let app = server::build_router(state);

    for _ in 0..3 {
        let (status, _) = send(&app, from_ip("GET", "/api/health", "192.0.2.10")).await;
        assert_eq!(status, StatusCode::OK);
    }
    let response = tower::ServiceExt::oneshot(app.clone(), from_ip("GET", "/api/health", "192.0.2.10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "60");

    let (status, _) = send(&app, from_ip("GET", "/api/health", "192.0.2.11")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_scanner_user_agents_get_blocked() {
    let state = setup().await;
    let app = server::build_router(state);

    let scan = || {
        Request::builder()
            .uri("/api/health")
            .header("x-forwarded-for", "192.0.2.66")
            .header("user-agent", "sqlmap/1.7.2#stable")
            .body(Body::empty())
            .unwrap()
    };
    for _ in 0..4 {
        let (status, _) = send(&app, scan()).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&app, scan()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The block outlives the user agent
    let (status, _) = send(&app, from_ip("GET", "/api/health", "192.0.2.66")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_security_headers_and_csp_reports() {
    let state = setup().await;
    let app = server::build_router(state);

    let response = tower::ServiceExt::oneshot(app.clone(), from_ip("GET", "/api/health", "192.0.2.1"))
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(
        headers["content-security-policy"]
            .to_str()
            .unwrap()
            .contains("report-uri /api/security/csp-report")
    );

    let report = json!({
        "csp-report": {
            "document-uri": "https://owls.test/checkout",
            "violated-directive": "script-src",
            "blocked-uri": "https://evil.example/x.js",
        }
    });
    let request = Request::builder()
        .method("POST")
        .uri("/api/security/csp-report")
        .header("x-forwarded-for", "192.0.2.1")
        .header("Content-Type", "application/csp-report")
        .body(Body::from(report.to_string()))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let request = Request::builder()
        .method("POST")
        .uri("/api/security/csp-report")
        .header("x-forwarded-for", "192.0.2.1")
        .body(Body::from("not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
