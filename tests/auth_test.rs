mod common;

use axum::http::StatusCode;
use serde_json::json;
use totp_rs::{Algorithm, Secret, TOTP};

use common::{PASSWORD, app, customer, get, patch, post, setup};

fn current_code(secret: &str, email: &str) -> String {
    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        Secret::Encoded(secret.to_string()).to_bytes().unwrap(),
        Some("OWLS Store".to_string()),
        email.to_string(),
    )
    .unwrap()
    .generate_current()
    .unwrap()
}

#[tokio::test]
async fn test_register_and_me() {
    let state = setup().await;
    let app = app(&state);

    let (status, body) = post(
        &app,
        "/api/auth/register",
        None,
        json!({ "email": "Mai@Example.VN", "password": "longenough", "first_name": "Mai" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "mai@example.vn");
    assert_eq!(body["user"]["role"], "customer");
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, me) = get(&app, "/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["first_name"], "Mai");
    assert!(me.get("password_hash").is_none());

    let (status, updated) = patch(
        &app,
        "/api/auth/me",
        Some(&token),
        json!({ "last_name": "  Tran " }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["last_name"], "Tran");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_short_passwords() {
    let state = setup().await;
    let app = app(&state);
    customer(&state, "lan@example.vn").await;

    let (status, body) = post(
        &app,
        "/api/auth/register",
        None,
        json!({ "email": "LAN@example.vn", "password": "longenough" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_ENTRY");

    let (status, body) = post(
        &app,
        "/api/auth/register",
        None,
        json!({ "email": "new@example.vn", "password": "short" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_success_and_bad_password() {
    let state = setup().await;
    let app = app(&state);
    customer(&state, "lan@example.vn").await;

    let (status, body) = post(
        &app,
        "/api/auth/login",
        None,
        json!({ "email": "lan@example.vn", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());

    let (status, body) = post(
        &app,
        "/api/auth/login",
        None,
        json!({ "email": "lan@example.vn", "password": "wrong-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_five_failures_lock_the_account() {
    let state = setup().await;
    let app = app(&state);
    customer(&state, "lan@example.vn").await;

    for _ in 0..5 {
        let (status, body) = post(
            &app,
            "/api/auth/login",
            None,
            json!({ "email": "lan@example.vn", "password": "wrong-password" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
    }

    // Even the right password is refused while locked
    let (status, body) = post(
        &app,
        "/api/auth/login",
        None,
        json!({ "email": "lan@example.vn", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "ACCOUNT_LOCKED");
}

#[tokio::test]
async fn test_refresh_requires_refresh_token() {
    let state = setup().await;
    let app = app(&state);

    let (_, body) = post(
        &app,
        "/api/auth/register",
        None,
        json!({ "email": "mai@example.vn", "password": "longenough" }),
    )
    .await;
    let access = body["access_token"].as_str().unwrap().to_string();
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    let (status, pair) = post(&app, "/api/auth/refresh", None, json!({ "refresh": refresh })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(pair["access_token"].is_string());

    let (status, body) = post(&app, "/api/auth/refresh", None, json!({ "refresh": access })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");

    // Refresh tokens are not accepted as bearer credentials
    let (status, _) = get(&app, "/api/auth/me", Some(&refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let state = setup().await;
    let app = app(&state);

    let (status, body) = get(&app, "/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_change_password() {
    let state = setup().await;
    let app = app(&state);
    let (_, token) = customer(&state, "lan@example.vn").await;

    let (status, body) = post(
        &app,
        "/api/auth/change-password",
        Some(&token),
        json!({ "old_password": "nope-nope", "new_password": "brand-new-pass" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Password incorrect");

    let (status, _) = post(
        &app,
        "/api/auth/change-password",
        Some(&token),
        json!({ "old_password": PASSWORD, "new_password": "brand-new-pass" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &app,
        "/api/auth/login",
        None,
        json!({ "email": "lan@example.vn", "password": "brand-new-pass" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_two_factor_login_and_trusted_device() {
    let state = setup().await;
    let app = app(&state);
    let (user, token) = customer(&state, "lan@example.vn").await;

    let (status, setup_body) = post(&app, "/api/security/2fa/setup", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let secret = setup_body["secret"].as_str().unwrap().to_string();
    assert!(
        setup_body["qr_uri"]
            .as_str()
            .unwrap()
            .starts_with("otpauth://totp/")
    );

    let (status, body) = post(
        &app,
        "/api/security/2fa/enable",
        Some(&token),
        json!({ "code": "000000" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_2FA_CODE");

    let (status, enabled) = post(
        &app,
        "/api/security/2fa/enable",
        Some(&token),
        json!({ "code": current_code(&secret, &user.email) }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(enabled["backup_codes"].as_array().unwrap().len(), 10);

    let (status, challenge) = post(
        &app,
        "/api/auth/login",
        None,
        json!({ "email": "lan@example.vn", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(challenge["requires_2fa"], true);
    assert_eq!(challenge["user_id"], user.id.as_str());

    let (status, session) = post(
        &app,
        "/api/auth/login/2fa",
        None,
        json!({
            "user_id": user.id,
            "code": current_code(&secret, &user.email),
            "trust_device": true,
            "device_name": "Laptop",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(session["access_token"].is_string());
    let device_token = session["device_token"].as_str().unwrap().to_string();

    // A trusted device skips the second factor
    let (status, body) = post(
        &app,
        "/api/auth/login",
        None,
        json!({ "email": "lan@example.vn", "password": PASSWORD, "device_token": device_token }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert!(body.get("requires_2fa").is_none());
}

#[tokio::test]
async fn test_backup_code_is_single_use() {
    let state = setup().await;
    let app = app(&state);
    let (user, token) = customer(&state, "lan@example.vn").await;

    let (_, setup_body) = post(&app, "/api/security/2fa/setup", Some(&token), json!({})).await;
    let secret = setup_body["secret"].as_str().unwrap().to_string();
    let (_, enabled) = post(
        &app,
        "/api/security/2fa/enable",
        Some(&token),
        json!({ "code": current_code(&secret, &user.email) }),
    )
    .await;
    let code = enabled["backup_codes"][0].as_str().unwrap().to_lowercase();

    let body = json!({ "user_id": user.id, "code": code, "is_backup": true });
    let (status, _) = post(&app, "/api/auth/login/2fa", None, body.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, err) = post(&app, "/api/auth/login/2fa", None, body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["code"], "INVALID_2FA_CODE");

    let (_, remaining) = get(&app, "/api/security/2fa/backup-codes", Some(&token)).await;
    assert_eq!(remaining["remaining"], 9);
}

#[tokio::test]
async fn test_health_reports_database() {
    let state = setup().await;
    let (status, body) = get(&app(&state), "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["service"], "owlstore");
}
