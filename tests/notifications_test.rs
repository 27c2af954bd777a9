mod common;

use axum::http::StatusCode;
use serde_json::json;

use owlstore::infrastructure::AppState;
use owlstore::services::notification_service::{self, NewNotification};

use common::{app, customer, get, post, setup};

async fn notify(state: &AppState, user_id: &str, title: &str) -> String {
    notification_service::create(
        state.db(),
        NewNotification {
            user_id,
            notification_type: "order_status",
            title,
            message: format!("{} body", title),
            action_url: Some("/orders".to_string()),
            data: json!({ "order_number": "OWL-1" }),
        },
    )
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn test_list_and_get_own_notifications() {
    let state = setup().await;
    let app = app(&state);
    let (user, token) = customer(&state, "lan@example.vn").await;
    let (other, other_token) = customer(&state, "mai@example.vn").await;

    let id = notify(&state, &user.id, "Order confirmed").await;
    notify(&state, &user.id, "Order shipped").await;
    let foreign = notify(&state, &other.id, "Not yours").await;

    let (status, page) = get(&app, "/api/notifications", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 2);
    assert_eq!(page["results"][0]["data"]["order_number"], "OWL-1");

    let (status, one) = get(&app, &format!("/api/notifications/{}", id), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["title"], "Order confirmed");
    assert_eq!(one["is_read"], false);

    let (status, _) = get(&app, &format!("/api/notifications/{}", foreign), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, count) = get(&app, "/api/notifications/unread-count", Some(&other_token)).await;
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn test_mark_selected_then_all_read() {
    let state = setup().await;
    let app = app(&state);
    let (user, token) = customer(&state, "lan@example.vn").await;

    let first = notify(&state, &user.id, "One").await;
    notify(&state, &user.id, "Two").await;
    notify(&state, &user.id, "Three").await;

    let (status, body) = post(
        &app,
        "/api/notifications/mark-read",
        Some(&token),
        json!({ "ids": [first] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marked"], 1);

    let (_, count) = get(&app, "/api/notifications/unread-count", Some(&token)).await;
    assert_eq!(count["count"], 2);

    let (_, unread) = get(&app, "/api/notifications?unread=true", Some(&token)).await;
    assert_eq!(unread["count"], 2);

    let (_, body) = post(&app, "/api/notifications/mark-read", Some(&token), json!({})).await;
    assert_eq!(body["marked"], 2);

    let (_, count) = get(&app, "/api/notifications/unread-count", Some(&token)).await;
    assert_eq!(count["count"], 0);

    let (_, one) = get(&app, &format!("/api/notifications/{}", first), Some(&token)).await;
    assert_eq!(one["is_read"], true);
    assert!(one["read_at"].is_string());
}

#[tokio::test]
async fn test_notifications_require_auth() {
    let state = setup().await;
    let app = app(&state);

    let (status, _) = get(&app, "/api/notifications", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
