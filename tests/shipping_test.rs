mod common;

use axum::{Router, http::StatusCode};
use futures::future::join_all;
use serde_json::{Value, json};

use common::{admin, app, customer, get, place_order, post, setup};

async fn ship(app: &Router, admin_token: &str, order_id: &str, cod_amount: i64) -> Value {
    let (status, body) = post(
        app,
        "/api/shipping/admin/shipments",
        Some(admin_token),
        json!({ "order_id": order_id, "cod_amount": cod_amount, "weight": 800 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

async fn set_status(app: &Router, admin_token: &str, id: &str, status: &str) -> (StatusCode, Value) {
    post(
        app,
        &format!("/api/shipping/admin/shipments/{}/status", id),
        Some(admin_token),
        json!({ "status": status, "location": "Hub Ha Noi" }),
    )
    .await
}

#[tokio::test]
async fn test_create_shipment_moves_order_to_shipping() {
    let state = setup().await;
    let app = app(&state);
    let (_, buyer) = customer(&state, "lan@example.vn").await;
    let (_, admin_token) = admin(&state).await;

    let order = place_order(&app, &buyer).await;
    let order_id = order["id"].as_str().unwrap();
    let shipment = ship(&app, &admin_token, order_id, 230_000).await;

    assert_eq!(shipment["status"], "pending");
    assert_eq!(shipment["provider"], "ghn");
    assert!(shipment["tracking_code"].as_str().unwrap().starts_with("SHP"));
    assert_eq!(shipment["shipping_fee"], 30000);
    assert_eq!(shipment["can_cancel"], true);

    let (_, order) = get(&app, &format!("/api/orders/{}", order_id), Some(&buyer)).await;
    assert_eq!(order["status"], "shipping");

    // One shipment per order
    let (status, body) = post(
        &app,
        "/api/shipping/admin/shipments",
        Some(&admin_token),
        json!({ "order_id": order_id }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Shipment already exists for this order");
}

#[tokio::test]
async fn test_shipment_admin_routes_require_admin() {
    let state = setup().await;
    let app = app(&state);
    let (_, buyer) = customer(&state, "lan@example.vn").await;

    let (status, _) = get(&app, "/api/shipping/admin/shipments", Some(&buyer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = get(&app, "/api/shipping/admin/shipments", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delivery_settles_cod_order_and_notifies_buyer() {
    let state = setup().await;
    let app = app(&state);
    let (_, buyer) = customer(&state, "lan@example.vn").await;
    let (_, admin_token) = admin(&state).await;

    let order = place_order(&app, &buyer).await;
    let order_id = order["id"].as_str().unwrap();
    let shipment = ship(&app, &admin_token, order_id, 230_000).await;
    let id = shipment["id"].as_str().unwrap();

    for status in ["picked_up", "in_transit", "out_for_delivery", "delivered"] {
        let (code, body) = set_status(&app, &admin_token, id, status).await;
        assert_eq!(code, StatusCode::OK, "{}", body);
        assert_eq!(body["status"], status);
    }

    let (_, order) = get(&app, &format!("/api/orders/{}", order_id), Some(&buyer)).await;
    assert_eq!(order["status"], "delivered");
    assert_eq!(order["payment_status"], "paid");

    let (_, detail) = get(
        &app,
        &format!("/api/shipping/admin/shipments/{}", id),
        Some(&admin_token),
    )
    .await;
    assert_eq!(detail["cod_collected"], true);
    assert_eq!(detail["is_final"], true);
    // created + four updates, newest first
    assert_eq!(detail["events"].as_array().unwrap().len(), 5);
    assert_eq!(detail["events"][0]["status"], "delivered");

    let (_, count) = get(&app, "/api/notifications/unread-count", Some(&buyer)).await;
    assert_eq!(count["count"], 4);
    let (_, page) = get(&app, "/api/notifications", Some(&buyer)).await;
    let kinds: Vec<&str> = page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["notification_type"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"shipment_delivered"));
    assert!(kinds.contains(&"out_for_delivery"));
}

#[tokio::test]
async fn test_final_and_unknown_statuses_are_rejected() {
    let state = setup().await;
    let app = app(&state);
    let (_, buyer) = customer(&state, "lan@example.vn").await;
    let (_, admin_token) = admin(&state).await;

    let order = place_order(&app, &buyer).await;
    let shipment = ship(&app, &admin_token, order["id"].as_str().unwrap(), 0).await;
    let id = shipment["id"].as_str().unwrap();

    let (status, body) = set_status(&app, &admin_token, id, "teleported").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = set_status(&app, &admin_token, id, "delivered").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = set_status(&app, &admin_token, id, "in_transit").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Cannot update shipment in final status: delivered");
}

#[tokio::test]
async fn test_cancel_only_before_pickup() {
    let state = setup().await;
    let app = app(&state);
    let (_, buyer) = customer(&state, "lan@example.vn").await;
    let (_, admin_token) = admin(&state).await;

    let first = place_order(&app, &buyer).await;
    let early = ship(&app, &admin_token, first["id"].as_str().unwrap(), 0).await;
    let (status, body) = post(
        &app,
        &format!("/api/shipping/admin/shipments/{}/cancel", early["id"].as_str().unwrap()),
        Some(&admin_token),
        json!({ "reason": "customer request" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["cancel_reason"], "customer request");

    let second = place_order(&app, &buyer).await;
    let late = ship(&app, &admin_token, second["id"].as_str().unwrap(), 0).await;
    let late_id = late["id"].as_str().unwrap();
    set_status(&app, &admin_token, late_id, "picked_up").await;
    let (status, body) = post(
        &app,
        &format!("/api/shipping/admin/shipments/{}/cancel", late_id),
        Some(&admin_token),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Cannot cancel shipment in current status");
}

#[tokio::test]
async fn test_delivery_attempts_are_capped() {
    let state = setup().await;
    let app = app(&state);
    let (_, buyer) = customer(&state, "lan@example.vn").await;
    let (_, admin_token) = admin(&state).await;

    let order = place_order(&app, &buyer).await;
    let shipment = ship(&app, &admin_token, order["id"].as_str().unwrap(), 0).await;
    let uri = format!(
        "/api/shipping/admin/shipments/{}/attempt",
        shipment["id"].as_str().unwrap()
    );

    for n in 1..=3 {
        let (status, body) = post(
            &app,
            &uri,
            Some(&admin_token),
            json!({ "fail_reason": "not_home", "notes": "No answer" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["attempt"]["attempt_number"], n);
        assert_eq!(body["shipment"]["status"], "failed");
        assert_eq!(body["shipment"]["delivery_attempts"], n);
    }

    let (status, body) = post(
        &app,
        &uri,
        Some(&admin_token),
        json!({ "fail_reason": "not_home" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Maximum delivery attempts reached");

    let (status, _) = post(
        &app,
        &uri,
        Some(&admin_token),
        json!({ "fail_reason": "aliens" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, failed) = get(&app, "/api/shipping/admin/shipments/failed", Some(&admin_token)).await;
    assert_eq!(failed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_public_tracking_and_fee_quote() {
    let state = setup().await;
    let app = app(&state);
    let (_, buyer) = customer(&state, "lan@example.vn").await;
    let (_, admin_token) = admin(&state).await;

    let order = place_order(&app, &buyer).await;
    let shipment = ship(&app, &admin_token, order["id"].as_str().unwrap(), 0).await;
    let code = shipment["tracking_code"].as_str().unwrap();
    set_status(&app, &admin_token, shipment["id"].as_str().unwrap(), "picked_up").await;

    let (status, body) = get(&app, &format!("/api/shipping/tracking/{}", code), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "picked_up");
    assert_eq!(body["provider_display"], "GHN");
    assert_eq!(body["events"][0]["status"], "picked_up");
    assert_eq!(body["events"][1]["status"], "created");

    let (status, _) = get(&app, "/api/shipping/tracking/SHPNOPE", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, fee) = post(
        &app,
        "/api/shipping/calculate-fee",
        None,
        json!({ "weight": 1000, "cod_amount": 200000 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fee["shipping_fee"], 35000);
    assert_eq!(fee["cod_fee"], 10000);

    let (status, services) = get(&app, "/api/shipping/services", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!services.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cod_reconciliation_flow() {
    let state = setup().await;
    let app = app(&state);
    let (_, buyer) = customer(&state, "lan@example.vn").await;
    let (_, admin_token) = admin(&state).await;

    let order = place_order(&app, &buyer).await;
    let shipment = ship(&app, &admin_token, order["id"].as_str().unwrap(), 230_000).await;
    let id = shipment["id"].as_str().unwrap();
    set_status(&app, &admin_token, id, "delivered").await;

    let (_, pending) = get(&app, "/api/shipping/admin/shipments/pending-cod", Some(&admin_token)).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, recon) = post(
        &app,
        "/api/shipping/admin/reconciliations",
        Some(&admin_token),
        json!({ "provider": "ghn", "reconciliation_date": "2026-10-01", "shipment_ids": [id] }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", recon);
    assert_eq!(recon["total_orders"], 1);
    assert_eq!(recon["total_cod"], 230000);
    let fee = shipment["total_fee"].as_i64().unwrap();
    assert_eq!(recon["net_amount"], 230000 - fee);
    let recon_id = recon["id"].as_i64().unwrap();

    // Same provider and day twice is refused
    let (status, _) = post(
        &app,
        "/api/shipping/admin/reconciliations",
        Some(&admin_token),
        json!({ "provider": "ghn", "reconciliation_date": "2026-10-01", "shipment_ids": [id] }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, confirmed) = post(
        &app,
        &format!("/api/shipping/admin/reconciliations/{}/confirm", recon_id),
        Some(&admin_token),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    let (status, transferred) = post(
        &app,
        &format!("/api/shipping/admin/reconciliations/{}/transfer", recon_id),
        Some(&admin_token),
        json!({ "reference": "VCB-20261002-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(transferred["status"], "transferred");
    assert_eq!(transferred["shipment_ids"][0], id);

    let (_, pending) = get(&app, "/api/shipping/admin/shipments/pending-cod", Some(&admin_token)).await;
    assert!(pending.as_array().unwrap().is_empty());

    let (_, stats) = get(&app, "/api/shipping/admin/statistics", Some(&admin_token)).await;
    assert_eq!(stats["delivered"], 1);
    assert_eq!(stats["total_cod_collected"], 230000);
    assert_eq!(stats["pending_cod_transfer"], 0);
}

#[tokio::test]
async fn test_racing_deliveries_apply_once() {
    let state = setup().await;
    let app = app(&state);
    let (_, buyer) = customer(&state, "lan@example.vn").await;
    let (_, admin_token) = admin(&state).await;

    let order = place_order(&app, &buyer).await;
    let shipment = ship(&app, &admin_token, order["id"].as_str().unwrap(), 230_000).await;
    let id = shipment["id"].as_str().unwrap();

    let results = join_all((0..2).map(|_| set_status(&app, &admin_token, id, "delivered"))).await;
    let winners = results.iter().filter(|(s, _)| *s == StatusCode::OK).count();
    assert_eq!(winners, 1, "{:?}", results);
    for (status, _) in results.iter().filter(|(s, _)| *s != StatusCode::OK) {
        assert!(
            *status == StatusCode::CONFLICT || *status == StatusCode::UNPROCESSABLE_ENTITY,
            "unexpected {}",
            status
        );
    }

    let (_, detail) = get(
        &app,
        &format!("/api/shipping/admin/shipments/{}", id),
        Some(&admin_token),
    )
    .await;
    let delivered = detail["events"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["status"] == "delivered")
        .count();
    assert_eq!(delivered, 1);
}
