mod common;

use axum::{Router, http::StatusCode};
use chrono::{Duration, Utc};
use futures::future::join_all;
use sea_orm::{EntityTrait, sea_query::Expr};
use serde_json::{Value, json};

use owlstore::models::order;

use common::{admin, app, customer, get, order_body, patch, place_order, post, setup};

fn at(offset: Duration) -> String {
    (Utc::now() + offset).to_rfc3339()
}

async fn create_coupon(app: &Router, admin_token: &str, body: Value) -> Value {
    let (status, coupon) = post(app, "/api/marketing/admin/coupons", Some(admin_token), body).await;
    assert_eq!(status, StatusCode::CREATED, "{}", coupon);
    coupon
}

async fn validate(app: &Router, token: &str, code: &str, total: i64) -> Value {
    let (status, body) = post(
        app,
        "/api/marketing/coupons/validate",
        Some(token),
        json!({ "code": code, "order_total": total, "shipping_fee": 30000 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn test_coupon_validation_messages() {
    let state = setup().await;
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;
    let (_, buyer) = customer(&state, "lan@example.vn").await;

    let coupon = create_coupon(
        &app,
        &admin_token,
        json!({
            "code": " owl10 ",
            "name": "Ten percent",
            "discount_type": "percentage",
            "discount_value": 10,
            "min_order_value": 200000,
            "max_discount": 50000,
            "valid_from": at(-Duration::days(1)),
            "valid_until": at(Duration::days(7)),
        }),
    )
    .await;
    assert_eq!(coupon["code"], "OWL10");
    assert_eq!(coupon["discount_display"], "10%");

    let body = validate(&app, &buyer, "nope", 300000).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["message"], "Invalid coupon code");

    let body = validate(&app, &buyer, "owl10", 150000).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["message"], "Minimum order value: 200,000₫");

    let body = validate(&app, &buyer, "owl10", 300000).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["discount"], 30000);

    // Capped by max_discount
    let body = validate(&app, &buyer, "OWL10", 2000000).await;
    assert_eq!(body["discount"], 50000);

    create_coupon(
        &app,
        &admin_token,
        json!({
            "code": "LATER",
            "name": "Not yet",
            "discount_type": "fixed",
            "discount_value": 20000,
            "valid_from": at(Duration::days(2)),
            "valid_until": at(Duration::days(9)),
        }),
    )
    .await;
    let body = validate(&app, &buyer, "later", 300000).await;
    assert_eq!(body["message"], "Coupon is not yet valid");
}

#[tokio::test]
async fn test_coupon_creation_rules() {
    let state = setup().await;
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;
    let (_, buyer) = customer(&state, "lan@example.vn").await;

    let base = json!({
        "code": "FREESHIP",
        "name": "Free shipping",
        "discount_type": "free_shipping",
        "discount_value": 0,
        "valid_from": at(-Duration::days(1)),
        "valid_until": at(Duration::days(1)),
    });
    let (status, _) = post(&app, "/api/marketing/admin/coupons", Some(&buyer), base.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    create_coupon(&app, &admin_token, base.clone()).await;
    let (status, body) = post(&app, "/api/marketing/admin/coupons", Some(&admin_token), base).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_ENTRY");

    let (status, _) = post(
        &app,
        "/api/marketing/admin/coupons",
        Some(&admin_token),
        json!({
            "code": "TOOMUCH",
            "name": "Broken",
            "discount_type": "percentage",
            "discount_value": 150,
            "valid_from": at(-Duration::days(1)),
            "valid_until": at(Duration::days(1)),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, public) = get(&app, "/api/marketing/coupons", None).await;
    assert_eq!(public.as_array().unwrap().len(), 1);
    assert_eq!(public[0]["discount_display"], "Free Shipping");
}

#[tokio::test]
async fn test_order_consumes_single_use_coupon() {
    let state = setup().await;
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;
    let (_, buyer) = customer(&state, "lan@example.vn").await;

    create_coupon(
        &app,
        &admin_token,
        json!({
            "code": "WELCOME",
            "name": "Welcome",
            "discount_type": "fixed",
            "discount_value": 25000,
            "usage_limit": 100,
            "first_order_only": true,
            "valid_from": at(-Duration::days(1)),
            "valid_until": at(Duration::days(30)),
        }),
    )
    .await;

    let mut body = order_body(100_000);
    body["coupon_code"] = json!("welcome");
    let (status, order) = post(&app, "/api/orders", Some(&buyer), body.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{}", order);
    assert_eq!(order["subtotal"], 200000);
    assert_eq!(order["discount"], 25000);
    assert_eq!(order["total"], 205000);
    assert_eq!(order["coupon_code"], "WELCOME");

    let (status, err) = post(&app, "/api/orders", Some(&buyer), body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["message"], "You have reached usage limit for this coupon");

    let (_, listed) = get(&app, "/api/marketing/admin/coupons", Some(&admin_token)).await;
    assert_eq!(listed["results"][0]["remaining_uses"], 99);
}

#[tokio::test]
async fn test_banners_count_views_and_clicks() {
    let state = setup().await;
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;

    let (status, banner) = post(
        &app,
        "/api/marketing/admin/banners",
        Some(&admin_token),
        json!({ "title": "Autumn", "image": "/img/autumn.jpg", "position": "hero" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = banner["id"].as_i64().unwrap();

    let (status, _) = post(
        &app,
        "/api/marketing/admin/banners",
        Some(&admin_token),
        json!({ "title": "Bad", "image": "/img/x.jpg", "position": "ceiling" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = get(&app, "/api/marketing/banners?position=hero", None).await;
    assert_eq!(listed[0]["view_count"], 1);
    let (_, none) = get(&app, "/api/marketing/banners?position=sidebar", None).await;
    assert!(none.as_array().unwrap().is_empty());

    let (status, body) = post(&app, &format!("/api/marketing/banners/{}/click", id), None, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tracked"], true);

    let (status, _) = post(&app, "/api/marketing/banners/999/click", None, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_flash_sale_price_and_purchase() {
    let state = setup().await;
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;
    let (_, buyer) = customer(&state, "lan@example.vn").await;

    let (status, sale) = post(
        &app,
        "/api/marketing/admin/flash-sales",
        Some(&admin_token),
        json!({
            "name": "Midnight owls",
            "start_time": at(-Duration::hours(1)),
            "end_time": at(Duration::hours(3)),
            "items": [{
                "product_id": "owl-plush",
                "product_name": "Owl plush",
                "flash_price": 60000,
                "original_price": 100000,
                "quantity_limit": 5,
            }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", sale);
    assert_eq!(sale["status"], "active");
    assert_eq!(sale["items"][0]["discount_percentage"], 40);
    let item_id = sale["items"][0]["id"].as_i64().unwrap();

    let (status, body) = get(&app, "/api/marketing/flash-price", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "product_id required");

    let (_, body) = get(&app, "/api/marketing/flash-price?product_id=owl-plush", None).await;
    assert_eq!(body["flash_sale"]["name"], "Midnight owls");
    assert_eq!(body["item"]["flash_price"], 60000);

    let (_, body) = get(&app, "/api/marketing/flash-price?product_id=teapot", None).await;
    assert!(body["flash_sale"].is_null());

    let mut order = order_body(100_000);
    order["items"][0]["flash_sale_item_id"] = json!(item_id);
    let (status, _) = post(&app, "/api/orders", Some(&buyer), order.clone()).await;
    // quantity 2 is over the default one-per-customer limit
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    order["items"][0]["quantity"] = json!(1);
    let (status, created) = post(&app, "/api/orders", Some(&buyer), order).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["items"][0]["unit_price"], 60000);

    let (_, live) = get(&app, "/api/marketing/flash-sales", None).await;
    assert_eq!(live[0]["items"][0]["quantity_sold"], 1);
    assert_eq!(live[0]["items"][0]["remaining_quantity"], 4);
}

#[tokio::test]
async fn test_campaign_lifecycle() {
    let state = setup().await;
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;

    let (status, campaign) = post(
        &app,
        "/api/marketing/admin/campaigns",
        Some(&admin_token),
        json!({ "name": "Tet newsletter", "campaign_type": "email", "budget": 5000000 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(campaign["status"], "draft");
    let id = campaign["id"].as_str().unwrap();

    let (status, updated) = patch(
        &app,
        &format!("/api/marketing/admin/campaigns/{}", id),
        Some(&admin_token),
        json!({ "status": "active" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "active");

    let (status, _) = patch(
        &app,
        &format!("/api/marketing/admin/campaigns/{}", id),
        Some(&admin_token),
        json!({ "status": "exploded" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let track = format!("/api/marketing/admin/campaigns/{}/track", id);
    for event in ["sent", "sent", "open"] {
        post(&app, &track, Some(&admin_token), json!({ "event": event })).await;
    }
    let (status, tracked) = post(
        &app,
        &track,
        Some(&admin_token),
        json!({ "event": "conversion", "revenue": 450000 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tracked["sent_count"], 2);
    assert_eq!(tracked["open_count"], 1);
    assert_eq!(tracked["conversion_count"], 1);
    assert_eq!(tracked["revenue"], 450000);

    let (status, _) = post(&app, &track, Some(&admin_token), json!({ "event": "dance" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, stats) = get(&app, "/api/marketing/admin/statistics", Some(&admin_token)).await;
    assert_eq!(stats["active_campaigns"], 1);
    assert_eq!(stats["total_campaign_conversions"], 1);
}

#[tokio::test]
async fn test_concurrent_buyers_cannot_oversell_flash_item() {
    let state = setup().await;
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;

    let (status, sale) = post(
        &app,
        "/api/marketing/admin/flash-sales",
        Some(&admin_token),
        json!({
            "name": "Last owl standing",
            "start_time": at(-Duration::hours(1)),
            "end_time": at(Duration::hours(1)),
            "items": [{
                "product_id": "owl-plush",
                "product_name": "Owl plush",
                "flash_price": 50000,
                "original_price": 100000,
                "quantity_limit": 1,
            }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", sale);
    let item_id = sale["items"][0]["id"].as_i64().unwrap();

    let mut buyers = Vec::new();
    for i in 0..5 {
        let (_, token) = customer(&state, &format!("buyer{}@example.vn", i)).await;
        buyers.push(token);
    }
    let mut body = order_body(100_000);
    body["items"][0]["quantity"] = json!(1);
    body["items"][0]["flash_sale_item_id"] = json!(item_id);

    let results = join_all(
        buyers
            .iter()
            .map(|token| post(&app, "/api/orders", Some(token), body.clone())),
    )
    .await;
    let sold = results.iter().filter(|(s, _)| *s == StatusCode::CREATED).count();
    assert_eq!(sold, 1, "{:?}", results);
    assert!(
        results
            .iter()
            .filter(|(s, _)| *s != StatusCode::CREATED)
            .all(|(s, _)| *s == StatusCode::UNPROCESSABLE_ENTITY)
    );

    let (_, detail) = get(
        &app,
        &format!("/api/marketing/flash-sales/{}", sale["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(detail["items"][0]["quantity_sold"], 1);
    assert_eq!(detail["items"][0]["is_sold_out"], true);
}

#[tokio::test]
async fn test_last_coupon_use_goes_to_one_buyer() {
    let state = setup().await;
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;

    create_coupon(
        &app,
        &admin_token,
        json!({
            "code": "LASTONE",
            "name": "Last one",
            "discount_type": "fixed",
            "discount_value": 25000,
            "usage_limit": 1,
            "valid_from": at(-Duration::days(1)),
            "valid_until": at(Duration::days(1)),
        }),
    )
    .await;

    let mut buyers = Vec::new();
    for i in 0..4 {
        let (_, token) = customer(&state, &format!("buyer{}@example.vn", i)).await;
        buyers.push(token);
    }
    let mut body = order_body(100_000);
    body["coupon_code"] = json!("LASTONE");

    let results = join_all(
        buyers
            .iter()
            .map(|token| post(&app, "/api/orders", Some(token), body.clone())),
    )
    .await;
    let winners: Vec<&Value> = results
        .iter()
        .filter(|(s, _)| *s == StatusCode::CREATED)
        .map(|(_, order)| order)
        .collect();
    assert_eq!(winners.len(), 1, "{:?}", results);
    assert_eq!(winners[0]["discount"], 25000);

    let (_, listed) = get(&app, "/api/marketing/admin/coupons", Some(&admin_token)).await;
    assert_eq!(listed["results"][0]["used_count"], 1);
    assert_eq!(listed["results"][0]["remaining_uses"], 0);
}

#[tokio::test]
async fn test_cancelled_order_still_ends_first_order_offer() {
    let state = setup().await;
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;
    let (_, buyer) = customer(&state, "lan@example.vn").await;

    create_coupon(
        &app,
        &admin_token,
        json!({
            "code": "HELLO",
            "name": "Hello",
            "discount_type": "fixed",
            "discount_value": 20000,
            "first_order_only": true,
            "valid_from": at(-Duration::days(1)),
            "valid_until": at(Duration::days(1)),
        }),
    )
    .await;
    assert_eq!(validate(&app, &buyer, "HELLO", 200000).await["valid"], true);

    place_order(&app, &buyer).await;
    order::Entity::update_many()
        .col_expr(order::Column::Status, Expr::value("cancelled"))
        .exec(state.db())
        .await
        .unwrap();

    let body = validate(&app, &buyer, "HELLO", 200000).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["message"], "This coupon is for first order only");
}
