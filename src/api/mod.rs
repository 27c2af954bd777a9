pub mod auth;
pub mod error;
pub mod health;
pub mod locations;
pub mod marketing;
pub mod notifications;
pub mod orders;
pub mod reviews;
pub mod security;
pub mod shipping;
pub mod social;

use axum::{
    Router,
    routing::{any, delete, get, patch, post},
};

use crate::infrastructure::AppState;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/login/2fa", post(auth::login_2fa))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me).patch(auth::update_me))
        .route("/change-password", post(auth::change_password))
}

fn shipping_routes() -> Router<AppState> {
    Router::new()
        .route("/tracking/:code", get(shipping::track))
        .route("/calculate-fee", post(shipping::calculate_fee))
        .route("/services", get(shipping::services))
        .route(
            "/admin/shipments",
            get(shipping::list_shipments).post(shipping::create_shipment),
        )
        .route("/admin/shipments/active", get(shipping::active_shipments))
        .route("/admin/shipments/failed", get(shipping::failed_shipments))
        .route("/admin/shipments/pending-cod", get(shipping::pending_cod))
        .route("/admin/shipments/:id", get(shipping::get_shipment))
        .route("/admin/shipments/:id/status", post(shipping::update_status))
        .route("/admin/shipments/:id/cancel", post(shipping::cancel))
        .route("/admin/shipments/:id/attempt", post(shipping::record_attempt))
        .route("/admin/statistics", get(shipping::statistics))
        .route(
            "/admin/reconciliations",
            get(shipping::list_reconciliations).post(shipping::create_reconciliation),
        )
        .route(
            "/admin/reconciliations/:id/confirm",
            post(shipping::confirm_reconciliation),
        )
        .route(
            "/admin/reconciliations/:id/transfer",
            post(shipping::transfer_reconciliation),
        )
}

fn marketing_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(marketing::public_coupons))
        .route("/coupons/my", get(marketing::my_coupons))
        .route("/coupons/validate", post(marketing::validate_coupon))
        .route("/banners", get(marketing::banners))
        .route("/banners/:id/click", post(marketing::banner_click))
        .route("/flash-sales", get(marketing::flash_sales))
        .route("/flash-sales/upcoming", get(marketing::upcoming_flash_sales))
        .route("/flash-sales/:id", get(marketing::flash_sale_detail))
        .route("/flash-price", get(marketing::flash_price))
        .route(
            "/admin/coupons",
            get(marketing::admin_list_coupons).post(marketing::admin_create_coupon),
        )
        .route("/admin/banners", post(marketing::admin_create_banner))
        .route("/admin/flash-sales", post(marketing::admin_create_flash_sale))
        .route(
            "/admin/campaigns",
            get(marketing::admin_list_campaigns).post(marketing::admin_create_campaign),
        )
        .route(
            "/admin/campaigns/:id",
            get(marketing::admin_get_campaign).patch(marketing::admin_update_campaign),
        )
        .route(
            "/admin/campaigns/:id/track",
            post(marketing::admin_track_campaign),
        )
        .route("/admin/statistics", get(marketing::admin_statistics))
}

fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/products/:pid/reviews", get(reviews::product_reviews))
        .route(
            "/products/:pid/reviews/summary",
            get(reviews::product_summary),
        )
        .route("/reviews", post(reviews::create_review))
        .route("/reviews/my", get(reviews::my_reviews))
        .route("/reviews/reviewable", get(reviews::reviewable))
        .route(
            "/reviews/:id",
            get(reviews::get_review)
                .patch(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .route("/reviews/:id/vote", post(reviews::vote))
        .route("/reviews/:id/report", post(reviews::report))
        .route("/admin/reviews", get(reviews::admin_list))
        .route("/admin/reviews/bulk-moderate", post(reviews::bulk_moderate))
        .route("/admin/reviews/:id/moderate", post(reviews::moderate))
        .route("/admin/reviews/:id/reply", post(reviews::reply))
        .route("/admin/reports", get(reviews::pending_reports))
        .route("/admin/reports/:id/resolve", post(reviews::resolve_report))
        .route("/admin/statistics", get(reviews::admin_statistics))
}

fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/provinces", get(locations::provinces))
        .route("/provinces/:code", get(locations::province))
        .route("/provinces/:code/districts", get(locations::districts))
        .route("/districts/:code", get(locations::district))
        .route("/districts/:code/wards", get(locations::wards))
        .route("/wards/:code", get(locations::ward))
        .route("/search", get(locations::search))
        .route("/autocomplete", get(locations::autocomplete))
        .route("/resolve/:ward_code", get(locations::resolve))
        .route("/validate", post(locations::validate))
        .route("/statistics", get(locations::statistics))
        .route("/admin/import", post(locations::import))
        .route("/admin/sync-ghn", post(locations::sync_ghn))
}

fn security_routes() -> Router<AppState> {
    Router::new()
        .route("/2fa/status", get(security::two_factor_status))
        .route("/2fa/setup", post(security::two_factor_setup))
        .route("/2fa/enable", post(security::two_factor_enable))
        .route("/2fa/disable", post(security::two_factor_disable))
        .route("/2fa/verify", post(security::two_factor_verify))
        .route(
            "/2fa/backup-codes",
            get(security::backup_codes_remaining).post(security::backup_codes_regenerate),
        )
        .route(
            "/api-keys",
            get(security::list_api_keys).post(security::create_api_key),
        )
        .route("/api-keys/:id", delete(security::revoke_api_key))
        .route("/trusted-devices", get(security::trusted_devices))
        .route(
            "/trusted-devices/revoke-all",
            post(security::revoke_all_trusted_devices),
        )
        .route(
            "/trusted-devices/:id/revoke",
            post(security::revoke_trusted_device),
        )
        .route("/login-history", get(security::login_history))
        .route("/audit-log", get(security::audit_history))
        .route("/overview", get(security::overview))
        .route("/check-ip", get(security::check_ip))
        .route("/csp-report", post(security::csp_report))
        .route("/honeypot", any(security::honeypot))
        .route("/honeypot/login", any(security::honeypot))
        .route(
            "/admin/ip-blacklist",
            get(security::list_blacklist).post(security::block_ip),
        )
        .route("/admin/ip-blacklist/:ip", delete(security::unblock_ip))
}

fn social_routes() -> Router<AppState> {
    Router::new()
        .route("/providers", get(social::providers))
        .route("/authorize/:provider", get(social::authorize))
        .route("/callback/:provider", post(social::callback))
        .route("/connections", get(social::connections))
        .route("/connect/:provider", post(social::connect))
        .route("/disconnect/:provider", post(social::disconnect))
}

fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list))
        .route("/mark-read", post(notifications::mark_read))
        .route("/unread-count", get(notifications::unread_count))
        .route("/:id", get(notifications::get))
}

/// Every JSON endpoint, to be nested under `/api`.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/auth", auth_routes())
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route("/orders/:id", get(orders::get_order))
        .route("/admin/orders/:id/status", patch(orders::update_status))
        .nest("/shipping", shipping_routes())
        .nest("/marketing", marketing_routes())
        .nest("/reviews", review_routes())
        .nest("/locations", location_routes())
        .nest("/security", security_routes())
        .nest("/social", social_routes())
        .nest("/notifications", notification_routes())
        .with_state(state)
}
