use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::error::ApiResult;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::{AdminUser, AuthUser};
use crate::models::{banner, campaign, coupon};
use crate::services::marketing_service::{
    self, CampaignInput, CouponValidation, NewBanner, NewCoupon, NewFlashSale,
};
use crate::utils::pagination::{Page, PageParams};

// ---------------------------------------------------------------------------
// Coupons
// ---------------------------------------------------------------------------

pub async fn public_coupons(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    let coupons = marketing_service::public_coupons(state.db()).await?;
    Ok(Json(coupons.iter().map(coupon::Model::to_dto).collect()))
}

pub async fn my_coupons(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Value>>> {
    let coupons = marketing_service::user_coupons(state.db(), auth.id()).await?;
    Ok(Json(coupons.iter().map(coupon::Model::to_dto).collect()))
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub code: String,
    pub order_total: i64,
    #[serde(default)]
    pub shipping_fee: i64,
}

pub async fn validate_coupon(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ValidateRequest>,
) -> ApiResult<Json<CouponValidation>> {
    Ok(Json(
        marketing_service::validate_coupon(
            state.db(),
            &payload.code,
            auth.id(),
            payload.order_total,
            payload.shipping_fee,
        )
        .await?,
    ))
}

pub async fn admin_list_coupons(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<Value>>> {
    let page = marketing_service::list_coupons(state.db(), &params).await?;
    Ok(Json(page.map(|c| c.to_dto())))
}

pub async fn admin_create_coupon(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<NewCoupon>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let coupon = marketing_service::create_coupon(state.db(), payload).await?;
    Ok((StatusCode::CREATED, Json(coupon.to_dto())))
}

// ---------------------------------------------------------------------------
// Banners
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct BannerQuery {
    pub position: Option<String>,
    pub category: Option<String>,
}

pub async fn banners(
    State(state): State<AppState>,
    Query(query): Query<BannerQuery>,
) -> ApiResult<Json<Vec<Value>>> {
    let banners = marketing_service::active_banners(
        state.db(),
        query.position.as_deref(),
        query.category.as_deref(),
    )
    .await?;
    Ok(Json(banners.iter().map(banner::Model::to_dto).collect()))
}

pub async fn banner_click(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    marketing_service::track_banner_click(state.db(), id).await?;
    Ok(Json(json!({ "tracked": true })))
}

pub async fn admin_create_banner(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<NewBanner>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let banner = marketing_service::create_banner(state.db(), payload).await?;
    Ok((StatusCode::CREATED, Json(banner.to_dto())))
}

// ---------------------------------------------------------------------------
// Flash sales
// ---------------------------------------------------------------------------

pub async fn flash_sales(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(marketing_service::active_flash_sales(state.db()).await?))
}

pub async fn upcoming_flash_sales(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(marketing_service::upcoming_flash_sales(state.db()).await?))
}

pub async fn flash_sale_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(marketing_service::flash_sale_detail(state.db(), &id).await?))
}

#[derive(Deserialize)]
pub struct FlashPriceQuery {
    pub product_id: Option<String>,
}

pub async fn flash_price(
    State(state): State<AppState>,
    Query(query): Query<FlashPriceQuery>,
) -> ApiResult<Json<Value>> {
    let product_id = query
        .product_id
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| DomainError::Validation("product_id required".to_string()))?;

    let body = match marketing_service::flash_price(state.db(), &product_id).await? {
        Some((sale, item)) => json!({
            "flash_sale": {
                "id": sale.id,
                "name": sale.name,
                "end_time": sale.end_time,
                "time_remaining": sale.time_remaining(chrono::Utc::now()),
            },
            "item": item.to_dto(),
        }),
        None => json!({ "flash_sale": null }),
    };
    Ok(Json(body))
}

pub async fn admin_create_flash_sale(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<NewFlashSale>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let sale = marketing_service::create_flash_sale(state.db(), payload).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CampaignQuery {
    pub status: Option<String>,
}

pub async fn admin_list_campaigns(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<CampaignQuery>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<Value>>> {
    let page =
        marketing_service::list_campaigns(state.db(), query.status.as_deref(), &params).await?;
    Ok(Json(page.map(|c| c.to_dto())))
}

pub async fn admin_create_campaign(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<CampaignInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let campaign = marketing_service::create_campaign(state.db(), payload).await?;
    Ok((StatusCode::CREATED, Json(campaign.to_dto())))
}

pub async fn admin_get_campaign(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(
        marketing_service::get_campaign(state.db(), &id).await?.to_dto(),
    ))
}

pub async fn admin_update_campaign(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<CampaignInput>,
) -> ApiResult<Json<Value>> {
    let campaign: campaign::Model =
        marketing_service::update_campaign(state.db(), &id, payload).await?;
    Ok(Json(campaign.to_dto()))
}

#[derive(Deserialize)]
pub struct TrackRequest {
    pub event: String,
    pub revenue: Option<i64>,
}

pub async fn admin_track_campaign(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<TrackRequest>,
) -> ApiResult<Json<Value>> {
    let campaign =
        marketing_service::track_campaign(state.db(), &id, &payload.event, payload.revenue)
            .await?;
    Ok(Json(campaign.to_dto()))
}

pub async fn admin_statistics(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> ApiResult<Json<Value>> {
    Ok(Json(marketing_service::statistics(state.db()).await?))
}
