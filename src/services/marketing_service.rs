//! Marketing Service - coupons, banners, flash sales and campaigns

use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::DomainError;
use crate::models::banner::{self, Entity as Banner};
use crate::models::campaign::{self, Entity as Campaign};
use crate::models::coupon::{self, Entity as Coupon, UsageContext};
use crate::models::coupon_usage::{self, Entity as CouponUsage};
use crate::models::coupon_user::{self, Entity as CouponUser};
use crate::models::flash_sale::{self, Entity as FlashSale};
use crate::models::flash_sale_item::{self, Entity as FlashSaleItem};
use crate::models::order::{self, Entity as Order};
use crate::utils::pagination::{Page, PageParams, paginate};
use crate::utils::time::{from_now, normalize_opt_ts, normalize_ts, now_str};

// ---------------------------------------------------------------------------
// Coupons
// ---------------------------------------------------------------------------

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub async fn find_coupon<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> Result<Option<coupon::Model>, DomainError> {
    Ok(Coupon::find()
        .filter(coupon::Column::Code.eq(normalize_code(code)))
        .one(db)
        .await?)
}

async fn usage_context<C: ConnectionTrait>(
    db: &C,
    coupon: &coupon::Model,
    user_id: &str,
) -> Result<UsageContext, DomainError> {
    let user_usage_count = CouponUsage::find()
        .filter(coupon_usage::Column::CouponId.eq(coupon.id))
        .filter(coupon_usage::Column::UserId.eq(user_id))
        .count(db)
        .await? as i64;

    // Cancelled orders still count as a first order
    let has_previous_orders = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .count(db)
        .await?
        > 0;

    let listed = CouponUser::find()
        .filter(coupon_user::Column::CouponId.eq(coupon.id))
        .all(db)
        .await?;
    let user_is_listed = if listed.is_empty() {
        None
    } else {
        Some(listed.iter().any(|l| l.user_id == user_id))
    };

    Ok(UsageContext {
        user_usage_count,
        has_previous_orders,
        user_is_listed,
    })
}

#[derive(Debug, Serialize)]
pub struct CouponValidation {
    pub valid: bool,
    pub discount: i64,
    pub discount_display: Option<String>,
    pub message: String,
}

impl CouponValidation {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            discount: 0,
            discount_display: None,
            message: message.into(),
        }
    }
}

pub async fn validate_coupon<C: ConnectionTrait>(
    db: &C,
    code: &str,
    user_id: &str,
    order_total: i64,
    shipping_fee: i64,
) -> Result<CouponValidation, DomainError> {
    let Some(coupon) = find_coupon(db, code).await? else {
        return Ok(CouponValidation::invalid("Invalid coupon code"));
    };

    let ctx = usage_context(db, &coupon, user_id).await?;
    if let Err(message) = coupon.check_usable(Utc::now(), order_total, ctx) {
        return Ok(CouponValidation::invalid(message));
    }

    Ok(CouponValidation {
        valid: true,
        discount: coupon.calculate_discount(order_total, shipping_fee),
        discount_display: Some(coupon.discount_display()),
        message: "Coupon applied successfully".to_string(),
    })
}

/// Validate and consume a coupon for an order. Returns the discount granted.
pub async fn apply_coupon<C: ConnectionTrait>(
    db: &C,
    code: &str,
    user_id: &str,
    order_total: i64,
    shipping_fee: i64,
    order_id: Option<&str>,
) -> Result<(coupon::Model, i64), DomainError> {
    let coupon = find_coupon(db, code)
        .await?
        .ok_or_else(|| DomainError::BusinessRule("Invalid coupon code".to_string()))?;

    let ctx = usage_context(db, &coupon, user_id).await?;
    coupon
        .check_usable(Utc::now(), order_total, ctx)
        .map_err(DomainError::BusinessRule)?;

    let discount = coupon.calculate_discount(order_total, shipping_fee);

    // Guarded increment so two concurrent orders cannot both take the last use.
    let bumped = Coupon::update_many()
        .col_expr(
            coupon::Column::UsedCount,
            Expr::col(coupon::Column::UsedCount).add(1),
        )
        .filter(coupon::Column::Id.eq(coupon.id))
        .filter(
            Condition::any()
                .add(coupon::Column::UsageLimit.is_null())
                .add(Expr::col(coupon::Column::UsedCount).lt(Expr::col(coupon::Column::UsageLimit))),
        )
        .exec(db)
        .await?;
    if bumped.rows_affected == 0 {
        return Err(DomainError::BusinessRule("Coupon usage limit reached".to_string()));
    }

    coupon_usage::ActiveModel {
        coupon_id: Set(coupon.id),
        user_id: Set(user_id.to_string()),
        order_id: Set(order_id.map(str::to_string)),
        discount_amount: Set(discount),
        used_at: Set(now_str()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Coupon {} applied by {} ({}₫)", coupon.code, user_id, discount);
    Ok((coupon, discount))
}

fn live_coupons() -> Select<Coupon> {
    let now = now_str();
    Coupon::find()
        .filter(coupon::Column::IsActive.eq(true))
        .filter(coupon::Column::ValidFrom.lte(now.clone()))
        .filter(coupon::Column::ValidUntil.gte(now))
        .order_by_asc(coupon::Column::ValidUntil)
}

pub async fn public_coupons(db: &DatabaseConnection) -> Result<Vec<coupon::Model>, DomainError> {
    Ok(live_coupons()
        .filter(coupon::Column::IsPublic.eq(true))
        .all(db)
        .await?)
}

/// Public coupons plus the ones reserved for this user.
pub async fn user_coupons(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<coupon::Model>, DomainError> {
    let reserved: Vec<i32> = CouponUser::find()
        .filter(coupon_user::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|cu| cu.coupon_id)
        .collect();

    let mut visibility = Condition::any().add(coupon::Column::IsPublic.eq(true));
    if !reserved.is_empty() {
        visibility = visibility.add(coupon::Column::Id.is_in(reserved));
    }
    Ok(live_coupons().filter(visibility).all(db).await?)
}

pub async fn list_coupons(
    db: &DatabaseConnection,
    params: &PageParams,
) -> Result<Page<coupon::Model>, DomainError> {
    paginate(
        Coupon::find().order_by_desc(coupon::Column::CreatedAt),
        db,
        params,
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub discount_type: String,
    pub discount_value: i64,
    #[serde(default)]
    pub min_order_value: i64,
    pub max_discount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: Option<i32>,
    pub valid_from: String,
    pub valid_until: String,
    pub apply_to: Option<String>,
    #[serde(default)]
    pub first_order_only: bool,
    pub is_active: Option<bool>,
    pub is_public: Option<bool>,
    #[serde(default)]
    pub specific_users: Vec<String>,
}

pub async fn create_coupon(
    db: &DatabaseConnection,
    input: NewCoupon,
) -> Result<coupon::Model, DomainError> {
    let code = normalize_code(&input.code);
    if code.is_empty() {
        return Err(DomainError::Validation("code is required".to_string()));
    }
    if !coupon::DISCOUNT_TYPES.contains(&input.discount_type.as_str()) {
        return Err(DomainError::Validation(format!(
            "Invalid discount_type: {}",
            input.discount_type
        )));
    }
    if input.discount_value < 0 || input.min_order_value < 0 {
        return Err(DomainError::Validation("Amounts must not be negative".to_string()));
    }
    if input.discount_type == coupon::TYPE_PERCENTAGE && input.discount_value > 100 {
        return Err(DomainError::Validation(
            "Percentage discount cannot exceed 100".to_string(),
        ));
    }
    let apply_to = input.apply_to.unwrap_or_else(|| "all".to_string());
    if !coupon::APPLY_TO.contains(&apply_to.as_str()) {
        return Err(DomainError::Validation(format!("Invalid apply_to: {}", apply_to)));
    }
    let valid_from = normalize_ts("valid_from", &input.valid_from)?;
    let valid_until = normalize_ts("valid_until", &input.valid_until)?;
    if valid_until <= valid_from {
        return Err(DomainError::Validation(
            "valid_until must be after valid_from".to_string(),
        ));
    }
    if find_coupon(db, &code).await?.is_some() {
        return Err(DomainError::Conflict(format!("Coupon {} already exists", code)));
    }

    let now = now_str();
    let txn = db.begin().await?;
    let created = coupon::ActiveModel {
        code: Set(code),
        name: Set(input.name.trim().to_string()),
        description: Set(input.description),
        discount_type: Set(input.discount_type),
        discount_value: Set(input.discount_value),
        min_order_value: Set(input.min_order_value),
        max_discount: Set(input.max_discount),
        usage_limit: Set(input.usage_limit),
        usage_limit_per_user: Set(input.usage_limit_per_user.unwrap_or(1)),
        used_count: Set(0),
        valid_from: Set(valid_from),
        valid_until: Set(valid_until),
        apply_to: Set(apply_to),
        first_order_only: Set(input.first_order_only),
        is_active: Set(input.is_active.unwrap_or(true)),
        is_public: Set(input.is_public.unwrap_or(true)),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for user_id in input.specific_users {
        CouponUser::insert(coupon_user::ActiveModel {
            coupon_id: Set(created.id),
            user_id: Set(user_id),
        })
        .exec_without_returning(&txn)
        .await?;
    }
    txn.commit().await?;

    tracing::info!("Created coupon {}", created.code);
    Ok(created)
}

// ---------------------------------------------------------------------------
// Banners
// ---------------------------------------------------------------------------

/// Active banners in their window. Each listed banner counts one view.
pub async fn active_banners(
    db: &DatabaseConnection,
    position: Option<&str>,
    category_id: Option<&str>,
) -> Result<Vec<banner::Model>, DomainError> {
    let now = now_str();
    let mut query = Banner::find()
        .filter(banner::Column::IsActive.eq(true))
        .filter(
            Condition::any()
                .add(banner::Column::StartDate.is_null())
                .add(banner::Column::StartDate.lte(now.clone())),
        )
        .filter(
            Condition::any()
                .add(banner::Column::EndDate.is_null())
                .add(banner::Column::EndDate.gte(now)),
        );

    if let Some(position) = position {
        query = query.filter(banner::Column::Position.eq(position));
    }
    if let Some(category_id) = category_id {
        query = query.filter(
            Condition::any()
                .add(banner::Column::CategoryId.is_null())
                .add(banner::Column::CategoryId.eq(category_id)),
        );
    }

    let mut banners = query
        .order_by_asc(banner::Column::SortOrder)
        .order_by_desc(banner::Column::CreatedAt)
        .all(db)
        .await?;

    if !banners.is_empty() {
        let ids: Vec<i32> = banners.iter().map(|b| b.id).collect();
        Banner::update_many()
            .col_expr(
                banner::Column::ViewCount,
                Expr::col(banner::Column::ViewCount).add(1),
            )
            .filter(banner::Column::Id.is_in(ids))
            .exec(db)
            .await?;
        for banner in &mut banners {
            banner.view_count += 1;
        }
    }
    Ok(banners)
}

pub async fn track_banner_click(db: &DatabaseConnection, id: i32) -> Result<(), DomainError> {
    let result = Banner::update_many()
        .col_expr(
            banner::Column::ClickCount,
            Expr::col(banner::Column::ClickCount).add(1),
        )
        .filter(banner::Column::Id.eq(id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(DomainError::not_found("Banner"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct NewBanner {
    pub title: String,
    pub subtitle: Option<String>,
    pub image: String,
    pub image_mobile: Option<String>,
    pub link_url: Option<String>,
    pub link_text: Option<String>,
    pub position: Option<String>,
    pub category_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub sort_order: i32,
}

pub async fn create_banner(
    db: &DatabaseConnection,
    input: NewBanner,
) -> Result<banner::Model, DomainError> {
    if input.title.trim().is_empty() || input.image.trim().is_empty() {
        return Err(DomainError::Validation("title and image are required".to_string()));
    }
    let position = input.position.unwrap_or_else(|| "hero".to_string());
    if !banner::POSITIONS.contains(&position.as_str()) {
        return Err(DomainError::Validation(format!("Invalid position: {}", position)));
    }

    let now = now_str();
    let created = banner::ActiveModel {
        title: Set(input.title.trim().to_string()),
        subtitle: Set(input.subtitle),
        image: Set(input.image),
        image_mobile: Set(input.image_mobile),
        link_url: Set(input.link_url),
        link_text: Set(input.link_text),
        position: Set(position),
        category_id: Set(input.category_id),
        start_date: Set(normalize_opt_ts("start_date", input.start_date.as_deref())?),
        end_date: Set(normalize_opt_ts("end_date", input.end_date.as_deref())?),
        is_active: Set(input.is_active.unwrap_or(true)),
        sort_order: Set(input.sort_order),
        view_count: Set(0),
        click_count: Set(0),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Created banner {} ({})", created.id, created.position);
    Ok(created)
}

// ---------------------------------------------------------------------------
// Flash sales
// ---------------------------------------------------------------------------

pub fn flash_sale_dto(sale: &flash_sale::Model, items: &[flash_sale_item::Model]) -> Value {
    let now = Utc::now();
    json!({
        "id": sale.id,
        "name": sale.name,
        "description": sale.description,
        "start_time": sale.start_time,
        "end_time": sale.end_time,
        "status": sale.derived_status(now),
        "is_ongoing": sale.is_ongoing(now),
        "is_upcoming": sale.is_upcoming(now),
        "time_remaining": sale.time_remaining(now),
        "items": items.iter().map(|i| i.to_dto()).collect::<Vec<_>>(),
    })
}

/// Persist the clock-derived status when it drifted from the stored one.
async fn refresh_status(
    db: &DatabaseConnection,
    sale: flash_sale::Model,
) -> Result<flash_sale::Model, DomainError> {
    let derived = sale.derived_status(Utc::now());
    if sale.status == derived {
        return Ok(sale);
    }
    let mut active: flash_sale::ActiveModel = sale.into();
    active.status = Set(derived.to_string());
    active.updated_at = Set(now_str());
    Ok(active.update(db).await?)
}

async fn items_of(
    db: &DatabaseConnection,
    sale_id: &str,
) -> Result<Vec<flash_sale_item::Model>, DomainError> {
    Ok(FlashSaleItem::find()
        .filter(flash_sale_item::Column::FlashSaleId.eq(sale_id))
        .filter(flash_sale_item::Column::IsActive.eq(true))
        .order_by_asc(flash_sale_item::Column::SortOrder)
        .all(db)
        .await?)
}

fn selling_sales() -> Select<FlashSale> {
    FlashSale::find()
        .filter(flash_sale::Column::IsActive.eq(true))
        .filter(flash_sale::Column::Status.ne(flash_sale::STATUS_CANCELLED))
}

pub async fn active_flash_sales(db: &DatabaseConnection) -> Result<Vec<Value>, DomainError> {
    let now = now_str();
    let sales = selling_sales()
        .filter(flash_sale::Column::StartTime.lte(now.clone()))
        .filter(flash_sale::Column::EndTime.gte(now))
        .order_by_asc(flash_sale::Column::EndTime)
        .all(db)
        .await?;

    let mut out = Vec::with_capacity(sales.len());
    for sale in sales {
        let sale = refresh_status(db, sale).await?;
        let items = items_of(db, &sale.id).await?;
        out.push(flash_sale_dto(&sale, &items));
    }
    Ok(out)
}

pub async fn upcoming_flash_sales(db: &DatabaseConnection) -> Result<Vec<Value>, DomainError> {
    let sales = selling_sales()
        .filter(flash_sale::Column::StartTime.gt(now_str()))
        .order_by_asc(flash_sale::Column::StartTime)
        .limit(5)
        .all(db)
        .await?;

    let mut out = Vec::with_capacity(sales.len());
    for sale in sales {
        let items = items_of(db, &sale.id).await?;
        out.push(flash_sale_dto(&sale, &items));
    }
    Ok(out)
}

pub async fn flash_sale_detail(db: &DatabaseConnection, id: &str) -> Result<Value, DomainError> {
    let sale = FlashSale::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Flash sale"))?;
    let sale = refresh_status(db, sale).await?;
    let items = items_of(db, &sale.id).await?;
    Ok(flash_sale_dto(&sale, &items))
}

/// The ongoing flash offer for a product, if any.
pub async fn flash_price(
    db: &DatabaseConnection,
    product_id: &str,
) -> Result<Option<(flash_sale::Model, flash_sale_item::Model)>, DomainError> {
    let now = now_str();
    let found = FlashSaleItem::find()
        .filter(flash_sale_item::Column::ProductId.eq(product_id))
        .filter(flash_sale_item::Column::IsActive.eq(true))
        .find_also_related(FlashSale)
        .filter(flash_sale::Column::IsActive.eq(true))
        .filter(flash_sale::Column::Status.ne(flash_sale::STATUS_CANCELLED))
        .filter(flash_sale::Column::StartTime.lte(now.clone()))
        .filter(flash_sale::Column::EndTime.gte(now))
        .order_by_asc(flash_sale_item::Column::FlashPrice)
        .all(db)
        .await?;

    Ok(found
        .into_iter()
        .filter_map(|(item, sale)| sale.map(|s| (s, item)))
        .find(|(_, item)| !item.is_sold_out()))
}

#[derive(Debug, Deserialize)]
pub struct NewFlashSaleItem {
    pub product_id: String,
    pub product_name: String,
    pub flash_price: i64,
    pub original_price: i64,
    #[serde(default)]
    pub quantity_limit: i32,
    pub per_user_limit: Option<i32>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct NewFlashSale {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub items: Vec<NewFlashSaleItem>,
}

pub async fn create_flash_sale(
    db: &DatabaseConnection,
    input: NewFlashSale,
) -> Result<Value, DomainError> {
    if input.name.trim().is_empty() {
        return Err(DomainError::Validation("name is required".to_string()));
    }
    let start_time = normalize_ts("start_time", &input.start_time)?;
    let end_time = normalize_ts("end_time", &input.end_time)?;
    if end_time <= start_time {
        return Err(DomainError::Validation(
            "end_time must be after start_time".to_string(),
        ));
    }
    for item in &input.items {
        if item.flash_price <= 0 || item.flash_price >= item.original_price {
            return Err(DomainError::Validation(format!(
                "flash_price for {} must be positive and below original_price",
                item.product_id
            )));
        }
        if item.quantity_limit < 0 {
            return Err(DomainError::Validation(
                "quantity_limit must not be negative".to_string(),
            ));
        }
    }

    let now = now_str();
    let txn = db.begin().await?;
    let sale = flash_sale::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        name: Set(input.name.trim().to_string()),
        description: Set(input.description),
        start_time: Set(start_time),
        end_time: Set(end_time),
        status: Set(flash_sale::STATUS_SCHEDULED.to_string()),
        is_active: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(input.items.len());
    for item in input.items {
        let created = flash_sale_item::ActiveModel {
            flash_sale_id: Set(sale.id.clone()),
            product_id: Set(item.product_id),
            product_name: Set(item.product_name),
            flash_price: Set(item.flash_price),
            original_price: Set(item.original_price),
            quantity_limit: Set(item.quantity_limit),
            quantity_sold: Set(0),
            per_user_limit: Set(item.per_user_limit.unwrap_or(1)),
            is_active: Set(true),
            sort_order: Set(item.sort_order),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        items.push(created);
    }
    txn.commit().await?;

    let sale = refresh_status(db, sale).await?;
    tracing::info!("Created flash sale {} with {} items", sale.id, items.len());
    Ok(flash_sale_dto(&sale, &items))
}

/// Reserve `quantity` units of a flash item for an order line.
///
/// The stock check and the increment are a single conditional UPDATE, so
/// concurrent buyers can never push `quantity_sold` past the limit.
pub async fn purchase_flash_item<C: ConnectionTrait>(
    db: &C,
    item_id: i32,
    product_id: &str,
    quantity: i32,
) -> Result<flash_sale_item::Model, DomainError> {
    let (item, sale) = FlashSaleItem::find_by_id(item_id)
        .find_also_related(FlashSale)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Flash sale item"))?;
    let sale = sale.ok_or_else(|| DomainError::not_found("Flash sale"))?;

    if !sale.is_ongoing(Utc::now()) || !item.is_active {
        return Err(DomainError::BusinessRule("Flash sale is not active".to_string()));
    }
    if item.product_id != product_id {
        return Err(DomainError::Validation(
            "Flash sale item does not match product".to_string(),
        ));
    }
    if quantity <= 0 {
        return Err(DomainError::Validation("quantity must be positive".to_string()));
    }
    if item.per_user_limit > 0 && quantity > item.per_user_limit {
        return Err(DomainError::BusinessRule(format!(
            "Maximum {} per customer",
            item.per_user_limit
        )));
    }
    if item.is_sold_out() {
        return Err(DomainError::BusinessRule("Flash sale item is sold out".to_string()));
    }

    let result = FlashSaleItem::update_many()
        .col_expr(
            flash_sale_item::Column::QuantitySold,
            Expr::col(flash_sale_item::Column::QuantitySold).add(quantity),
        )
        .filter(flash_sale_item::Column::Id.eq(item_id))
        .filter(
            Condition::any()
                .add(flash_sale_item::Column::QuantityLimit.eq(0))
                .add(
                    Expr::expr(Expr::col(flash_sale_item::Column::QuantitySold).add(quantity))
                        .lte(Expr::col(flash_sale_item::Column::QuantityLimit)),
                ),
        )
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(DomainError::BusinessRule(
            "Not enough flash sale stock left".to_string(),
        ));
    }

    FlashSaleItem::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Flash sale item"))
}

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

pub async fn list_campaigns(
    db: &DatabaseConnection,
    status: Option<&str>,
    params: &PageParams,
) -> Result<Page<campaign::Model>, DomainError> {
    let mut query = Campaign::find();
    if let Some(status) = status {
        query = query.filter(campaign::Column::Status.eq(status));
    }
    paginate(
        query.order_by_desc(campaign::Column::CreatedAt),
        db,
        params,
    )
    .await
}

pub async fn get_campaign(db: &DatabaseConnection, id: &str) -> Result<campaign::Model, DomainError> {
    Campaign::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Campaign"))
}

#[derive(Debug, Default, Deserialize)]
pub struct CampaignInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub campaign_type: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub budget: Option<i64>,
    pub target_audience: Option<Value>,
    pub coupon_id: Option<i32>,
}

fn check_campaign_choices(input: &CampaignInput) -> Result<(), DomainError> {
    if let Some(t) = &input.campaign_type
        && !campaign::TYPES.contains(&t.as_str())
    {
        return Err(DomainError::Validation(format!("Invalid campaign_type: {}", t)));
    }
    if let Some(s) = &input.status
        && !campaign::STATUSES.contains(&s.as_str())
    {
        return Err(DomainError::Validation(format!("Invalid status: {}", s)));
    }
    if input.budget.is_some_and(|b| b < 0) {
        return Err(DomainError::Validation("budget must not be negative".to_string()));
    }
    Ok(())
}

pub async fn create_campaign(
    db: &DatabaseConnection,
    input: CampaignInput,
) -> Result<campaign::Model, DomainError> {
    check_campaign_choices(&input)?;
    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DomainError::Validation("name is required".to_string()))?
        .to_string();

    let now = now_str();
    let created = campaign::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        name: Set(name),
        description: Set(input.description.unwrap_or_default()),
        campaign_type: Set(input.campaign_type.unwrap_or_else(|| "email".to_string())),
        status: Set(input.status.unwrap_or_else(|| "draft".to_string())),
        start_date: Set(normalize_opt_ts("start_date", input.start_date.as_deref())?),
        end_date: Set(normalize_opt_ts("end_date", input.end_date.as_deref())?),
        budget: Set(input.budget.unwrap_or(0)),
        target_audience: Set(input.target_audience.unwrap_or_else(|| json!({})).to_string()),
        coupon_id: Set(input.coupon_id),
        sent_count: Set(0),
        open_count: Set(0),
        click_count: Set(0),
        conversion_count: Set(0),
        revenue: Set(0),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    tracing::info!("Created campaign {} ({})", created.id, created.campaign_type);
    Ok(created)
}

pub async fn update_campaign(
    db: &DatabaseConnection,
    id: &str,
    input: CampaignInput,
) -> Result<campaign::Model, DomainError> {
    check_campaign_choices(&input)?;
    let existing = get_campaign(db, id).await?;
    let mut active: campaign::ActiveModel = existing.into();

    if let Some(name) = input.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = input.description {
        active.description = Set(description);
    }
    if let Some(t) = input.campaign_type {
        active.campaign_type = Set(t);
    }
    if let Some(s) = input.status {
        active.status = Set(s);
    }
    if input.start_date.is_some() {
        active.start_date = Set(normalize_opt_ts("start_date", input.start_date.as_deref())?);
    }
    if input.end_date.is_some() {
        active.end_date = Set(normalize_opt_ts("end_date", input.end_date.as_deref())?);
    }
    if let Some(budget) = input.budget {
        active.budget = Set(budget);
    }
    if let Some(audience) = input.target_audience {
        active.target_audience = Set(audience.to_string());
    }
    if input.coupon_id.is_some() {
        active.coupon_id = Set(input.coupon_id);
    }
    active.updated_at = Set(now_str());
    Ok(active.update(db).await?)
}

/// Bump a campaign funnel counter: `sent`, `open`, `click` or `conversion`.
pub async fn track_campaign(
    db: &DatabaseConnection,
    id: &str,
    event: &str,
    revenue: Option<i64>,
) -> Result<campaign::Model, DomainError> {
    let column = match event {
        "sent" => campaign::Column::SentCount,
        "open" => campaign::Column::OpenCount,
        "click" => campaign::Column::ClickCount,
        "conversion" => campaign::Column::ConversionCount,
        other => {
            return Err(DomainError::Validation(format!("Unknown event: {}", other)));
        }
    };

    let mut update = Campaign::update_many()
        .col_expr(column, Expr::col(column).add(1))
        .col_expr(campaign::Column::UpdatedAt, Expr::value(now_str()))
        .filter(campaign::Column::Id.eq(id));
    if event == "conversion"
        && let Some(revenue) = revenue.filter(|r| *r > 0)
    {
        update = update.col_expr(
            campaign::Column::Revenue,
            Expr::col(campaign::Column::Revenue).add(revenue),
        );
    }

    if update.exec(db).await?.rows_affected == 0 {
        return Err(DomainError::not_found("Campaign"));
    }
    get_campaign(db, id).await
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

pub async fn statistics(db: &DatabaseConnection) -> Result<Value, DomainError> {
    let now = now_str();
    let month_ago = from_now(-Duration::days(30));

    let active_coupons = live_coupons().count(db).await?;
    let total_coupon_usages = CouponUsage::find()
        .filter(coupon_usage::Column::UsedAt.gte(month_ago.clone()))
        .count(db)
        .await?;
    let active_banners = Banner::find()
        .filter(banner::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let active_flash_sales = selling_sales()
        .filter(flash_sale::Column::StartTime.lte(now.clone()))
        .filter(flash_sale::Column::EndTime.gte(now))
        .count(db)
        .await?;
    let active_campaigns = Campaign::find()
        .filter(campaign::Column::Status.eq("active"))
        .count(db)
        .await?;
    let total_campaign_conversions: i64 = Campaign::find()
        .filter(campaign::Column::UpdatedAt.gte(month_ago))
        .all(db)
        .await?
        .iter()
        .map(|c| i64::from(c.conversion_count))
        .sum();

    Ok(json!({
        "active_coupons": active_coupons,
        "total_coupon_usages": total_coupon_usages,
        "active_banners": active_banners,
        "active_flash_sales": active_flash_sales,
        "active_campaigns": active_campaigns,
        "total_campaign_conversions": total_campaign_conversions,
    }))
}
