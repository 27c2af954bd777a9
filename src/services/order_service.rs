//! Order Service - checkout with coupons and flash-sale pricing

use chrono::Utc;
use rand::RngCore;
use sea_orm::*;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::DomainError;
use crate::models::order::{self, Entity as Order};
use crate::models::order_item::{self, Entity as OrderItem};
use crate::services::marketing_service;
use crate::utils::pagination::{Page, PageParams, paginate};
use crate::utils::time::now_str;

#[derive(Debug, Deserialize)]
pub struct OrderItemInput {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub flash_sale_item_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct NewOrder {
    pub items: Vec<OrderItemInput>,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub shipping_fee: i64,
    pub recipient_name: String,
    pub phone: String,
    pub address: String,
    pub ward_code: Option<String>,
    pub coupon_code: Option<String>,
}

/// `OWL` + date + 6 uppercase hex chars.
pub fn generate_order_number() -> String {
    let mut suffix = [0u8; 3];
    rand::thread_rng().fill_bytes(&mut suffix);
    format!(
        "OWL{}{}",
        Utc::now().format("%Y%m%d"),
        hex::encode_upper(suffix)
    )
}

pub fn order_dto(order: &order::Model, items: &[order_item::Model]) -> Result<Value, DomainError> {
    let mut value = serde_json::to_value(order)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("items".into(), serde_json::to_value(items)?);
    }
    Ok(value)
}

fn validate(input: &NewOrder) -> Result<(), DomainError> {
    if input.items.is_empty() {
        return Err(DomainError::Validation("Order must contain at least one item".to_string()));
    }
    for item in &input.items {
        if item.product_id.trim().is_empty() {
            return Err(DomainError::Validation("product_id is required".to_string()));
        }
        if item.quantity <= 0 {
            return Err(DomainError::Validation("quantity must be positive".to_string()));
        }
        if item.unit_price < 0 {
            return Err(DomainError::Validation("unit_price must not be negative".to_string()));
        }
    }
    if input.shipping_fee < 0 {
        return Err(DomainError::Validation("shipping_fee must not be negative".to_string()));
    }
    if let Some(method) = &input.payment_method
        && !order::PAYMENT_METHODS.contains(&method.as_str())
    {
        return Err(DomainError::Validation(format!("Invalid payment_method: {}", method)));
    }
    if input.recipient_name.trim().is_empty()
        || input.phone.trim().is_empty()
        || input.address.trim().is_empty()
    {
        return Err(DomainError::Validation(
            "recipient_name, phone and address are required".to_string(),
        ));
    }
    Ok(())
}

pub async fn create_order(
    db: &DatabaseConnection,
    user_id: &str,
    input: NewOrder,
) -> Result<(order::Model, Vec<order_item::Model>), DomainError> {
    validate(&input)?;

    let order_id = uuid::Uuid::new_v4().to_string();
    let txn = db.begin().await?;

    let mut lines = Vec::with_capacity(input.items.len());
    for item in input.items {
        let unit_price = match item.flash_sale_item_id {
            Some(flash_id) => {
                marketing_service::purchase_flash_item(&txn, flash_id, &item.product_id, item.quantity)
                    .await?
                    .flash_price
            }
            None => item.unit_price,
        };
        lines.push((item, unit_price));
    }

    let subtotal: i64 = lines
        .iter()
        .map(|(item, price)| price * i64::from(item.quantity))
        .sum();

    let (coupon_code, discount) = match input.coupon_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => {
            let (coupon, discount) = marketing_service::apply_coupon(
                &txn,
                code,
                user_id,
                subtotal,
                input.shipping_fee,
                Some(&order_id),
            )
            .await?;
            (Some(coupon.code), discount)
        }
        _ => (None, 0),
    };

    let total = (subtotal + input.shipping_fee - discount).max(0);
    let now = now_str();
    let order = order::ActiveModel {
        id: Set(order_id.clone()),
        order_number: Set(generate_order_number()),
        user_id: Set(Some(user_id.to_string())),
        status: Set("pending".to_string()),
        payment_method: Set(input.payment_method.unwrap_or_else(|| "cod".to_string())),
        payment_status: Set("unpaid".to_string()),
        subtotal: Set(subtotal),
        shipping_fee: Set(input.shipping_fee),
        discount: Set(discount),
        total: Set(total),
        coupon_code: Set(coupon_code),
        recipient_name: Set(input.recipient_name.trim().to_string()),
        phone: Set(input.phone.trim().to_string()),
        address: Set(input.address.trim().to_string()),
        ward_code: Set(input.ward_code),
        delivered_at: Set(None),
        paid_at: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (item, unit_price) in lines {
        let created = order_item::ActiveModel {
            order_id: Set(order_id.clone()),
            product_id: Set(item.product_id),
            product_name: Set(item.product_name),
            quantity: Set(item.quantity),
            unit_price: Set(unit_price),
            flash_sale_item_id: Set(item.flash_sale_item_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        items.push(created);
    }

    txn.commit().await?;
    tracing::info!(
        "Order {} created for {} (total {}₫)",
        order.order_number,
        user_id,
        order.total
    );
    Ok((order, items))
}

pub async fn get_order(
    db: &DatabaseConnection,
    id: &str,
) -> Result<(order::Model, Vec<order_item::Model>), DomainError> {
    let order = Order::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Order"))?;
    let items = order.find_related(OrderItem).all(db).await?;
    Ok((order, items))
}

pub async fn list_orders(
    db: &DatabaseConnection,
    user_id: &str,
    params: &PageParams,
) -> Result<Page<order::Model>, DomainError> {
    paginate(
        Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt),
        db,
        params,
    )
    .await
}

pub async fn update_status(
    db: &DatabaseConnection,
    id: &str,
    status: &str,
) -> Result<order::Model, DomainError> {
    if !order::STATUSES.contains(&status) {
        return Err(DomainError::Validation(format!("Invalid status: {}", status)));
    }
    let existing = Order::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Order"))?;

    let now = now_str();
    let previous = existing.status.clone();
    let mut active: order::ActiveModel = existing.into();
    active.status = Set(status.to_string());
    if status == "delivered" {
        active.delivered_at = Set(Some(now.clone()));
    }
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    tracing::info!("Order {} status {} -> {}", updated.order_number, previous, status);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_shape() {
        let n = generate_order_number();
        assert!(n.starts_with("OWL"));
        assert_eq!(n.len(), 3 + 8 + 6);
        assert!(n[11..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
