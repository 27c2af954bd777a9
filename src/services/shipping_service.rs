//! Shipping Service - shipments, tracking history, delivery attempts and COD settlement
//!
//! Every status change goes through [`transition`], which runs inside a
//! transaction and writes the new row with a compare-and-set on
//! `updated_at`. Two concurrent changes to the same shipment cannot both
//! pass the final-status guard.

use chrono::{Duration, NaiveDate, Utc};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::DomainError;
use crate::models::cod_reconciliation::{self, Entity as CodReconciliation};
use crate::models::cod_reconciliation_shipment::{self, Entity as CodReconciliationShipment};
use crate::models::delivery_attempt::{self, Entity as DeliveryAttempt};
use crate::models::order::{self, Entity as Order};
use crate::models::shipment::{self, Entity as Shipment};
use crate::models::shipment_event::{self, Entity as ShipmentEvent};
use crate::services::notification_service::{self, NewNotification};
use crate::utils::pagination::{Page, PageParams, paginate};
use crate::utils::round2;
use crate::utils::time::{from_now, normalize_opt_ts, now_str};

pub const BASE_FEE: i64 = 30_000;
pub const WEIGHT_STEP_GRAMS: i32 = 500;
pub const WEIGHT_STEP_FEE: i64 = 5_000;
pub const MIN_COD_FEE: i64 = 10_000;
pub const DEFAULT_WEIGHT: i32 = 500;
pub const DEFAULT_REQUIRED_NOTE: &str = "CHOTHUHANG";

// ---------------------------------------------------------------------------
// Fees and services
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    pub shipping_fee: i64,
    pub insurance_fee: i64,
    pub cod_fee: i64,
    pub total_fee: i64,
}

/// Flat-rate estimate. The destination is accepted for carrier parity but
/// does not change the price.
pub fn calculate_fee(weight: i32, cod_amount: i64) -> FeeBreakdown {
    let extra_steps = if weight > WEIGHT_STEP_GRAMS {
        i64::from((weight - WEIGHT_STEP_GRAMS) / WEIGHT_STEP_GRAMS)
    } else {
        0
    };
    let shipping_fee = BASE_FEE + extra_steps * WEIGHT_STEP_FEE;
    let cod_fee = if cod_amount > 0 {
        MIN_COD_FEE.max(cod_amount / 100)
    } else {
        0
    };
    FeeBreakdown {
        shipping_fee,
        insurance_fee: 0,
        cod_fee,
        total_fee: shipping_fee + cod_fee,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceOption {
    pub service_id: i32,
    pub name: &'static str,
    pub fee: i64,
    pub estimated_days: &'static str,
}

pub fn available_services() -> Vec<ServiceOption> {
    vec![
        ServiceOption {
            service_id: 1,
            name: "Standard",
            fee: 30_000,
            estimated_days: "3-5",
        },
        ServiceOption {
            service_id: 2,
            name: "Express",
            fee: 50_000,
            estimated_days: "1-2",
        },
    ]
}

pub fn provider_display(provider: &str) -> &'static str {
    match provider {
        "ghn" => "GHN",
        "ghtk" => "GHTK",
        "vtp" => "Viettel Post",
        "vnpost" => "VNPost",
        "jnt" => "J&T Express",
        "ninjavan" => "Ninja Van",
        _ => "Manual",
    }
}

// ---------------------------------------------------------------------------
// Creation and lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct NewShipment {
    pub order_id: String,
    pub provider: Option<String>,
    pub tracking_code: Option<String>,
    pub provider_order_id: Option<String>,
    #[serde(default)]
    pub cod_amount: i64,
    pub weight: Option<i32>,
    pub dimensions: Option<String>,
    pub shipping_fee: Option<i64>,
    pub insurance_fee: Option<i64>,
    pub cod_fee: Option<i64>,
    pub total_fee: Option<i64>,
    pub service_id: Option<i32>,
    pub service_type: Option<String>,
    pub expected_delivery: Option<String>,
    pub required_note: Option<String>,
    pub note: Option<String>,
}

fn generate_tracking_code() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("SHP{}", id[..8].to_uppercase())
}

pub async fn create_shipment(
    db: &DatabaseConnection,
    input: NewShipment,
) -> Result<shipment::Model, DomainError> {
    let provider = input
        .provider
        .unwrap_or_else(|| shipment::DEFAULT_PROVIDER.to_string());
    if !shipment::PROVIDERS.contains(&provider.as_str()) {
        return Err(DomainError::Validation(format!("Invalid provider: {}", provider)));
    }
    let weight = input.weight.unwrap_or(DEFAULT_WEIGHT);
    if weight <= 0 {
        return Err(DomainError::Validation("weight must be positive".to_string()));
    }
    if input.cod_amount < 0 {
        return Err(DomainError::Validation("cod_amount must not be negative".to_string()));
    }
    let expected_delivery = normalize_opt_ts("expected_delivery", input.expected_delivery.as_deref())?;

    let txn = db.begin().await?;
    let order = Order::find_by_id(input.order_id.clone())
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Order"))?;

    let exists = Shipment::find()
        .filter(shipment::Column::OrderId.eq(order.id.as_str()))
        .count(&txn)
        .await?
        > 0;
    if exists {
        return Err(DomainError::BusinessRule(
            "Shipment already exists for this order".to_string(),
        ));
    }

    let tracking_code = input
        .tracking_code
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(generate_tracking_code);
    let taken = Shipment::find()
        .filter(shipment::Column::TrackingCode.eq(tracking_code.as_str()))
        .count(&txn)
        .await?
        > 0;
    if taken {
        return Err(DomainError::Conflict(format!(
            "Tracking code {} is already in use",
            tracking_code
        )));
    }

    let estimate = calculate_fee(weight, input.cod_amount);
    let shipping_fee = input.shipping_fee.unwrap_or(estimate.shipping_fee);
    let insurance_fee = input.insurance_fee.unwrap_or(estimate.insurance_fee);
    let cod_fee = input.cod_fee.unwrap_or(estimate.cod_fee);
    let total_fee = input
        .total_fee
        .filter(|t| *t > 0)
        .unwrap_or(shipping_fee + insurance_fee + cod_fee);

    let now = now_str();
    let created = shipment::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        order_id: Set(order.id.clone()),
        provider: Set(provider),
        tracking_code: Set(tracking_code),
        provider_order_id: Set(input.provider_order_id),
        status: Set(shipment::STATUS_PENDING.to_string()),
        provider_status: Set(None),
        weight: Set(weight),
        dimensions: Set(input.dimensions),
        shipping_fee: Set(shipping_fee),
        insurance_fee: Set(insurance_fee),
        cod_fee: Set(cod_fee),
        total_fee: Set(total_fee),
        cod_amount: Set(input.cod_amount),
        cod_collected: Set(false),
        cod_transferred: Set(false),
        cod_transfer_date: Set(None),
        service_id: Set(input.service_id),
        service_type: Set(input.service_type),
        expected_delivery: Set(expected_delivery),
        delivery_attempts: Set(0),
        max_delivery_attempts: Set(3),
        required_note: Set(input
            .required_note
            .unwrap_or_else(|| DEFAULT_REQUIRED_NOTE.to_string())),
        note: Set(input.note),
        picked_up_at: Set(None),
        delivered_at: Set(None),
        returned_at: Set(None),
        cancelled_at: Set(None),
        last_location: Set(None),
        last_status_update: Set(Some(now.clone())),
        fail_reason: Set(None),
        cancel_reason: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
    }
    .insert(&txn)
    .await?;

    append_event(&txn, &created.id, "created", "Shipment created", None, None).await?;

    let order_number = order.order_number.clone();
    let mut order: order::ActiveModel = order.into();
    order.status = Set("shipping".to_string());
    order.updated_at = Set(now);
    order.update(&txn).await?;

    txn.commit().await?;
    tracing::info!(
        "Shipment {} created for order {}",
        created.tracking_code,
        order_number
    );
    Ok(created)
}

pub async fn get_shipment(db: &DatabaseConnection, id: &str) -> Result<shipment::Model, DomainError> {
    Shipment::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Shipment"))
}

pub async fn get_by_tracking_code(
    db: &DatabaseConnection,
    code: &str,
) -> Result<shipment::Model, DomainError> {
    Shipment::find()
        .filter(shipment::Column::TrackingCode.eq(code.trim()))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Shipment"))
}

/// Tracking history, newest first.
pub async fn events_of(
    db: &DatabaseConnection,
    shipment_id: &str,
) -> Result<Vec<shipment_event::Model>, DomainError> {
    Ok(ShipmentEvent::find()
        .filter(shipment_event::Column::ShipmentId.eq(shipment_id))
        .order_by_desc(shipment_event::Column::OccurredAt)
        .order_by_desc(shipment_event::Column::Id)
        .all(db)
        .await?)
}

pub async fn attempts_of(
    db: &DatabaseConnection,
    shipment_id: &str,
) -> Result<Vec<delivery_attempt::Model>, DomainError> {
    Ok(DeliveryAttempt::find()
        .filter(delivery_attempt::Column::ShipmentId.eq(shipment_id))
        .order_by_asc(delivery_attempt::Column::AttemptNumber)
        .all(db)
        .await?)
}

#[derive(Debug, Default, Deserialize)]
pub struct ShipmentFilter {
    pub status: Option<String>,
    pub provider: Option<String>,
    pub search: Option<String>,
}

pub async fn list_shipments(
    db: &DatabaseConnection,
    filter: &ShipmentFilter,
    params: &PageParams,
) -> Result<Page<shipment::Model>, DomainError> {
    let mut condition = Condition::all();
    if let Some(status) = &filter.status {
        condition = condition.add(shipment::Column::Status.eq(status.as_str()));
    }
    if let Some(provider) = &filter.provider {
        condition = condition.add(shipment::Column::Provider.eq(provider.as_str()));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(shipment::Column::TrackingCode.contains(search))
                .add(shipment::Column::ProviderOrderId.contains(search)),
        );
    }

    paginate(
        Shipment::find()
            .filter(condition)
            .order_by_desc(shipment::Column::CreatedAt),
        db,
        params,
    )
    .await
}

pub async fn active_shipments(
    db: &DatabaseConnection,
    provider: Option<&str>,
) -> Result<Vec<shipment::Model>, DomainError> {
    let mut query = Shipment::find().filter(shipment::Column::Status.is_in(shipment::ACTIVE_STATUSES.iter().copied()));
    if let Some(provider) = provider {
        query = query.filter(shipment::Column::Provider.eq(provider));
    }
    Ok(query
        .order_by_desc(shipment::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn failed_shipments(db: &DatabaseConnection) -> Result<Vec<shipment::Model>, DomainError> {
    Ok(Shipment::find()
        .filter(shipment::Column::Status.is_in(shipment::FAILED_STATUSES.iter().copied()))
        .order_by_desc(shipment::Column::UpdatedAt)
        .all(db)
        .await?)
}

/// Delivered COD parcels whose money has not been settled yet, oldest delivery first.
pub async fn pending_cod(db: &DatabaseConnection) -> Result<Vec<shipment::Model>, DomainError> {
    Ok(Shipment::find()
        .filter(shipment::Column::Status.eq(shipment::STATUS_DELIVERED))
        .filter(shipment::Column::CodAmount.gt(0))
        .filter(shipment::Column::CodTransferred.eq(false))
        .order_by_asc(shipment::Column::DeliveredAt)
        .all(db)
        .await?)
}

// ---------------------------------------------------------------------------
// Status machine
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
    pub provider_status: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub provider_data: Option<Value>,
}

#[derive(Default)]
struct Extra {
    fail_reason: Option<String>,
    cancel_reason: Option<String>,
}

async fn append_event<C: ConnectionTrait>(
    db: &C,
    shipment_id: &str,
    status: &str,
    description: &str,
    location: Option<String>,
    provider_data: Option<&Value>,
) -> Result<(), DomainError> {
    let now = now_str();
    ShipmentEvent::insert(shipment_event::ActiveModel {
        shipment_id: Set(shipment_id.to_string()),
        status: Set(status.to_string()),
        description: Set(description.to_string()),
        location: Set(location),
        occurred_at: Set(now.clone()),
        provider_data: Set(provider_data.map(|d| d.to_string())),
        created_at: Set(now),
        ..Default::default()
    })
    .exec_without_returning(db)
    .await?;
    Ok(())
}

async fn lock_shipment(
    txn: &DatabaseTransaction,
    id: &str,
) -> Result<shipment::Model, DomainError> {
    Shipment::find_by_id(id.to_string())
        .one(txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Shipment"))
}

/// Apply a status change to `current` inside `txn` and log the event.
async fn transition(
    txn: &DatabaseTransaction,
    current: shipment::Model,
    update: &StatusUpdate,
    extra: Extra,
) -> Result<shipment::Model, DomainError> {
    let status = update.status.as_str();
    if !shipment::STATUSES.contains(&status) {
        return Err(DomainError::Validation(format!("Invalid status: {}", status)));
    }
    if current.is_final() {
        return Err(DomainError::BusinessRule(format!(
            "Cannot update shipment in final status: {}",
            current.status
        )));
    }

    let now = now_str();
    let provider_status = update
        .provider_status
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| status.to_string());
    let previous_version = current.updated_at.clone();

    let mut next = current.clone();
    next.status = status.to_string();
    next.provider_status = Some(provider_status.clone());
    next.last_location = update.location.clone();
    next.last_status_update = Some(now.clone());
    match status {
        shipment::STATUS_PICKED_UP if next.picked_up_at.is_none() => {
            next.picked_up_at = Some(now.clone());
        }
        shipment::STATUS_DELIVERED if next.delivered_at.is_none() => {
            next.delivered_at = Some(now.clone());
            next.cod_collected = true;
        }
        shipment::STATUS_RETURNED if next.returned_at.is_none() => {
            next.returned_at = Some(now.clone());
        }
        shipment::STATUS_CANCELLED if next.cancelled_at.is_none() => {
            next.cancelled_at = Some(now.clone());
        }
        shipment::STATUS_FAILED => {
            next.delivery_attempts += 1;
        }
        _ => {}
    }
    if extra.fail_reason.is_some() {
        next.fail_reason = extra.fail_reason;
    }
    if extra.cancel_reason.is_some() {
        next.cancel_reason = extra.cancel_reason;
    }
    next.updated_at = now;

    let changes = shipment::ActiveModel {
        status: Set(next.status.clone()),
        provider_status: Set(next.provider_status.clone()),
        last_location: Set(next.last_location.clone()),
        last_status_update: Set(next.last_status_update.clone()),
        picked_up_at: Set(next.picked_up_at.clone()),
        delivered_at: Set(next.delivered_at.clone()),
        returned_at: Set(next.returned_at.clone()),
        cancelled_at: Set(next.cancelled_at.clone()),
        cod_collected: Set(next.cod_collected),
        delivery_attempts: Set(next.delivery_attempts),
        fail_reason: Set(next.fail_reason.clone()),
        cancel_reason: Set(next.cancel_reason.clone()),
        updated_at: Set(next.updated_at.clone()),
        ..Default::default()
    };
    let written = Shipment::update_many()
        .set(changes)
        .filter(shipment::Column::Id.eq(current.id.as_str()))
        .filter(shipment::Column::UpdatedAt.eq(previous_version))
        .exec(txn)
        .await?;
    if written.rows_affected == 0 {
        return Err(DomainError::Conflict(
            "Shipment was updated concurrently, retry".to_string(),
        ));
    }

    let description = update
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("Status: {}", status));
    append_event(
        txn,
        &next.id,
        &provider_status,
        &description,
        update.location.clone(),
        update.provider_data.as_ref(),
    )
    .await?;

    if status == shipment::STATUS_DELIVERED {
        settle_order_on_delivery(txn, &next).await?;
    }

    tracing::info!(
        "Shipment {} status {} -> {}",
        next.tracking_code,
        current.status,
        status
    );
    Ok(next)
}

async fn settle_order_on_delivery(
    txn: &DatabaseTransaction,
    shipment: &shipment::Model,
) -> Result<(), DomainError> {
    let Some(order) = Order::find_by_id(shipment.order_id.clone()).one(txn).await? else {
        return Ok(());
    };
    if order.status != "shipping" && order.status != "ready_to_ship" {
        return Ok(());
    }

    let now = now_str();
    let cod_paid = order.payment_method == "cod" && shipment.cod_amount > 0;
    let mut active: order::ActiveModel = order.into();
    active.status = Set("delivered".to_string());
    active.delivered_at = Set(Some(now.clone()));
    if cod_paid {
        active.payment_status = Set("paid".to_string());
        active.paid_at = Set(Some(now.clone()));
    }
    active.updated_at = Set(now);
    active.update(txn).await?;
    Ok(())
}

fn notification_for(status: &str, order_number: &str, provider: &str) -> Option<(&'static str, String)> {
    let n = order_number;
    Some(match status {
        shipment::STATUS_PICKED_UP => (
            "shipment_picked_up",
            format!("Your order #{} has been picked up by {}.", n, provider_display(provider)),
        ),
        shipment::STATUS_IN_TRANSIT => (
            "shipment_in_transit",
            format!("Your order #{} is on its way!", n),
        ),
        shipment::STATUS_OUT_FOR_DELIVERY => (
            "out_for_delivery",
            format!("Your order #{} is out for delivery today!", n),
        ),
        shipment::STATUS_DELIVERED => (
            "shipment_delivered",
            format!("Your order #{} has been delivered.", n),
        ),
        shipment::STATUS_FAILED => (
            "delivery_failed",
            format!("Delivery attempt for order #{} was unsuccessful.", n),
        ),
        shipment::STATUS_RETURNED => (
            "shipment_returned",
            format!("Your order #{} is being returned.", n),
        ),
        _ => return None,
    })
}

/// Tell the buyer about the new status. Runs after commit; failures are logged only.
async fn notify(db: &DatabaseConnection, shipment: &shipment::Model) {
    let order = match Order::find_by_id(shipment.order_id.clone()).one(db).await {
        Ok(Some(order)) => order,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!("Could not load order for shipment notification: {}", e);
            return;
        }
    };
    let Some(user_id) = order.user_id.as_deref() else {
        return;
    };
    let Some((kind, message)) =
        notification_for(&shipment.status, &order.order_number, &shipment.provider)
    else {
        return;
    };

    let result = notification_service::create(
        db,
        NewNotification {
            user_id,
            notification_type: kind,
            title: "Shipping Update",
            message,
            action_url: Some(format!("/orders/{}", order.id)),
            data: json!({
                "order_id": order.id,
                "order_number": order.order_number,
                "tracking_code": shipment.tracking_code,
                "shipment_status": shipment.status,
            }),
        },
    )
    .await;
    if let Err(e) = result {
        tracing::warn!("Could not send shipment notification: {}", e);
    }
}

pub async fn update_status(
    db: &DatabaseConnection,
    id: &str,
    update: StatusUpdate,
) -> Result<shipment::Model, DomainError> {
    let txn = db.begin().await?;
    let current = lock_shipment(&txn, id).await?;
    let updated = transition(&txn, current, &update, Extra::default()).await?;
    txn.commit().await?;

    notify(db, &updated).await;
    Ok(updated)
}

pub async fn mark_failed(
    db: &DatabaseConnection,
    id: &str,
    reason: &str,
) -> Result<shipment::Model, DomainError> {
    let txn = db.begin().await?;
    let current = lock_shipment(&txn, id).await?;
    let update = StatusUpdate {
        status: shipment::STATUS_FAILED.to_string(),
        description: Some(format!("Delivery failed: {}", reason)),
        ..Default::default()
    };
    let updated = transition(
        &txn,
        current,
        &update,
        Extra {
            fail_reason: Some(reason.to_string()),
            ..Default::default()
        },
    )
    .await?;
    txn.commit().await?;

    notify(db, &updated).await;
    Ok(updated)
}

pub async fn cancel(
    db: &DatabaseConnection,
    id: &str,
    reason: &str,
) -> Result<shipment::Model, DomainError> {
    let txn = db.begin().await?;
    let current = lock_shipment(&txn, id).await?;
    if !current.can_cancel() {
        return Err(DomainError::BusinessRule(
            "Cannot cancel shipment in current status".to_string(),
        ));
    }

    let description = if reason.is_empty() {
        "Cancelled".to_string()
    } else {
        format!("Cancelled: {}", reason)
    };
    let update = StatusUpdate {
        status: shipment::STATUS_CANCELLED.to_string(),
        description: Some(description),
        ..Default::default()
    };
    let updated = transition(
        &txn,
        current,
        &update,
        Extra {
            cancel_reason: Some(reason.to_string()),
            ..Default::default()
        },
    )
    .await?;
    txn.commit().await?;
    Ok(updated)
}

#[derive(Debug, Deserialize)]
pub struct AttemptInput {
    pub fail_reason: String,
    pub notes: Option<String>,
    pub rescheduled_to: Option<String>,
}

pub async fn record_attempt(
    db: &DatabaseConnection,
    id: &str,
    input: AttemptInput,
) -> Result<(shipment::Model, delivery_attempt::Model), DomainError> {
    if !delivery_attempt::FAIL_REASONS.contains(&input.fail_reason.as_str()) {
        return Err(DomainError::Validation(format!(
            "Invalid fail_reason: {}",
            input.fail_reason
        )));
    }
    let rescheduled_to = normalize_opt_ts("rescheduled_to", input.rescheduled_to.as_deref())?;

    let txn = db.begin().await?;
    let current = lock_shipment(&txn, id).await?;
    if current.delivery_attempts >= current.max_delivery_attempts {
        return Err(DomainError::BusinessRule(
            "Maximum delivery attempts reached".to_string(),
        ));
    }

    let attempt = delivery_attempt::ActiveModel {
        shipment_id: Set(current.id.clone()),
        attempt_number: Set(current.delivery_attempts + 1),
        attempted_at: Set(now_str()),
        fail_reason: Set(input.fail_reason.clone()),
        notes: Set(input.notes),
        rescheduled_to: Set(rescheduled_to),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let update = StatusUpdate {
        status: shipment::STATUS_FAILED.to_string(),
        description: Some(format!("Delivery failed: {}", input.fail_reason)),
        ..Default::default()
    };
    let updated = transition(
        &txn,
        current,
        &update,
        Extra {
            fail_reason: Some(input.fail_reason),
            ..Default::default()
        },
    )
    .await?;
    txn.commit().await?;

    notify(db, &updated).await;
    Ok((updated, attempt))
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

pub async fn statistics(db: &DatabaseConnection, days: i64) -> Result<Value, DomainError> {
    let days = days.clamp(1, 365);
    let shipments = Shipment::find()
        .filter(shipment::Column::CreatedAt.gte(from_now(-Duration::days(days))))
        .all(db)
        .await?;

    let count = |status: &str| shipments.iter().filter(|s| s.status == status).count();
    let total = shipments.len();
    let delivered = count(shipment::STATUS_DELIVERED);
    let delivery_rate = if total == 0 {
        0.0
    } else {
        round2(delivered as f64 / total as f64 * 100.0)
    };
    let total_cod_collected: i64 = shipments
        .iter()
        .filter(|s| s.cod_collected)
        .map(|s| s.cod_amount)
        .sum();
    let pending_cod_transfer: i64 = shipments
        .iter()
        .filter(|s| s.cod_collected && !s.cod_transferred)
        .map(|s| s.cod_amount)
        .sum();

    Ok(json!({
        "period_days": days,
        "total": total,
        "delivered": delivered,
        "failed": count(shipment::STATUS_FAILED),
        "returned": count(shipment::STATUS_RETURNED),
        "cancelled": count(shipment::STATUS_CANCELLED),
        "delivery_rate": delivery_rate,
        "total_cod_collected": total_cod_collected,
        "pending_cod_transfer": pending_cod_transfer,
    }))
}

// ---------------------------------------------------------------------------
// COD reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct NewReconciliation {
    pub provider: String,
    pub reconciliation_date: String,
    pub shipment_ids: Vec<String>,
    pub notes: Option<String>,
}

async fn linked_shipment_ids<C: ConnectionTrait>(
    db: &C,
    reconciliation_id: i32,
) -> Result<Vec<String>, DomainError> {
    Ok(CodReconciliationShipment::find()
        .filter(cod_reconciliation_shipment::Column::ReconciliationId.eq(reconciliation_id))
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.shipment_id)
        .collect())
}

pub async fn reconciliation_dto(
    db: &DatabaseConnection,
    recon: &cod_reconciliation::Model,
) -> Result<Value, DomainError> {
    let mut value = serde_json::to_value(recon)?;
    let ids = linked_shipment_ids(db, recon.id).await?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("shipment_ids".into(), json!(ids));
    }
    Ok(value)
}

pub async fn create_reconciliation(
    db: &DatabaseConnection,
    input: NewReconciliation,
) -> Result<cod_reconciliation::Model, DomainError> {
    if !shipment::PROVIDERS.contains(&input.provider.as_str()) {
        return Err(DomainError::Validation(format!("Invalid provider: {}", input.provider)));
    }
    let date = NaiveDate::parse_from_str(input.reconciliation_date.trim(), "%Y-%m-%d")
        .map_err(|_| DomainError::Validation("reconciliation_date must be YYYY-MM-DD".to_string()))?
        .format("%Y-%m-%d")
        .to_string();
    if input.shipment_ids.is_empty() {
        return Err(DomainError::Validation("shipment_ids must not be empty".to_string()));
    }

    let txn = db.begin().await?;
    let duplicate = CodReconciliation::find()
        .filter(cod_reconciliation::Column::Provider.eq(input.provider.as_str()))
        .filter(cod_reconciliation::Column::ReconciliationDate.eq(date.as_str()))
        .count(&txn)
        .await?
        > 0;
    if duplicate {
        return Err(DomainError::Conflict(format!(
            "Reconciliation for {} on {} already exists",
            input.provider, date
        )));
    }

    let shipments = Shipment::find()
        .filter(shipment::Column::Id.is_in(input.shipment_ids.clone()))
        .all(&txn)
        .await?;
    if shipments.len() != input.shipment_ids.len() {
        return Err(DomainError::not_found("Shipment"));
    }
    if let Some(bad) = shipments.iter().find(|s| {
        s.provider != input.provider || !s.is_delivered() || s.cod_transferred
    }) {
        return Err(DomainError::BusinessRule(format!(
            "Shipment {} is not a delivered, unsettled {} parcel",
            bad.tracking_code, input.provider
        )));
    }

    let total_cod: i64 = shipments.iter().map(|s| s.cod_amount).sum();
    let total_shipping_fee: i64 = shipments.iter().map(|s| s.total_fee).sum();
    let now = now_str();
    let recon = cod_reconciliation::ActiveModel {
        provider: Set(input.provider),
        reconciliation_date: Set(date),
        status: Set("pending".to_string()),
        total_orders: Set(shipments.len() as i32),
        total_cod: Set(total_cod),
        total_shipping_fee: Set(total_shipping_fee),
        net_amount: Set(total_cod - total_shipping_fee),
        transferred_at: Set(None),
        transfer_reference: Set(None),
        notes: Set(input.notes),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for s in &shipments {
        CodReconciliationShipment::insert(cod_reconciliation_shipment::ActiveModel {
            reconciliation_id: Set(recon.id),
            shipment_id: Set(s.id.clone()),
        })
        .exec_without_returning(&txn)
        .await?;
    }
    txn.commit().await?;

    tracing::info!(
        "COD reconciliation {} for {} on {}: {} parcels, net {}₫",
        recon.id,
        recon.provider,
        recon.reconciliation_date,
        recon.total_orders,
        recon.net_amount
    );
    Ok(recon)
}

async fn get_reconciliation<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<cod_reconciliation::Model, DomainError> {
    CodReconciliation::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Reconciliation"))
}

pub async fn confirm_reconciliation(
    db: &DatabaseConnection,
    id: i32,
) -> Result<cod_reconciliation::Model, DomainError> {
    let recon = get_reconciliation(db, id).await?;
    if recon.status != "pending" {
        return Err(DomainError::BusinessRule(format!(
            "Cannot confirm reconciliation in status {}",
            recon.status
        )));
    }
    let mut active: cod_reconciliation::ActiveModel = recon.into();
    active.status = Set("confirmed".to_string());
    active.updated_at = Set(now_str());
    Ok(active.update(db).await?)
}

pub async fn mark_transferred(
    db: &DatabaseConnection,
    id: i32,
    reference: &str,
) -> Result<cod_reconciliation::Model, DomainError> {
    let txn = db.begin().await?;
    let recon = get_reconciliation(&txn, id).await?;
    if recon.status == "transferred" {
        return Err(DomainError::BusinessRule(
            "Reconciliation is already transferred".to_string(),
        ));
    }

    let now = now_str();
    let mut active: cod_reconciliation::ActiveModel = recon.into();
    active.status = Set("transferred".to_string());
    active.transferred_at = Set(Some(now.clone()));
    active.transfer_reference = Set(Some(reference.to_string()));
    active.updated_at = Set(now.clone());
    let recon = active.update(&txn).await?;

    let ids = linked_shipment_ids(&txn, recon.id).await?;
    if !ids.is_empty() {
        Shipment::update_many()
            .col_expr(shipment::Column::CodTransferred, true.into())
            .col_expr(
                shipment::Column::CodTransferDate,
                Utc::now().format("%Y-%m-%d").to_string().into(),
            )
            .col_expr(shipment::Column::UpdatedAt, now.into())
            .filter(shipment::Column::Id.is_in(ids))
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;

    tracing::info!("COD reconciliation {} transferred ({})", recon.id, reference);
    Ok(recon)
}

pub async fn list_reconciliations(
    db: &DatabaseConnection,
    provider: Option<&str>,
    status: Option<&str>,
    params: &PageParams,
) -> Result<Page<cod_reconciliation::Model>, DomainError> {
    let mut query = CodReconciliation::find();
    if let Some(provider) = provider {
        query = query.filter(cod_reconciliation::Column::Provider.eq(provider));
    }
    if let Some(status) = status {
        query = query.filter(cod_reconciliation::Column::Status.eq(status));
    }
    paginate(
        query.order_by_desc(cod_reconciliation::Column::ReconciliationDate),
        db,
        params,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_grows_per_full_half_kilo() {
        assert_eq!(calculate_fee(500, 0).shipping_fee, 30_000);
        assert_eq!(calculate_fee(999, 0).shipping_fee, 30_000);
        assert_eq!(calculate_fee(1000, 0).shipping_fee, 35_000);
        assert_eq!(calculate_fee(2600, 0).shipping_fee, 50_000);
    }

    #[test]
    fn cod_fee_has_a_floor() {
        let small = calculate_fee(500, 200_000);
        assert_eq!(small.cod_fee, 10_000);
        assert_eq!(small.total_fee, 40_000);

        let large = calculate_fee(500, 3_000_000);
        assert_eq!(large.cod_fee, 30_000);
        assert_eq!(calculate_fee(500, 0).cod_fee, 0);
    }

    #[test]
    fn notifications_cover_buyer_facing_statuses() {
        let (kind, msg) = notification_for("in_transit", "OWL1", "ghn").unwrap();
        assert_eq!(kind, "shipment_in_transit");
        assert_eq!(msg, "Your order #OWL1 is on its way!");
        assert!(notification_for("picked_up", "OWL1", "vtp").unwrap().1.contains("Viettel Post"));
        assert!(notification_for("sorting", "OWL1", "ghn").is_none());
    }

    #[test]
    fn tracking_codes_are_prefixed() {
        let code = generate_tracking_code();
        assert!(code.starts_with("SHP"));
        assert_eq!(code.len(), 11);
        assert_eq!(code, code.to_uppercase());
    }
}
