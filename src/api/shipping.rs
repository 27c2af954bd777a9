use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::error::ApiResult;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::AdminUser;
use crate::models::shipment;
use crate::services::shipping_service::{
    self, AttemptInput, NewReconciliation, NewShipment, ShipmentFilter, StatusUpdate,
};
use crate::utils::pagination::{Page, PageParams};

fn dto_list(shipments: Vec<shipment::Model>) -> Vec<Value> {
    shipments.iter().map(shipment::Model::to_dto).collect()
}

// ---------------------------------------------------------------------------
// Public
// ---------------------------------------------------------------------------

pub async fn track(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Value>> {
    let shipment = shipping_service::get_by_tracking_code(state.db(), &code).await?;
    let events = shipping_service::events_of(state.db(), &shipment.id).await?;

    let mut body = shipment.to_dto();
    body["provider_display"] = json!(shipping_service::provider_display(&shipment.provider));
    body["events"] = json!(events);
    Ok(Json(body))
}

#[derive(Deserialize)]
pub struct FeeRequest {
    pub provider: Option<String>,
    pub district_id: Option<i64>,
    pub ward_code: Option<String>,
    pub weight: Option<i32>,
    #[serde(default)]
    pub cod_amount: i64,
}

pub async fn calculate_fee(Json(payload): Json<FeeRequest>) -> Json<Value> {
    tracing::debug!(
        "Fee quote for provider={:?} district={:?} ward={:?}",
        payload.provider,
        payload.district_id,
        payload.ward_code
    );
    let weight = payload.weight.unwrap_or(shipping_service::DEFAULT_WEIGHT);
    Json(json!(shipping_service::calculate_fee(weight, payload.cod_amount)))
}

pub async fn services() -> Json<Value> {
    Json(json!(shipping_service::available_services()))
}

// ---------------------------------------------------------------------------
// Admin shipments
// ---------------------------------------------------------------------------

pub async fn list_shipments(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(filter): Query<ShipmentFilter>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<Value>>> {
    let page = shipping_service::list_shipments(state.db(), &filter, &params).await?;
    Ok(Json(page.map(|s| s.to_dto())))
}

#[derive(Deserialize)]
pub struct ProviderQuery {
    pub provider: Option<String>,
}

pub async fn active_shipments(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<ProviderQuery>,
) -> ApiResult<Json<Vec<Value>>> {
    let shipments =
        shipping_service::active_shipments(state.db(), query.provider.as_deref()).await?;
    Ok(Json(dto_list(shipments)))
}

pub async fn failed_shipments(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(dto_list(
        shipping_service::failed_shipments(state.db()).await?,
    )))
}

pub async fn pending_cod(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(dto_list(shipping_service::pending_cod(state.db()).await?)))
}

pub async fn create_shipment(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<NewShipment>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let shipment = shipping_service::create_shipment(state.db(), payload).await?;
    Ok((StatusCode::CREATED, Json(shipment.to_dto())))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let shipment = shipping_service::get_shipment(state.db(), &id).await?;
    let events = shipping_service::events_of(state.db(), &shipment.id).await?;
    let attempts = shipping_service::attempts_of(state.db(), &shipment.id).await?;

    let mut body = shipment.to_dto();
    body["events"] = json!(events);
    body["attempts"] = json!(attempts);
    Ok(Json(body))
}

pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> ApiResult<Json<Value>> {
    let shipment = shipping_service::update_status(state.db(), &id, payload).await?;
    Ok(Json(shipment.to_dto()))
}

#[derive(Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: String,
}

pub async fn cancel(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<CancelRequest>,
) -> ApiResult<Json<Value>> {
    let shipment = shipping_service::cancel(state.db(), &id, &payload.reason).await?;
    Ok(Json(shipment.to_dto()))
}

pub async fn record_attempt(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<AttemptInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (shipment, attempt) = shipping_service::record_attempt(state.db(), &id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "shipment": shipment.to_dto(), "attempt": attempt })),
    ))
}

// ---------------------------------------------------------------------------
// Admin statistics and reconciliation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

pub async fn statistics(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<DaysQuery>,
) -> ApiResult<Json<Value>> {
    Ok(Json(
        shipping_service::statistics(state.db(), query.days.unwrap_or(30)).await?,
    ))
}

#[derive(Deserialize)]
pub struct ReconciliationQuery {
    pub provider: Option<String>,
    pub status: Option<String>,
}

pub async fn list_reconciliations(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<ReconciliationQuery>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<Value>>> {
    let page = shipping_service::list_reconciliations(
        state.db(),
        query.provider.as_deref(),
        query.status.as_deref(),
        &params,
    )
    .await?;

    let mut results = Vec::with_capacity(page.results.len());
    for recon in &page.results {
        results.push(shipping_service::reconciliation_dto(state.db(), recon).await?);
    }
    Ok(Json(Page {
        results,
        count: page.count,
        page: page.page,
        pages: page.pages,
        page_size: page.page_size,
        has_next: page.has_next,
        has_previous: page.has_previous,
    }))
}

pub async fn create_reconciliation(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<NewReconciliation>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let recon = shipping_service::create_reconciliation(state.db(), payload).await?;
    let body = shipping_service::reconciliation_dto(state.db(), &recon).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn confirm_reconciliation(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let recon = shipping_service::confirm_reconciliation(state.db(), id).await?;
    Ok(Json(
        shipping_service::reconciliation_dto(state.db(), &recon).await?,
    ))
}

#[derive(Deserialize)]
pub struct TransferRequest {
    pub reference: String,
}

pub async fn transfer_reconciliation(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<TransferRequest>,
) -> ApiResult<Json<Value>> {
    let recon = shipping_service::mark_transferred(state.db(), id, &payload.reference).await?;
    Ok(Json(
        shipping_service::reconciliation_dto(state.db(), &recon).await?,
    ))
}
