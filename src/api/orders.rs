use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::error::ApiResult;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::{AdminUser, AuthUser};
use crate::models::order;
use crate::services::order_service::{self, NewOrder};
use crate::utils::pagination::{Page, PageParams};

pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<NewOrder>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (order, items) = order_service::create_order(state.db(), auth.id(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(order_service::order_dto(&order, &items)?),
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<order::Model>>> {
    Ok(Json(
        order_service::list_orders(state.db(), auth.id(), &params).await?,
    ))
}

pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let (order, items) = order_service::get_order(state.db(), &id).await?;
    if order.user_id.as_deref() != Some(auth.id()) && !auth.is_admin() {
        // Foreign orders look missing rather than forbidden
        return Err(DomainError::not_found("Order"));
    }
    Ok(Json(order_service::order_dto(&order, &items)?))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<StatusRequest>,
) -> ApiResult<Json<order::Model>> {
    Ok(Json(
        order_service::update_status(state.db(), &id, &payload.status).await?,
    ))
}
