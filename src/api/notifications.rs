use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::error::ApiResult;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::AuthUser;
use crate::services::notification_service;
use crate::utils::pagination::{Page, PageParams};

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread: bool,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<Value>>> {
    let page = notification_service::list(state.db(), auth.id(), query.unread, &params).await?;
    Ok(Json(page.map(|n| n.to_dto())))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let notification = notification_service::get(state.db(), auth.id(), &id).await?;
    Ok(Json(notification.to_dto()))
}

#[derive(Deserialize, Default)]
pub struct MarkReadRequest {
    pub ids: Option<Vec<String>>,
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Option<Json<MarkReadRequest>>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload.unwrap_or_default();
    let marked = notification_service::mark_read(state.db(), auth.id(), payload.ids).await?;
    Ok(Json(json!({ "marked": marked })))
}

pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Value>> {
    let count = notification_service::unread_count(state.db(), auth.id()).await?;
    Ok(Json(json!({ "count": count })))
}
