use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::error::ApiResult;
use crate::infrastructure::AppState;
use crate::infrastructure::auth::AdminUser;
use crate::services::location_service::{self, ImportCounts, ImportPayload, Level, SyncReport};

pub async fn provinces(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(location_service::provinces(&state).await?))
}

pub async fn province(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(location_service::province(&state, &code).await?))
}

pub async fn districts(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(location_service::districts(&state, &code).await?))
}

pub async fn district(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(location_service::district(&state, &code).await?))
}

pub async fn wards(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(location_service::wards(&state, &code).await?))
}

pub async fn ward(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(location_service::ward(&state, &code).await?))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u64>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    Ok(Json(location_service::search(&state, &query.q, limit).await?))
}

#[derive(Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub level: Level,
    pub limit: Option<u64>,
}

pub async fn autocomplete(
    State(state): State<AppState>,
    Query(query): Query<AutocompleteQuery>,
) -> ApiResult<Json<Vec<Value>>> {
    let limit = query.limit.unwrap_or(10).clamp(1, 50);
    Ok(Json(
        location_service::autocomplete(&state, &query.q, query.level, limit).await?,
    ))
}

pub async fn resolve(
    State(state): State<AppState>,
    Path(ward_code): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(location_service::resolve(&state, &ward_code).await?))
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub province_code: Option<String>,
    pub district_code: Option<String>,
    pub ward_code: Option<String>,
}

pub async fn validate(
    State(state): State<AppState>,
    Json(payload): Json<ValidateRequest>,
) -> ApiResult<Response> {
    let present = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let (Some(p), Some(d), Some(w)) = (
        present(&payload.province_code),
        present(&payload.district_code),
        present(&payload.ward_code),
    ) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "valid": false, "error": "All codes are required" })),
        )
            .into_response());
    };

    let valid = location_service::validate(&state, &p, &d, &w).await?;
    Ok(Json(json!({
        "valid": valid,
        "codes": { "province_code": p, "district_code": d, "ward_code": w },
    }))
    .into_response())
}

pub async fn statistics(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(location_service::statistics(&state).await?))
}

pub async fn import(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(payload): Json<ImportPayload>,
) -> ApiResult<Json<ImportCounts>> {
    Ok(Json(location_service::import(&state, payload).await?))
}

pub async fn sync_ghn(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> ApiResult<Json<SyncReport>> {
    Ok(Json(location_service::sync_ghn(&state).await?))
}
