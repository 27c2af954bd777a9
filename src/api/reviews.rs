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
use crate::models::{review, review_report};
use crate::services::review_service::{
    self, ModerationAction, NewReview, ReportAction, ReviewQuery, ReviewUpdate,
};
use crate::utils::pagination::{Page, PageParams};

/// Loads a review the caller may edit.
async fn owned_review(
    state: &AppState,
    auth: &AuthUser,
    id: &str,
) -> Result<review::Model, DomainError> {
    let review = review_service::find_review(state.db(), id).await?;
    if review.user_id != auth.id() {
        return Err(DomainError::PermissionDenied(
            "You can only modify your own reviews".to_string(),
        ));
    }
    Ok(review)
}

// ---------------------------------------------------------------------------
// Public
// ---------------------------------------------------------------------------

pub async fn product_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(query): Query<ReviewQuery>,
) -> ApiResult<Json<Value>> {
    Ok(Json(
        review_service::list_product_reviews(state.db(), &product_id, &query).await?,
    ))
}

pub async fn product_summary(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let summary = review_service::get_summary(state.db(), &product_id).await?;
    Ok(Json(summary.to_dto()))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let review = review_service::get_review(state.db(), &id).await?;
    Ok(Json(review_service::review_dto(state.db(), review).await?))
}

// ---------------------------------------------------------------------------
// Authenticated
// ---------------------------------------------------------------------------

pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<NewReview>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let review = review_service::create_review(state.db(), auth.id(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(review_service::review_dto(state.db(), review).await?),
    ))
}

pub async fn update_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<ReviewUpdate>,
) -> ApiResult<Json<Value>> {
    let existing = owned_review(&state, &auth, &id).await?;
    let review = review_service::update_review(state.db(), existing, payload).await?;
    Ok(Json(review_service::review_dto(state.db(), review).await?))
}

pub async fn delete_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let existing = owned_review(&state, &auth, &id).await?;
    review_service::delete_review(state.db(), existing).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct VoteRequest {
    pub is_helpful: bool,
}

pub async fn vote(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<VoteRequest>,
) -> ApiResult<Json<Value>> {
    Ok(Json(
        review_service::vote(state.db(), &id, auth.id(), payload.is_helpful).await?,
    ))
}

#[derive(Deserialize)]
pub struct ReportRequest {
    pub reason: String,
    #[serde(default)]
    pub description: String,
}

pub async fn report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<ReportRequest>,
) -> ApiResult<(StatusCode, Json<review_report::Model>)> {
    let report = review_service::report(
        state.db(),
        &id,
        auth.id(),
        &payload.reason,
        &payload.description,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn my_reviews(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Value>>> {
    let reviews = review_service::user_reviews(state.db(), auth.id(), 20).await?;
    Ok(Json(review_service::hydrate(state.db(), reviews).await?))
}

pub async fn reviewable(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(
        review_service::reviewable_products(state.db(), auth.id(), 20).await?,
    ))
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

pub async fn admin_list(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<StatusQuery>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<Value>>> {
    let page = review_service::admin_list(state.db(), query.status.as_deref(), &params).await?;
    let Page {
        results,
        count,
        page,
        pages,
        page_size,
        has_next,
        has_previous,
    } = page;
    Ok(Json(Page {
        results: review_service::hydrate(state.db(), results).await?,
        count,
        page,
        pages,
        page_size,
        has_next,
        has_previous,
    }))
}

#[derive(Deserialize)]
pub struct ModerateRequest {
    pub action: ModerationAction,
    #[serde(default)]
    pub reason: String,
}

pub async fn moderate(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<ModerateRequest>,
) -> ApiResult<Json<Value>> {
    let review =
        review_service::moderate(state.db(), &id, payload.action, &payload.reason, admin.id())
            .await?;
    Ok(Json(review_service::review_dto(state.db(), review).await?))
}

#[derive(Deserialize)]
pub struct BulkModerateRequest {
    pub review_ids: Vec<String>,
    pub action: ModerationAction,
    #[serde(default)]
    pub reason: String,
}

pub async fn bulk_moderate(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<BulkModerateRequest>,
) -> ApiResult<Json<Value>> {
    let count = review_service::bulk_moderate(
        state.db(),
        payload.review_ids,
        payload.action,
        &payload.reason,
        admin.id(),
    )
    .await?;
    Ok(Json(json!({ "count": count })))
}

#[derive(Deserialize)]
pub struct ReplyRequest {
    #[serde(default)]
    pub content: String,
}

pub async fn reply(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(payload): Json<ReplyRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let reply = review_service::reply(state.db(), &id, admin.id(), &payload.content, true).await?;
    Ok((StatusCode::CREATED, Json(json!(reply))))
}

pub async fn pending_reports(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> ApiResult<Json<Vec<review_report::Model>>> {
    Ok(Json(review_service::pending_reports(state.db(), 50).await?))
}

#[derive(Deserialize)]
pub struct ResolveRequest {
    pub action: ReportAction,
    #[serde(default)]
    pub note: String,
}

pub async fn resolve_report(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<ResolveRequest>,
) -> ApiResult<Json<review_report::Model>> {
    Ok(Json(
        review_service::resolve_report(state.db(), id, payload.action, &payload.note, admin.id())
            .await?,
    ))
}

pub async fn admin_statistics(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> ApiResult<Json<Value>> {
    Ok(Json(review_service::statistics(state.db()).await?))
}
