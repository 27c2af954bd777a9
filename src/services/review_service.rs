//! Review Service - product reviews, moderation, votes, reports and rating summaries

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::{OnConflict, Query};
use sea_orm::*;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::domain::DomainError;
use crate::models::order::{self, Entity as Order};
use crate::models::order_item::{self, Entity as OrderItem};
use crate::models::review::{self, Entity as Review, MAX_IMAGES};
use crate::models::review_image::{self, Entity as ReviewImage};
use crate::models::review_reply::{self, Entity as ReviewReply};
use crate::models::review_report::{self, Entity as ReviewReport};
use crate::models::review_summary::{self, Entity as ReviewSummary};
use crate::models::review_vote::{self, Entity as ReviewVote};
use crate::models::user::{self, Entity as User};
use crate::utils::pagination::{Page, PageParams, paginate};
use crate::utils::round2;
use crate::utils::time::now_str;

const PURCHASED_STATUSES: [&str; 2] = ["delivered", "completed"];

fn check_rating(field: &str, value: Option<i32>) -> Result<(), DomainError> {
    match value {
        Some(v) if !(1..=5).contains(&v) => Err(DomainError::Validation(format!(
            "{} must be between 1 and 5",
            field
        ))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// Attach images, replies and author names to a batch of reviews.
pub async fn hydrate(
    db: &DatabaseConnection,
    reviews: Vec<review::Model>,
) -> Result<Vec<Value>, DomainError> {
    if reviews.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = reviews.iter().map(|r| r.id.clone()).collect();
    let user_ids: HashSet<String> = reviews.iter().map(|r| r.user_id.clone()).collect();

    let mut images: HashMap<String, Vec<review_image::Model>> = HashMap::new();
    for image in ReviewImage::find()
        .filter(review_image::Column::ReviewId.is_in(ids.clone()))
        .order_by_asc(review_image::Column::SortOrder)
        .all(db)
        .await?
    {
        images.entry(image.review_id.clone()).or_default().push(image);
    }

    let mut replies: HashMap<String, Vec<review_reply::Model>> = HashMap::new();
    for reply in ReviewReply::find()
        .filter(review_reply::Column::ReviewId.is_in(ids))
        .order_by_asc(review_reply::Column::CreatedAt)
        .all(db)
        .await?
    {
        replies.entry(reply.review_id.clone()).or_default().push(reply);
    }

    let names: HashMap<String, String> = User::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| {
            let name = u.display_name();
            (u.id, name)
        })
        .collect();

    reviews
        .into_iter()
        .map(|r| -> Result<Value, DomainError> {
            let mut value = serde_json::to_value(&r)?;
            if let Some(obj) = value.as_object_mut() {
                obj.insert(
                    "user_display_name".into(),
                    names.get(&r.user_id).cloned().unwrap_or_default().into(),
                );
                obj.insert("helpfulness_score".into(), r.helpfulness_score().into());
                obj.insert("helpful_percentage".into(), r.helpful_percentage().into());
                obj.insert("moderation_status".into(), r.moderation_status().into());
                obj.insert(
                    "images".into(),
                    serde_json::to_value(images.get(&r.id).cloned().unwrap_or_default())?,
                );
                obj.insert(
                    "replies".into(),
                    serde_json::to_value(replies.get(&r.id).cloned().unwrap_or_default())?,
                );
            }
            Ok(value)
        })
        .collect()
}

pub async fn review_dto(db: &DatabaseConnection, review: review::Model) -> Result<Value, DomainError> {
    hydrate(db, vec![review])
        .await?
        .pop()
        .ok_or_else(|| DomainError::not_found("Review"))
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

fn average(values: impl Iterator<Item = i32>) -> Option<f64> {
    let (sum, n) = values.fold((0i64, 0i64), |(s, n), v| (s + i64::from(v), n + 1));
    (n > 0).then(|| round2(sum as f64 / n as f64))
}

/// Rebuild the product's aggregate from its approved reviews.
pub async fn recompute_summary<C: ConnectionTrait>(
    db: &C,
    product_id: &str,
) -> Result<review_summary::Model, DomainError> {
    let approved = Review::find()
        .filter(review::Column::ProductId.eq(product_id))
        .filter(review::Column::IsApproved.eq(true))
        .all(db)
        .await?;

    let ids: Vec<String> = approved.iter().map(|r| r.id.clone()).collect();
    let with_images: HashSet<String> = if ids.is_empty() {
        HashSet::new()
    } else {
        ReviewImage::find()
            .filter(review_image::Column::ReviewId.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(|i| i.review_id)
            .collect()
    };

    let stars = |n: i32| approved.iter().filter(|r| r.rating == n).count() as i32;
    let summary = review_summary::Model {
        product_id: product_id.to_string(),
        total_reviews: approved.len() as i32,
        average_rating: average(approved.iter().map(|r| r.rating)).unwrap_or(0.0),
        rating_1: stars(1),
        rating_2: stars(2),
        rating_3: stars(3),
        rating_4: stars(4),
        rating_5: stars(5),
        avg_quality: average(approved.iter().filter_map(|r| r.quality_rating)),
        avg_value: average(approved.iter().filter_map(|r| r.value_rating)),
        avg_delivery: average(approved.iter().filter_map(|r| r.delivery_rating)),
        verified_count: approved.iter().filter(|r| r.is_verified_purchase).count() as i32,
        with_images_count: with_images.len() as i32,
        updated_at: now_str(),
    };

    let row = review_summary::ActiveModel {
        product_id: Set(summary.product_id.clone()),
        total_reviews: Set(summary.total_reviews),
        average_rating: Set(summary.average_rating),
        rating_1: Set(summary.rating_1),
        rating_2: Set(summary.rating_2),
        rating_3: Set(summary.rating_3),
        rating_4: Set(summary.rating_4),
        rating_5: Set(summary.rating_5),
        avg_quality: Set(summary.avg_quality),
        avg_value: Set(summary.avg_value),
        avg_delivery: Set(summary.avg_delivery),
        verified_count: Set(summary.verified_count),
        with_images_count: Set(summary.with_images_count),
        updated_at: Set(summary.updated_at.clone()),
    };
    ReviewSummary::insert(row)
        .on_conflict(
            OnConflict::column(review_summary::Column::ProductId)
                .update_columns([
                    review_summary::Column::TotalReviews,
                    review_summary::Column::AverageRating,
                    review_summary::Column::Rating1,
                    review_summary::Column::Rating2,
                    review_summary::Column::Rating3,
                    review_summary::Column::Rating4,
                    review_summary::Column::Rating5,
                    review_summary::Column::AvgQuality,
                    review_summary::Column::AvgValue,
                    review_summary::Column::AvgDelivery,
                    review_summary::Column::VerifiedCount,
                    review_summary::Column::WithImagesCount,
                    review_summary::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(summary)
}

pub async fn get_summary(
    db: &DatabaseConnection,
    product_id: &str,
) -> Result<review_summary::Model, DomainError> {
    match ReviewSummary::find_by_id(product_id.to_string()).one(db).await? {
        Some(summary) => Ok(summary),
        None => recompute_summary(db, product_id).await,
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ReviewQuery {
    pub rating: Option<i32>,
    #[serde(default)]
    pub verified_only: bool,
    #[serde(default)]
    pub with_images: bool,
    pub sort: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub async fn list_product_reviews(
    db: &DatabaseConnection,
    product_id: &str,
    q: &ReviewQuery,
) -> Result<Value, DomainError> {
    let limit = q.limit.unwrap_or(20).clamp(1, 100);
    let offset = q.offset.unwrap_or(0);

    let mut query = Review::find()
        .filter(review::Column::ProductId.eq(product_id))
        .filter(review::Column::IsApproved.eq(true));
    if let Some(rating) = q.rating {
        query = query.filter(review::Column::Rating.eq(rating));
    }
    if q.verified_only {
        query = query.filter(review::Column::IsVerifiedPurchase.eq(true));
    }
    if q.with_images {
        query = query.filter(
            review::Column::Id.in_subquery(
                Query::select()
                    .column(review_image::Column::ReviewId)
                    .from(review_image::Entity)
                    .to_owned(),
            ),
        );
    }

    query = match q.sort.as_deref() {
        Some("helpful") => query.order_by_desc(review::Column::HelpfulCount),
        Some("rating_high") => query.order_by_desc(review::Column::Rating),
        Some("rating_low") => query.order_by_asc(review::Column::Rating),
        _ => query,
    }
    .order_by_desc(review::Column::CreatedAt);

    let total = query.clone().count(db).await?;
    let rows = query.offset(offset).limit(limit).all(db).await?;
    Ok(json!({
        "reviews": hydrate(db, rows).await?,
        "total": total,
        "has_more": total > offset + limit,
    }))
}

/// Any review regardless of moderation state. Handlers check ownership.
pub async fn find_review(db: &DatabaseConnection, id: &str) -> Result<review::Model, DomainError> {
    Review::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Review"))
}

pub async fn get_review(db: &DatabaseConnection, id: &str) -> Result<review::Model, DomainError> {
    Review::find_by_id(id.to_string())
        .filter(review::Column::IsApproved.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Review"))
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct NewReview {
    pub product_id: String,
    pub order_id: Option<String>,
    pub rating: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
    pub quality_rating: Option<i32>,
    pub value_rating: Option<i32>,
    pub delivery_rating: Option<i32>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// The first delivered or completed order of `user_id` that contains the product.
async fn purchase_of<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    product_id: &str,
) -> Result<Option<String>, DomainError> {
    Ok(OrderItem::find()
        .inner_join(Order)
        .filter(order_item::Column::ProductId.eq(product_id))
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::Status.is_in(PURCHASED_STATUSES))
        .one(db)
        .await?
        .map(|item| item.order_id))
}

pub async fn create_review(
    db: &DatabaseConnection,
    user_id: &str,
    input: NewReview,
) -> Result<review::Model, DomainError> {
    if input.product_id.trim().is_empty() {
        return Err(DomainError::Validation("product_id is required".to_string()));
    }
    check_rating("rating", Some(input.rating))?;
    check_rating("quality_rating", input.quality_rating)?;
    check_rating("value_rating", input.value_rating)?;
    check_rating("delivery_rating", input.delivery_rating)?;
    if input.images.len() > MAX_IMAGES {
        return Err(DomainError::Validation(format!(
            "At most {} images per review",
            MAX_IMAGES
        )));
    }

    let txn = db.begin().await?;
    let duplicate = Review::find()
        .filter(review::Column::UserId.eq(user_id))
        .filter(review::Column::ProductId.eq(input.product_id.as_str()))
        .count(&txn)
        .await?
        > 0;
    if duplicate {
        return Err(DomainError::BusinessRule(
            "You have already reviewed this product".to_string(),
        ));
    }

    let purchase = purchase_of(&txn, user_id, &input.product_id).await?;
    let now = now_str();
    let created = review::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        product_id: Set(input.product_id.clone()),
        order_id: Set(input.order_id.or_else(|| purchase.clone())),
        rating: Set(input.rating),
        title: Set(input.title.trim().to_string()),
        comment: Set(input.comment.trim().to_string()),
        quality_rating: Set(input.quality_rating),
        value_rating: Set(input.value_rating),
        delivery_rating: Set(input.delivery_rating),
        is_verified_purchase: Set(purchase.is_some()),
        is_approved: Set(false),
        is_rejected: Set(false),
        rejection_reason: Set(None),
        moderated_by: Set(None),
        moderated_at: Set(None),
        helpful_count: Set(0),
        not_helpful_count: Set(0),
        is_featured: Set(false),
        is_pinned: Set(false),
        created_at: Set(now.clone()),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    for (i, url) in input.images.into_iter().enumerate() {
        ReviewImage::insert(review_image::ActiveModel {
            review_id: Set(created.id.clone()),
            image_url: Set(url),
            sort_order: Set(i as i32),
            ..Default::default()
        })
        .exec_without_returning(&txn)
        .await?;
    }

    recompute_summary(&txn, &created.product_id).await?;
    txn.commit().await?;

    tracing::info!("Review {} created for product {}", created.id, created.product_id);
    Ok(created)
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewUpdate {
    pub rating: Option<i32>,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub quality_rating: Option<i32>,
    pub value_rating: Option<i32>,
    pub delivery_rating: Option<i32>,
}

/// Editing the rating, title or comment sends the review back to moderation.
pub async fn update_review(
    db: &DatabaseConnection,
    existing: review::Model,
    input: ReviewUpdate,
) -> Result<review::Model, DomainError> {
    check_rating("rating", input.rating)?;
    check_rating("quality_rating", input.quality_rating)?;
    check_rating("value_rating", input.value_rating)?;
    check_rating("delivery_rating", input.delivery_rating)?;

    let content_changed = input.rating.is_some() || input.title.is_some() || input.comment.is_some();
    let product_id = existing.product_id.clone();

    let txn = db.begin().await?;
    let mut active: review::ActiveModel = existing.into();
    if let Some(rating) = input.rating {
        active.rating = Set(rating);
    }
    if let Some(title) = input.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(comment) = input.comment {
        active.comment = Set(comment.trim().to_string());
    }
    if input.quality_rating.is_some() {
        active.quality_rating = Set(input.quality_rating);
    }
    if input.value_rating.is_some() {
        active.value_rating = Set(input.value_rating);
    }
    if input.delivery_rating.is_some() {
        active.delivery_rating = Set(input.delivery_rating);
    }
    if content_changed {
        active.is_approved = Set(false);
        active.is_rejected = Set(false);
    }
    active.updated_at = Set(now_str());
    let updated = active.update(&txn).await?;

    recompute_summary(&txn, &product_id).await?;
    txn.commit().await?;
    Ok(updated)
}

pub async fn delete_review(db: &DatabaseConnection, existing: review::Model) -> Result<(), DomainError> {
    let txn = db.begin().await?;
    let product_id = existing.product_id.clone();
    let id = existing.id.clone();
    existing.delete(&txn).await?;
    recompute_summary(&txn, &product_id).await?;
    txn.commit().await?;

    tracing::info!("Review {} deleted", id);
    Ok(())
}

// ---------------------------------------------------------------------------
// Moderation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
}

pub async fn pending_reviews(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<review::Model>, DomainError> {
    Ok(Review::find()
        .filter(review::Column::IsApproved.eq(false))
        .filter(review::Column::IsRejected.eq(false))
        .order_by_asc(review::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await?)
}

async fn apply_moderation<C: ConnectionTrait>(
    db: &C,
    review: review::Model,
    action: ModerationAction,
    reason: &str,
    moderator_id: Option<&str>,
) -> Result<review::Model, DomainError> {
    let product_id = review.product_id.clone();
    let now = now_str();
    let mut active: review::ActiveModel = review.into();
    match action {
        ModerationAction::Approve => {
            active.is_approved = Set(true);
            active.is_rejected = Set(false);
        }
        ModerationAction::Reject => {
            active.is_approved = Set(false);
            active.is_rejected = Set(true);
            active.rejection_reason = Set(Some(reason.to_string()));
        }
    }
    active.moderated_by = Set(moderator_id.map(str::to_string));
    active.moderated_at = Set(Some(now.clone()));
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    recompute_summary(db, &product_id).await?;
    Ok(updated)
}

pub async fn moderate(
    db: &DatabaseConnection,
    id: &str,
    action: ModerationAction,
    reason: &str,
    moderator_id: &str,
) -> Result<review::Model, DomainError> {
    let txn = db.begin().await?;
    let review = Review::find_by_id(id.to_string())
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Review"))?;
    let updated = apply_moderation(&txn, review, action, reason, Some(moderator_id)).await?;
    txn.commit().await?;

    tracing::info!("Review {} {:?} by {}", id, action, moderator_id);
    Ok(updated)
}

pub async fn bulk_moderate(
    db: &DatabaseConnection,
    ids: Vec<String>,
    action: ModerationAction,
    reason: &str,
    moderator_id: &str,
) -> Result<u64, DomainError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let txn = db.begin().await?;
    let reviews = Review::find()
        .filter(review::Column::Id.is_in(ids))
        .all(&txn)
        .await?;
    let mut count = 0;
    for review in reviews {
        apply_moderation(&txn, review, action, reason, Some(moderator_id)).await?;
        count += 1;
    }
    txn.commit().await?;

    tracing::info!("Bulk {:?} of {} reviews by {}", action, count, moderator_id);
    Ok(count)
}

pub async fn reply(
    db: &DatabaseConnection,
    review_id: &str,
    user_id: &str,
    content: &str,
    is_official: bool,
) -> Result<review_reply::Model, DomainError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(DomainError::Validation("Content is required".to_string()));
    }
    find_review(db, review_id).await?;

    let created = review_reply::ActiveModel {
        review_id: Set(review_id.to_string()),
        user_id: Set(user_id.to_string()),
        content: Set(content.to_string()),
        is_official: Set(is_official),
        created_at: Set(now_str()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!("Reply added to review {}", review_id);
    Ok(created)
}

// ---------------------------------------------------------------------------
// Votes and reports
// ---------------------------------------------------------------------------

pub async fn vote(
    db: &DatabaseConnection,
    review_id: &str,
    user_id: &str,
    is_helpful: bool,
) -> Result<Value, DomainError> {
    let txn = db.begin().await?;
    let review = Review::find_by_id(review_id.to_string())
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Review"))?;
    if review.user_id == user_id {
        return Err(DomainError::BusinessRule(
            "You cannot vote on your own review".to_string(),
        ));
    }

    ReviewVote::insert(review_vote::ActiveModel {
        review_id: Set(review_id.to_string()),
        user_id: Set(user_id.to_string()),
        is_helpful: Set(is_helpful),
        created_at: Set(now_str()),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([review_vote::Column::ReviewId, review_vote::Column::UserId])
            .update_column(review_vote::Column::IsHelpful)
            .to_owned(),
    )
    .exec_without_returning(&txn)
    .await?;

    let votes = ReviewVote::find()
        .filter(review_vote::Column::ReviewId.eq(review_id))
        .all(&txn)
        .await?;
    let helpful = votes.iter().filter(|v| v.is_helpful).count() as i32;
    let not_helpful = votes.len() as i32 - helpful;

    let mut active: review::ActiveModel = review.into();
    active.helpful_count = Set(helpful);
    active.not_helpful_count = Set(not_helpful);
    active.updated_at = Set(now_str());
    active.update(&txn).await?;
    txn.commit().await?;

    Ok(json!({
        "helpful_count": helpful,
        "not_helpful_count": not_helpful,
    }))
}

pub async fn report(
    db: &DatabaseConnection,
    review_id: &str,
    user_id: &str,
    reason: &str,
    description: &str,
) -> Result<review_report::Model, DomainError> {
    if !review_report::REASONS.contains(&reason) {
        return Err(DomainError::Validation(format!("Invalid reason: {}", reason)));
    }
    let review = find_review(db, review_id).await?;
    if review.user_id == user_id {
        return Err(DomainError::BusinessRule(
            "You cannot report your own review".to_string(),
        ));
    }
    let repeated = ReviewReport::find()
        .filter(review_report::Column::ReviewId.eq(review_id))
        .filter(review_report::Column::UserId.eq(user_id))
        .count(db)
        .await?
        > 0;
    if repeated {
        return Err(DomainError::BusinessRule(
            "You have already reported this review".to_string(),
        ));
    }

    let created = review_report::ActiveModel {
        review_id: Set(review_id.to_string()),
        user_id: Set(user_id.to_string()),
        reason: Set(reason.to_string()),
        description: Set(description.trim().to_string()),
        status: Set("pending".to_string()),
        resolved_by: Set(None),
        resolved_at: Set(None),
        resolution_note: Set(None),
        created_at: Set(now_str()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::warn!("Review {} reported as {} by {}", review_id, reason, user_id);
    Ok(created)
}

pub async fn pending_reports(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<review_report::Model>, DomainError> {
    Ok(ReviewReport::find()
        .filter(review_report::Column::Status.eq("pending"))
        .order_by_asc(review_report::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportAction {
    Remove,
    Dismiss,
}

pub async fn resolve_report(
    db: &DatabaseConnection,
    id: i32,
    action: ReportAction,
    note: &str,
    handler_id: &str,
) -> Result<review_report::Model, DomainError> {
    let txn = db.begin().await?;
    let report = ReviewReport::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| DomainError::not_found("Report"))?;
    let review_id = report.review_id.clone();

    let mut active: review_report::ActiveModel = report.into();
    active.status = Set(match action {
        ReportAction::Remove => "resolved",
        ReportAction::Dismiss => "dismissed",
    }
    .to_string());
    active.resolved_by = Set(Some(handler_id.to_string()));
    active.resolved_at = Set(Some(now_str()));
    active.resolution_note = Set(Some(note.to_string()));
    let resolved = active.update(&txn).await?;

    if action == ReportAction::Remove
        && let Some(review) = Review::find_by_id(review_id).one(&txn).await?
    {
        apply_moderation(
            &txn,
            review,
            ModerationAction::Reject,
            "Removed due to report",
            Some(handler_id),
        )
        .await?;
    }
    txn.commit().await?;

    tracing::info!("Report {} handled ({:?}) by {}", id, action, handler_id);
    Ok(resolved)
}

// ---------------------------------------------------------------------------
// User and admin views
// ---------------------------------------------------------------------------

pub async fn user_reviews(
    db: &DatabaseConnection,
    user_id: &str,
    limit: u64,
) -> Result<Vec<review::Model>, DomainError> {
    Ok(Review::find()
        .filter(review::Column::UserId.eq(user_id))
        .order_by_desc(review::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await?)
}

/// Products from delivered orders that the user has not reviewed yet.
pub async fn reviewable_products(
    db: &DatabaseConnection,
    user_id: &str,
    limit: usize,
) -> Result<Vec<Value>, DomainError> {
    let reviewed: HashSet<String> = Review::find()
        .filter(review::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.product_id)
        .collect();

    let purchased = OrderItem::find()
        .inner_join(Order)
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::Status.is_in(PURCHASED_STATUSES))
        .order_by_desc(order_item::Column::Id)
        .all(db)
        .await?;

    let mut seen = HashSet::new();
    Ok(purchased
        .into_iter()
        .filter(|item| !reviewed.contains(&item.product_id))
        .filter(|item| seen.insert(item.product_id.clone()))
        .take(limit)
        .map(|item| {
            json!({
                "product_id": item.product_id,
                "product_name": item.product_name,
                "order_id": item.order_id,
            })
        })
        .collect())
}

pub async fn statistics(db: &DatabaseConnection) -> Result<Value, DomainError> {
    let total = Review::find().count(db).await?;
    let pending = Review::find()
        .filter(review::Column::IsApproved.eq(false))
        .filter(review::Column::IsRejected.eq(false))
        .count(db)
        .await?;
    let approved: Vec<i32> = Review::find()
        .select_only()
        .column(review::Column::Rating)
        .filter(review::Column::IsApproved.eq(true))
        .into_tuple()
        .all(db)
        .await?;
    let rejected = Review::find()
        .filter(review::Column::IsRejected.eq(true))
        .count(db)
        .await?;
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let reviews_today = Review::find()
        .filter(review::Column::CreatedAt.starts_with(&today))
        .count(db)
        .await?;
    let pending_reports = ReviewReport::find()
        .filter(review_report::Column::Status.eq("pending"))
        .count(db)
        .await?;

    Ok(json!({
        "total_reviews": total,
        "pending_reviews": pending,
        "approved_reviews": approved.len(),
        "rejected_reviews": rejected,
        "average_rating": average(approved.into_iter()).unwrap_or(0.0),
        "reviews_today": reviews_today,
        "pending_reports": pending_reports,
    }))
}

pub async fn admin_list(
    db: &DatabaseConnection,
    status: Option<&str>,
    params: &PageParams,
) -> Result<Page<review::Model>, DomainError> {
    let query = match status {
        Some("approved") => Review::find().filter(review::Column::IsApproved.eq(true)),
        Some("rejected") => Review::find().filter(review::Column::IsRejected.eq(true)),
        Some("pending") => Review::find()
            .filter(review::Column::IsApproved.eq(false))
            .filter(review::Column::IsRejected.eq(false)),
        Some(other) => {
            return Err(DomainError::Validation(format!("Invalid status: {}", other)));
        }
        None => Review::find(),
    };
    paginate(query.order_by_desc(review::Column::CreatedAt), db, params).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_round_and_skip_empty() {
        assert_eq!(average([5, 4, 4].into_iter()), Some(4.33));
        assert_eq!(average(std::iter::empty()), None);
    }

    #[test]
    fn ratings_are_bounded() {
        assert!(check_rating("rating", Some(0)).is_err());
        assert!(check_rating("rating", Some(6)).is_err());
        assert!(check_rating("rating", Some(5)).is_ok());
        assert!(check_rating("quality_rating", None).is_ok());
    }
}
