//! In-app notifications. Created internally by other services, read by the owner.

use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde_json::Value;

use crate::domain::DomainError;
use crate::models::notification::{self, Entity as Notification};
use crate::utils::pagination::{Page, PageParams, paginate};
use crate::utils::time::now_str;

pub struct NewNotification<'a> {
    pub user_id: &'a str,
    pub notification_type: &'a str,
    pub title: &'a str,
    pub message: String,
    pub action_url: Option<String>,
    pub data: Value,
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    input: NewNotification<'_>,
) -> Result<notification::Model, DomainError> {
    let model = notification::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        user_id: Set(input.user_id.to_string()),
        notification_type: Set(input.notification_type.to_string()),
        title: Set(input.title.to_string()),
        message: Set(input.message),
        action_url: Set(input.action_url),
        data: Set(input.data.to_string()),
        is_read: Set(false),
        read_at: Set(None),
        created_at: Set(now_str()),
    }
    .insert(db)
    .await?;

    tracing::debug!(
        "Notification {} ({}) for user {}",
        model.id,
        model.notification_type,
        model.user_id
    );
    Ok(model)
}

pub async fn list(
    db: &DatabaseConnection,
    user_id: &str,
    unread_only: bool,
    params: &PageParams,
) -> Result<Page<notification::Model>, DomainError> {
    let mut query = Notification::find().filter(notification::Column::UserId.eq(user_id));
    if unread_only {
        query = query.filter(notification::Column::IsRead.eq(false));
    }
    paginate(
        query.order_by_desc(notification::Column::CreatedAt),
        db,
        params,
    )
    .await
}

pub async fn get(
    db: &DatabaseConnection,
    user_id: &str,
    id: &str,
) -> Result<notification::Model, DomainError> {
    Notification::find_by_id(id.to_string())
        .filter(notification::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Notification"))
}

/// Mark the given notifications read, or all of them when `ids` is `None`.
pub async fn mark_read(
    db: &DatabaseConnection,
    user_id: &str,
    ids: Option<Vec<String>>,
) -> Result<u64, DomainError> {
    let mut update = Notification::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .col_expr(notification::Column::ReadAt, Expr::value(now_str()))
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::IsRead.eq(false));
    if let Some(ids) = ids {
        if ids.is_empty() {
            return Ok(0);
        }
        update = update.filter(notification::Column::Id.is_in(ids));
    }
    Ok(update.exec(db).await?.rows_affected)
}

pub async fn unread_count(db: &DatabaseConnection, user_id: &str) -> Result<u64, DomainError> {
    Ok(Notification::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::IsRead.eq(false))
        .count(db)
        .await?)
}
