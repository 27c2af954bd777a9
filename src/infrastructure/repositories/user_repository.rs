//! SeaORM implementation of UserRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::domain::{DomainError, NewUser, UserRepository};
use crate::models::user::{self, ActiveModel, Entity as UserEntity};
use crate::utils::time::now_str;

/// SeaORM-based implementation of UserRepository
pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<user::Model>, DomainError> {
        Ok(UserEntity::find_by_id(id.to_string()).one(&self.db).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, DomainError> {
        let normalized = email.trim().to_lowercase();
        Ok(UserEntity::find()
            .filter(user::Column::Email.eq(normalized))
            .one(&self.db)
            .await?)
    }

    async fn create(&self, input: NewUser) -> Result<user::Model, DomainError> {
        let email = input.email.trim().to_lowercase();
        if self.find_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let now = now_str();
        let user = ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            email: Set(email),
            password_hash: Set(input.password_hash),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            role: Set(input.role),
            is_active: Set(true),
            is_email_verified: Set(input.is_email_verified),
            last_login_at: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        Ok(user.insert(&self.db).await?)
    }

    async fn update_profile(
        &self,
        id: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<user::Model, DomainError> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))?;

        let mut active: ActiveModel = existing.into();
        if let Some(first) = first_name {
            active.first_name = Set(first.trim().to_string());
        }
        if let Some(last) = last_name {
            active.last_name = Set(last.trim().to_string());
        }
        active.updated_at = Set(now_str());

        Ok(active.update(&self.db).await?)
    }

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<(), DomainError> {
        let result = UserEntity::update_many()
            .col_expr(user::Column::PasswordHash, password_hash.into())
            .col_expr(user::Column::UpdatedAt, now_str().into())
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("User"));
        }
        Ok(())
    }

    async fn touch_last_login(&self, id: &str) -> Result<(), DomainError> {
        UserEntity::update_many()
            .col_expr(user::Column::LastLoginAt, now_str().into())
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
