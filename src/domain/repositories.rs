//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;

use super::DomainError;
use crate::models::{district, province, user, ward};

/// Input for creating a user account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_email_verified: bool,
}

/// Repository trait for User entity
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<user::Model>, DomainError>;

    /// Case-insensitive email lookup
    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, DomainError>;

    async fn create(&self, input: NewUser) -> Result<user::Model, DomainError>;

    async fn update_profile(
        &self,
        id: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<user::Model, DomainError>;

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<(), DomainError>;

    async fn touch_last_login(&self, id: &str) -> Result<(), DomainError>;
}

/// Matches of a slug search across the three administrative levels
#[derive(Debug, Default)]
pub struct LocationMatches {
    pub provinces: Vec<province::Model>,
    pub districts: Vec<district::Model>,
    pub wards: Vec<ward::Model>,
}

/// Rows to upsert together, parents before children
#[derive(Debug, Default)]
pub struct LocationBatch {
    pub provinces: Vec<province::Model>,
    pub districts: Vec<district::Model>,
    pub wards: Vec<ward::Model>,
}

impl LocationBatch {
    pub fn is_empty(&self) -> bool {
        self.provinces.is_empty() && self.districts.is_empty() && self.wards.is_empty()
    }
}

/// Repository trait for provinces, districts and wards
#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Active provinces ordered by sort order, then name
    async fn provinces(&self) -> Result<Vec<province::Model>, DomainError>;

    async fn province(&self, code: &str) -> Result<Option<province::Model>, DomainError>;

    async fn districts_of(&self, province_code: &str) -> Result<Vec<district::Model>, DomainError>;

    async fn district(&self, code: &str) -> Result<Option<district::Model>, DomainError>;

    async fn wards_of(&self, district_code: &str) -> Result<Vec<ward::Model>, DomainError>;

    async fn ward(&self, code: &str) -> Result<Option<ward::Model>, DomainError>;

    /// Rows whose search slug contains `slug`, at most `limit` per level
    async fn search(&self, slug: &str, limit: u64) -> Result<LocationMatches, DomainError>;

    /// Active row counts: (provinces, districts, wards)
    async fn counts(&self) -> Result<(u64, u64, u64), DomainError>;

    /// Upsert every row of `batch` by code, all or nothing
    async fn write_batch(&self, batch: LocationBatch) -> Result<(), DomainError>;
}
