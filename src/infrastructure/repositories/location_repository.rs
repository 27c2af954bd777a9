//! SeaORM implementation of LocationRepository

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::OnConflict,
};

use crate::domain::{DomainError, LocationBatch, LocationMatches, LocationRepository};
use crate::models::{district, province, ward};

/// SeaORM-based implementation of LocationRepository
pub struct SeaOrmLocationRepository {
    db: DatabaseConnection,
}

impl SeaOrmLocationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LocationRepository for SeaOrmLocationRepository {
    async fn provinces(&self) -> Result<Vec<province::Model>, DomainError> {
        Ok(province::Entity::find()
            .filter(province::Column::IsActive.eq(true))
            .order_by_asc(province::Column::SortOrder)
            .order_by_asc(province::Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn province(&self, code: &str) -> Result<Option<province::Model>, DomainError> {
        Ok(province::Entity::find_by_id(code.to_string())
            .filter(province::Column::IsActive.eq(true))
            .one(&self.db)
            .await?)
    }

    async fn districts_of(&self, province_code: &str) -> Result<Vec<district::Model>, DomainError> {
        Ok(district::Entity::find()
            .filter(district::Column::ProvinceCode.eq(province_code))
            .filter(district::Column::IsActive.eq(true))
            .order_by_asc(district::Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn district(&self, code: &str) -> Result<Option<district::Model>, DomainError> {
        Ok(district::Entity::find_by_id(code.to_string())
            .filter(district::Column::IsActive.eq(true))
            .one(&self.db)
            .await?)
    }

    async fn wards_of(&self, district_code: &str) -> Result<Vec<ward::Model>, DomainError> {
        Ok(ward::Entity::find()
            .filter(ward::Column::DistrictCode.eq(district_code))
            .filter(ward::Column::IsActive.eq(true))
            .order_by_asc(ward::Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn ward(&self, code: &str) -> Result<Option<ward::Model>, DomainError> {
        Ok(ward::Entity::find_by_id(code.to_string())
            .filter(ward::Column::IsActive.eq(true))
            .one(&self.db)
            .await?)
    }

    async fn search(&self, slug: &str, limit: u64) -> Result<LocationMatches, DomainError> {
        let provinces = province::Entity::find()
            .filter(province::Column::IsActive.eq(true))
            .filter(province::Column::SearchSlug.contains(slug))
            .order_by_asc(province::Column::SortOrder)
            .limit(limit)
            .all(&self.db)
            .await?;

        let districts = district::Entity::find()
            .filter(district::Column::IsActive.eq(true))
            .filter(district::Column::SearchSlug.contains(slug))
            .order_by_asc(district::Column::Name)
            .limit(limit)
            .all(&self.db)
            .await?;

        let wards = ward::Entity::find()
            .filter(ward::Column::IsActive.eq(true))
            .filter(ward::Column::SearchSlug.contains(slug))
            .order_by_asc(ward::Column::Name)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(LocationMatches {
            provinces,
            districts,
            wards,
        })
    }

    async fn counts(&self) -> Result<(u64, u64, u64), DomainError> {
        let provinces = province::Entity::find()
            .filter(province::Column::IsActive.eq(true))
            .count(&self.db)
            .await?;
        let districts = district::Entity::find()
            .filter(district::Column::IsActive.eq(true))
            .count(&self.db)
            .await?;
        let wards = ward::Entity::find()
            .filter(ward::Column::IsActive.eq(true))
            .count(&self.db)
            .await?;
        Ok((provinces, districts, wards))
    }

    async fn write_batch(&self, batch: LocationBatch) -> Result<(), DomainError> {
        if batch.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin().await?;
        for row in batch.provinces {
            upsert_province(&txn, row).await?;
        }
        for row in batch.districts {
            upsert_district(&txn, row).await?;
        }
        for row in batch.wards {
            upsert_ward(&txn, row).await?;
        }
        txn.commit().await?;
        Ok(())
    }
}

async fn upsert_province<C: ConnectionTrait>(db: &C, row: province::Model) -> Result<(), DomainError> {
    let active = province::ActiveModel {
        code: Set(row.code),
        name: Set(row.name),
        name_with_type: Set(row.name_with_type),
        slug: Set(row.slug),
        division_type: Set(row.division_type),
        search_slug: Set(row.search_slug),
        ghn_id: Set(row.ghn_id),
        ghtk_id: Set(row.ghtk_id),
        is_active: Set(row.is_active),
        sort_order: Set(row.sort_order),
    };

    province::Entity::insert(active)
        .on_conflict(
            OnConflict::column(province::Column::Code)
                .update_columns([
                    province::Column::Name,
                    province::Column::NameWithType,
                    province::Column::Slug,
                    province::Column::DivisionType,
                    province::Column::SearchSlug,
                    province::Column::GhnId,
                    province::Column::GhtkId,
                    province::Column::IsActive,
                    province::Column::SortOrder,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

async fn upsert_district<C: ConnectionTrait>(db: &C, row: district::Model) -> Result<(), DomainError> {
    let active = district::ActiveModel {
        code: Set(row.code),
        province_code: Set(row.province_code),
        name: Set(row.name),
        name_with_type: Set(row.name_with_type),
        slug: Set(row.slug),
        division_type: Set(row.division_type),
        search_slug: Set(row.search_slug),
        path: Set(row.path),
        path_with_type: Set(row.path_with_type),
        ghn_id: Set(row.ghn_id),
        ghtk_id: Set(row.ghtk_id),
        is_active: Set(row.is_active),
    };

    district::Entity::insert(active)
        .on_conflict(
            OnConflict::column(district::Column::Code)
                .update_columns([
                    district::Column::ProvinceCode,
                    district::Column::Name,
                    district::Column::NameWithType,
                    district::Column::Slug,
                    district::Column::DivisionType,
                    district::Column::SearchSlug,
                    district::Column::Path,
                    district::Column::PathWithType,
                    district::Column::GhnId,
                    district::Column::GhtkId,
                    district::Column::IsActive,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

async fn upsert_ward<C: ConnectionTrait>(db: &C, row: ward::Model) -> Result<(), DomainError> {
    let active = ward::ActiveModel {
        code: Set(row.code),
        district_code: Set(row.district_code),
        name: Set(row.name),
        name_with_type: Set(row.name_with_type),
        slug: Set(row.slug),
        division_type: Set(row.division_type),
        search_slug: Set(row.search_slug),
        path: Set(row.path),
        path_with_type: Set(row.path_with_type),
        ghn_code: Set(row.ghn_code),
        ghtk_id: Set(row.ghtk_id),
        is_active: Set(row.is_active),
    };

    ward::Entity::insert(active)
        .on_conflict(
            OnConflict::column(ward::Column::Code)
                .update_columns([
                    ward::Column::DistrictCode,
                    ward::Column::Name,
                    ward::Column::NameWithType,
                    ward::Column::Slug,
                    ward::Column::DivisionType,
                    ward::Column::SearchSlug,
                    ward::Column::Path,
                    ward::Column::PathWithType,
                    ward::Column::GhnCode,
                    ward::Column::GhtkId,
                    ward::Column::IsActive,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}
