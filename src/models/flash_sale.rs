use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::time::parse_ts;

pub const STATUS_SCHEDULED: &str = "scheduled";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_ENDED: &str = "ended";
pub const STATUS_CANCELLED: &str = "cancelled";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flash_sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::flash_sale_item::Entity")]
    Items,
}

impl Related<super::flash_sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((parse_ts(&self.start_time)?, parse_ts(&self.end_time)?))
    }

    pub fn is_ongoing(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.status != STATUS_CANCELLED
            && self
                .window()
                .is_some_and(|(start, end)| start <= now && now <= end)
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.status != STATUS_CANCELLED
            && self.window().is_some_and(|(start, _)| start > now)
    }

    /// Seconds left until the sale ends, 0 once over.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> i64 {
        self.window()
            .map(|(_, end)| (end - now).num_seconds().max(0))
            .unwrap_or(0)
    }

    /// Status implied by the clock. A cancelled sale stays cancelled.
    pub fn derived_status(&self, now: DateTime<Utc>) -> &'static str {
        if self.status == STATUS_CANCELLED {
            return STATUS_CANCELLED;
        }
        match self.window() {
            Some((start, _)) if now < start => STATUS_SCHEDULED,
            Some((_, end)) if now > end => STATUS_ENDED,
            Some(_) => STATUS_ACTIVE,
            None => STATUS_SCHEDULED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::utils::time::to_ts;

    fn sale(start: DateTime<Utc>, end: DateTime<Utc>, status: &str) -> Model {
        Model {
            id: "f".into(),
            name: "Midnight".into(),
            description: String::new(),
            start_time: to_ts(start),
            end_time: to_ts(end),
            status: status.into(),
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn status_follows_clock_except_cancelled() {
        let now = Utc::now();
        let running = sale(now - Duration::hours(1), now + Duration::hours(1), STATUS_SCHEDULED);
        assert_eq!(running.derived_status(now), STATUS_ACTIVE);
        assert!(running.is_ongoing(now));
        assert!(running.time_remaining(now) > 3500);

        let later = sale(now + Duration::hours(2), now + Duration::hours(3), STATUS_ACTIVE);
        assert_eq!(later.derived_status(now), STATUS_SCHEDULED);
        assert!(later.is_upcoming(now));

        let cancelled = sale(now - Duration::hours(1), now + Duration::hours(1), STATUS_CANCELLED);
        assert_eq!(cancelled.derived_status(now), STATUS_CANCELLED);
        assert!(!cancelled.is_ongoing(now));
    }
}
