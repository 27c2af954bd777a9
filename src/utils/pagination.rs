//! Page-number pagination shared by list endpoints.

use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Select};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PageParams {
    pub fn page(&self) -> u64 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub count: u64,
    pub page: u64,
    pub pages: u64,
    pub page_size: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: u64, params: &PageParams) -> Self {
        let page_size = params.page_size();
        let page = params.page();
        let pages = count.div_ceil(page_size).max(1);
        Self {
            results,
            count,
            page,
            pages,
            page_size,
            has_next: page < pages,
            has_previous: page > 1,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            results: self.results.into_iter().map(f).collect(),
            count: self.count,
            page: self.page,
            pages: self.pages,
            page_size: self.page_size,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

/// Run `query` for the requested page, counting the full result set.
pub async fn paginate<E>(
    query: Select<E>,
    db: &DatabaseConnection,
    params: &PageParams,
) -> Result<Page<E::Model>, DomainError>
where
    E: EntityTrait,
    E::Model: Sync,
{
    let paginator = query.paginate(db, params.page_size());
    let count = paginator.num_items().await?;
    let results = paginator.fetch_page(params.page() - 1).await?;
    Ok(Page::new(results, count, params))
}
