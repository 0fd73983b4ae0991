//! Page requests and paginated results shared by the list operations.

use crate::errors::Result;
use sea_orm::{ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait, Select};
use serde::{Deserialize, Serialize};

const DEFAULT_PER_PAGE: u64 = 10;
const MAX_PER_PAGE: u64 = 100;

/// 1-based page selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub per_page: Option<u64>,
}

impl PageRequest {
    /// Requests page `page` of `per_page` items.
    #[must_use]
    pub const fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    /// Builds a request from optional query-string values.
    #[must_use]
    pub const fn from_query(page: Option<u64>, per_page: Option<u64>) -> Self {
        Self { page, per_page }
    }

    /// Page number, at least 1.
    #[must_use]
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=100`.
    #[must_use]
    pub fn per_page(&self) -> u64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }
}

/// One page of results plus the numbers a pager needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
}

impl<T> Page<T> {
    /// Assembles a page from already-fetched items.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        let per_page = request.per_page();
        Self {
            items,
            page: request.page(),
            per_page,
            total,
            last_page: total.div_ceil(per_page).max(1),
        }
    }

    /// Transforms the items, keeping the paging numbers.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
        }
    }
}

/// Runs `select` for the requested page.
pub async fn fetch_page<C, E>(
    db: &C,
    select: Select<E>,
    request: PageRequest,
) -> Result<Page<E::Model>>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync + 'static,
{
    let paginator = select.paginate(db, request.per_page());
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(request.page() - 1).await?;
    Ok(Page::new(items, request, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        let request = PageRequest::new(0, 1000);
        assert_eq!(request.page(), 1);
        assert_eq!(request.per_page(), 100);
        assert_eq!(PageRequest::default().per_page(), 10);
    }

    #[test]
    fn test_page_request_from_query() {
        let request = PageRequest::from_query(Some(3), None);
        assert_eq!(request.page(), 3);
        assert_eq!(request.per_page(), 10);
        assert_eq!(PageRequest::from_query(None, None), PageRequest::default());
    }

    #[test]
    fn test_last_page() {
        let page = Page::new(vec![1, 2], PageRequest::new(1, 2), 5);
        assert_eq!(page.last_page, 3);
        let empty: Page<u8> = Page::new(Vec::new(), PageRequest::default(), 0);
        assert_eq!(empty.last_page, 1);
        assert_eq!(page.map(|n| n * 10).items, vec![10, 20]);
    }
}
