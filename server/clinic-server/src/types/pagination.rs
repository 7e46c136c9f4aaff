//! Pagination types shared by every list endpoint

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// `page` and `limit` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    #[param(example = 1, minimum = 1)]
    pub page: Option<u32>,

    #[param(example = 10, minimum = 1, maximum = 100)]
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self { page, limit }
    }

    /// Page number (defaults to 1, minimum 1)
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size with the given default, clamped to 1..=100
    pub fn limit_or(&self, default: u32) -> u32 {
        self.limit.unwrap_or(default).clamp(1, MAX_LIMIT)
    }

    pub fn limit(&self) -> u32 {
        self.limit_or(DEFAULT_LIMIT)
    }

    pub fn offset_for(&self, limit: u32) -> i64 {
        i64::from(self.page() - 1) * i64::from(limit)
    }

    pub fn offset(&self) -> i64 {
        self.offset_for(self.limit())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub item_count: usize,
    pub total_items: i64,
    pub items_per_page: u32,
    pub total_pages: i64,
    pub current_page: u32,
}

impl PageMeta {
    pub fn new(item_count: usize, total_items: i64, items_per_page: u32, current_page: u32) -> Self {
        let per_page = i64::from(items_per_page.max(1));
        let total_pages = if total_items <= 0 {
            0
        } else {
            (total_items + per_page - 1) / per_page
        };

        Self {
            item_count,
            total_items,
            items_per_page,
            total_pages,
            current_page,
        }
    }
}

/// `{ items, meta }` envelope
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_items: i64, limit: u32, page: u32) -> Self {
        let meta = PageMeta::new(items.len(), total_items, limit, page);
        Self { items, meta }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let params = PageQuery::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 10);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_pagination_clamps() {
        let params = PageQuery::new(Some(0), Some(500));
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 100);

        assert_eq!(PageQuery::new(None, Some(0)).limit(), 1);
    }

    #[test]
    fn test_pagination_offset() {
        let params = PageQuery::new(Some(3), Some(10));
        assert_eq!(params.offset(), 20);
        assert_eq!(params.offset_for(20), 40);
    }

    #[test]
    fn test_limit_or_default() {
        assert_eq!(PageQuery::default().limit_or(20), 20);
        assert_eq!(PageQuery::new(None, Some(5)).limit_or(20), 5);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(PageMeta::new(10, 21, 10, 1).total_pages, 3);
        assert_eq!(PageMeta::new(10, 20, 10, 1).total_pages, 2);
        assert_eq!(PageMeta::new(0, 0, 10, 1).total_pages, 0);
    }

    #[test]
    fn test_meta_serializes_camel_case() {
        let page = Paginated::new(vec![1, 2], 12, 2, 1);
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["meta"]["itemCount"], 2);
        assert_eq!(json["meta"]["totalItems"], 12);
        assert_eq!(json["meta"]["itemsPerPage"], 2);
        assert_eq!(json["meta"]["totalPages"], 6);
        assert_eq!(json["meta"]["currentPage"], 1);
    }
}
