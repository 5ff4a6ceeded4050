use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// `?page=&limit=` query parameters, clamped server-side.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageQuery {
    pub fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit
    }
}

/// Pagination metadata echoed alongside every listing.
#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub total: i64,
    pub count: usize,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    pub fn new(total: i64, count: usize, query: PageQuery) -> Self {
        let query = query.clamped();
        let total_pages = (total + query.limit - 1) / query.limit;
        Self {
            total,
            count,
            page: query.page,
            limit: query.limit,
            total_pages,
            has_next: query.page < total_pages,
            has_prev: query.page > 1,
        }
    }
}

#[cfg(test)]
mod pagination_tests {
    use super::*;

    #[test]
    fn limit_is_clamped_to_server_maximum() {
        let q = PageQuery {
            page: 0,
            limit: 5000,
        }
        .clamped();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, MAX_LIMIT);
    }

    #[test]
    fn offset_follows_page() {
        let q = PageQuery { page: 3, limit: 20 };
        assert_eq!(q.offset(), 40);
    }

    #[test]
    fn meta_reports_boundaries() {
        let meta = PageMeta::new(45, 5, PageQuery { page: 3, limit: 20 });
        assert_eq!(meta.total_pages, 3);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let meta = PageMeta::new(0, 0, PageQuery::default());
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }
}
