use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// `?limit=&offset=` as sent by clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Sanitised page bounds handed to services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn from_query(query: &PageQuery, max_page_size: i64) -> Self {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, max_page_size.max(1));
        let offset = query.offset.unwrap_or(0).max(0);
        Self { limit, offset }
    }

    /// Used by jobs and internal callers that want everything in one go
    pub fn first(limit: i64) -> Self {
        Self { limit, offset: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_bounds() {
        let page = Page::from_query(&PageQuery { limit: Some(10_000), offset: Some(-5) }, 200);
        assert_eq!(page, Page { limit: 200, offset: 0 });

        let page = Page::from_query(&PageQuery::default(), 200);
        assert_eq!(page, Page { limit: DEFAULT_PAGE_SIZE, offset: 0 });

        let page = Page::from_query(&PageQuery { limit: Some(0), offset: Some(20) }, 200);
        assert_eq!(page, Page { limit: 1, offset: 20 });
    }
}
