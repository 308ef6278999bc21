//! Pagination types
//!
//! Unlike a UI list, a report rejects out-of-range paging instead of
//! clamping it: `page = 0` is a caller bug, not a request for page 1.

use serde::Deserialize;

use crate::error::{QueryError, Result};

/// Default page when the request omits it
pub const DEFAULT_PAGE: i64 = 1;

/// Default page size when the request omits it
pub const DEFAULT_LIMIT: i64 = 50;

/// Validated pagination request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    limit: i64,
    offset: i64,
}

impl PageRequest {
    /// Create a page request.
    ///
    /// - `page` and `limit` must both be >= 1
    /// - the resulting offset must fit in an `i64`
    pub fn new(page: i64, limit: i64) -> Result<Self> {
        if page < 1 {
            return Err(QueryError::invalid("page", format!("must be >= 1, got {}", page)));
        }
        if limit < 1 {
            return Err(QueryError::invalid("limit", format!("must be >= 1, got {}", limit)));
        }

        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| QueryError::invalid("page", "offset overflows"))?;

        Ok(Self { page, limit, offset })
    }

    /// Page number (1-indexed)
    pub fn page(&self) -> i64 {
        self.page
    }

    /// SQL LIMIT value.
    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// SQL OFFSET value, `(page - 1) * limit`.
    pub fn offset(&self) -> i64 {
        self.offset
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Pagination fields as they appear in a request body
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    DEFAULT_PAGE
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl TryFrom<PageParams> for PageRequest {
    type Error = QueryError;

    fn try_from(params: PageParams) -> Result<Self> {
        Self::new(params.page, params.limit)
    }
}
