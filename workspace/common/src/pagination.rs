//! Page/limit pagination parameters shared by list endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_LIMIT: u64 = 10;

/// 1-based page selection with a per-page limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageParams {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageParams {
    /// Clamp out-of-range inputs to sane values instead of rejecting them.
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1),
        }
    }

    /// Zero-based page index for the database paginator.
    pub fn page_index(&self) -> u64 {
        self.page - 1
    }

    /// Number of pages needed for `total_items` rows.
    pub fn total_pages(&self, total_items: u64) -> u64 {
        total_items.div_ceil(self.limit)
    }
}
