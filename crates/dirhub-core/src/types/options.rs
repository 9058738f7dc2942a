//! Options accepted by directory reads.
//!
//! Paging always applies to the final flat sequence a read produces
//! (for transitive reads: the whole ancestry or subtree), never to the
//! recursion frontier.

use serde::{Deserialize, Serialize};

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Options for single-directory reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOptions {
    /// Include soft-deleted directories.
    #[serde(default)]
    pub with_deleted: bool,
}

impl GetOptions {
    /// Options that also return soft-deleted directories.
    pub fn with_deleted() -> Self {
        Self { with_deleted: true }
    }
}

/// Options for list reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Include soft-deleted directories.
    #[serde(default)]
    pub with_deleted: bool,
    /// Page number (1-based).
    #[serde(default = "default_page")]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl ListOptions {
    /// Create list options, clamping `page` and `page_size` to at least 1.
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            with_deleted: false,
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Set whether soft-deleted directories are included.
    pub fn including_deleted(mut self, with_deleted: bool) -> Self {
        self.with_deleted = with_deleted;
        self
    }

    /// The options for the following page.
    pub fn next_page(self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self
        }
    }

    /// The get-options matching this list's deletion filter.
    pub fn get_options(&self) -> GetOptions {
        GetOptions {
            with_deleted: self.with_deleted,
        }
    }

    /// Number of items skipped before this page.
    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1).saturating_mul(self.limit())
    }

    /// Maximum number of items on this page.
    pub fn limit(&self) -> u64 {
        self.page_size.max(1)
    }

    /// Cut this page out of a fully materialized sequence.
    pub fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            with_deleted: false,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}
