//! Offset pagination helpers for explore listing pages.

use serde::{Deserialize, Serialize};

/// One page of a fixed-size listing window. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    page: u32,
    per_page: u32,
}

impl PageWindow {
    /// Page numbers below 1 are treated as page 1; `per_page` is at least 1.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// Number of pages needed for `total` rows; zero rows need zero pages.
    pub fn total_pages(&self, total: u64) -> u32 {
        let pages = total.div_ceil(u64::from(self.per_page));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

/// Slice `items` into 1-based pages of `page_size`, returning page `page`.
pub fn slice_page<T: Clone>(items: &[T], page: u32, page_size: usize) -> Vec<T> {
    let page_size = page_size.max(1);
    let start = (page.max(1) as usize - 1).saturating_mul(page_size);
    items.iter().skip(start).take(page_size).cloned().collect()
}

/// Pages needed to show `len` items, never less than one.
pub fn page_count(len: usize, page_size: usize) -> u32 {
    let pages = len.div_ceil(page_size.max(1)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}
