//! "Showing 11-20 of 47 items" label for a list page.

use std::fmt;

/// 1-based inclusive row range of the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowingRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ShowingRange {
    /// Range for `page` (1-based) with `per_page` rows out of `total`.
    ///
    /// A page past the end, or an empty list, yields `0-0`.
    #[must_use]
    pub fn new(page: u32, per_page: u32, total: u64) -> Self {
        let per_page = u64::from(per_page.max(1));
        let first_index = u64::from(page.max(1) - 1) * per_page;

        if first_index >= total {
            return Self {
                start: 0,
                end: 0,
                total,
            };
        }

        Self {
            start: first_index + 1,
            end: (first_index + per_page).min(total),
            total,
        }
    }
}

impl fmt::Display for ShowingRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Showing {}-{} of {} items",
            self.start, self.end, self.total
        )
    }
}
