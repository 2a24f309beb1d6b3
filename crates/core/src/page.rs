//! Pagination primitives for list/query surfaces.

use serde::{Deserialize, Serialize};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of rows to return.
    pub limit: u32,
    /// Offset (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50, // Safe default
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(1000), // Cap at 1000 for safety
            offset: offset.unwrap_or(0),
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of rows matching the query (across all pages).
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Slice a fully materialized result set into one page.
    ///
    /// Storage backends that can push pagination into the query should do so
    /// instead; this helper is for in-memory scans.
    pub fn from_vec(mut all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as u64;
        let start = (pagination.offset as usize).min(all.len());
        let end = (start + pagination.limit as usize).min(all.len());
        let items: Vec<T> = all.drain(start..end).collect();
        let has_more = (end as u64) < total;
        Self {
            items,
            total,
            pagination,
            has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_slices_and_reports_has_more() {
        let page = Page::from_vec(
            (0..10).collect::<Vec<_>>(),
            Pagination {
                limit: 4,
                offset: 4,
            },
        );
        assert_eq!(page.items, vec![4, 5, 6, 7]);
        assert_eq!(page.total, 10);
        assert!(page.has_more);

        let last = Page::from_vec(
            (0..10).collect::<Vec<_>>(),
            Pagination {
                limit: 4,
                offset: 8,
            },
        );
        assert_eq!(last.items, vec![8, 9]);
        assert!(!last.has_more);
    }

    #[test]
    fn offset_past_end_yields_empty_page() {
        let page = Page::from_vec(vec![1, 2, 3], Pagination { limit: 5, offset: 9 });
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert!(!page.has_more);
    }
}
