//! Pagination envelope for listing responses.

use serde::Serialize;

/// One page of results with navigation flags.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    /// Zero-based page number.
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    /// Builds a page, deriving the page count and navigation flags.
    pub fn new(content: Vec<T>, page: i64, size: i64, total_elements: i64) -> Self {
        let total_pages = if size > 0 {
            (total_elements as u64).div_ceil(size as u64) as i64
        } else {
            0
        };
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
            has_next: page < total_pages - 1,
            has_previous: page > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_on_middle_page() {
        let page = Page::new(vec![1, 2], 1, 2, 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_previous);
    }

    #[test]
    fn test_flags_on_first_and_last_pages() {
        let first: Page<i32> = Page::new(vec![], 0, 2, 5);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let last: Page<i32> = Page::new(vec![], 2, 2, 5);
        assert!(!last.has_next);
        assert!(last.has_previous);
    }

    #[test]
    fn test_empty_result() {
        let page: Page<i32> = Page::new(vec![], 0, 20, 0);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }
}
