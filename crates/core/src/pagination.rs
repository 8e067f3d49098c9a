//! Page arithmetic shared by the list view
//!
//! Pages are 1-indexed. Requests outside the valid range are clamped rather
//! than rejected, so callers never have to handle an out-of-range error.

use serde::Serialize;

/// Number of pages needed for `total_items`; zero items means zero pages
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}

/// Clamp a requested page into `[1, total_pages]`
///
/// With zero pages the result is 1, so the first page of an empty
/// list is still a valid position.
pub fn clamp_page(page: usize, total_items: usize, page_size: usize) -> usize {
    let pages = total_pages(total_items, page_size);
    page.clamp(1, pages.max(1))
}

/// Calculate slice bounds for a given page
///
/// Returns `(start, end)` for slicing the items array. The page is clamped
/// first; an empty list yields `(0, 0)`.
pub fn calculate_pagination(total_items: usize, page: usize, page_size: usize) -> (usize, usize) {
    let page = clamp_page(page, total_items, page_size);
    let start = ((page - 1) * page_size).min(total_items);
    let end = (start + page_size).min(total_items);
    (start, end)
}

/// Pagination metadata attached to a rendered page
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

pub fn page_info(page: usize, total_items: usize, page_size: usize) -> PageInfo {
    let current_page = clamp_page(page, total_items, page_size);
    let total_pages = total_pages(total_items, page_size);

    PageInfo {
        current_page,
        total_pages,
        total_items,
        page_size,
        has_previous: current_page > 1,
        has_next: current_page < total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 50), 0);
        assert_eq!(total_pages(1, 50), 1);
        assert_eq!(total_pages(50, 50), 1);
        assert_eq!(total_pages(51, 50), 2);
        assert_eq!(total_pages(151, 50), 4);
    }

    #[test]
    fn test_calculate_pagination_basic() {
        assert_eq!(calculate_pagination(100, 2, 10), (10, 20));
    }

    #[test]
    fn test_calculate_pagination_first_page() {
        assert_eq!(calculate_pagination(100, 1, 10), (0, 10));
    }

    #[test]
    fn test_calculate_pagination_last_page_is_shorter() {
        assert_eq!(calculate_pagination(151, 4, 50), (150, 151));
    }

    #[test]
    fn test_calculate_pagination_clamps_beyond_last() {
        assert_eq!(calculate_pagination(100, 20, 10), (90, 100));
    }

    #[test]
    fn test_calculate_pagination_clamps_page_zero() {
        assert_eq!(calculate_pagination(100, 0, 10), (0, 10));
    }

    #[test]
    fn test_calculate_pagination_empty() {
        assert_eq!(calculate_pagination(0, 1, 50), (0, 0));
        assert_eq!(calculate_pagination(0, 7, 50), (0, 0));
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(0, 151, 50), 1);
        assert_eq!(clamp_page(3, 151, 50), 3);
        assert_eq!(clamp_page(9, 151, 50), 4);
        assert_eq!(clamp_page(5, 0, 50), 1);
    }

    #[test]
    fn test_page_info_middle() {
        let info = page_info(2, 151, 50);
        assert_eq!(info.current_page, 2);
        assert_eq!(info.total_pages, 4);
        assert!(info.has_previous);
        assert!(info.has_next);
    }

    #[test]
    fn test_page_info_empty() {
        let info = page_info(1, 0, 50);
        assert_eq!(info.current_page, 1);
        assert_eq!(info.total_pages, 0);
        assert!(!info.has_previous);
        assert!(!info.has_next);
    }
}
