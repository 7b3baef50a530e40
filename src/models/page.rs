//! Pagination and patch helpers shared by the repository and handlers.

use serde::Serialize;

/// Requested window for a paged query. `per_page <= 0` means "no limit".
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    pub page: i64,
    pub per_page: i64,
}

/// Page metadata returned alongside a paged listing.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

/// A value plus a flag telling whether it should be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Change<T> {
    pub value: T,
    pub changed: bool,
}

/// Number of pages needed for `total_items` at `per_page` items each.
///
/// A non-positive `per_page` is a single synthetic page. Never overflows.
pub fn total_pages(per_page: i64, total_items: i64) -> i64 {
    if per_page <= 0 {
        return 1;
    }
    total_items / per_page + i64::from(total_items % per_page != 0)
}

/// Row offset of `page`, saturating instead of overflowing on huge pages.
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    page.max(0).saturating_mul(per_page.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(10, 25), 3);
        assert_eq!(total_pages(10, 30), 3);
        assert_eq!(total_pages(10, 1), 1);
        assert_eq!(total_pages(10, 0), 0);
    }

    #[test]
    fn total_pages_at_extremes() {
        assert_eq!(total_pages(i64::MAX, 25), 1);
        assert_eq!(total_pages(i64::MAX, i64::MAX), 1);
        assert_eq!(total_pages(1, i64::MAX), i64::MAX);
        assert_eq!(total_pages(2, i64::MAX), i64::MAX / 2 + 1);
    }

    #[test]
    fn page_offset_saturates() {
        assert_eq!(page_offset(3, 10), 30);
        assert_eq!(page_offset(-4, 10), 0);
        assert_eq!(page_offset(i64::MAX / 2, 10), i64::MAX);
        assert_eq!(page_offset(2, i64::MAX), i64::MAX);
    }

    #[test]
    fn total_pages_without_limit_is_one() {
        assert_eq!(total_pages(0, 25), 1);
        assert_eq!(total_pages(-5, 0), 1);
    }
}
