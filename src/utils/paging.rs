/// Row offset for a 1-based `page`. Saturates instead of overflowing and
/// stays within Postgres `BIGINT` range.
pub fn page_offset(page: u64, limit: u64) -> u64 {
    page.max(1)
        .saturating_sub(1)
        .saturating_mul(limit)
        .min(i64::MAX as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_pages() {
        assert_eq!(page_offset(0, 10), 0);
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
    }

    #[test]
    fn test_huge_page_saturates() {
        assert_eq!(page_offset(u64::MAX, 10), i64::MAX as u64);
        assert_eq!(page_offset(u64::MAX / 2, 100), i64::MAX as u64);
    }
}
