//! Page-number and cursor pagination helpers, shared by `CrudOperations` and
//! any caller building its own queries against `QueryBuilder`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    /// Page number (1-based).
    pub page: u32,
    pub per_page: u32,
    /// Set after the query executes a count pass.
    pub total: Option<u64>,
    pub total_pages: Option<u32>,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
            total: None,
            total_pages: None,
        }
    }

    pub fn offset(&self) -> i64 {
        ((self.page - 1) * self.per_page) as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = Some(total);
        self.total_pages = Some(((total as f64) / (self.per_page as f64)).ceil() as u32);
    }

    pub fn has_next(&self) -> bool {
        match self.total_pages {
            Some(total_pages) => self.page < total_pages,
            None => false,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> PaginatedResult<T> {
    pub fn new(data: Vec<T>, pagination: Pagination) -> Self {
        Self { data, pagination }
    }

    pub fn with_total(data: Vec<T>, mut pagination: Pagination, total: u64) -> Self {
        pagination.set_total(total);
        Self { data, pagination }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_and_limit_follow_page_arithmetic() {
        let p = Pagination::new(3, 10);
        assert_eq!(p.offset(), 20);
        assert_eq!(p.limit(), 10);
    }

    #[test]
    fn set_total_rounds_pages_up() {
        let mut p = Pagination::new(1, 10);
        p.set_total(25);
        assert_eq!(p.total_pages, Some(3));
        assert!(p.has_next());
    }

    #[test]
    fn page_one_has_no_prev() {
        assert!(!Pagination::new(1, 10).has_prev());
        assert!(Pagination::new(2, 10).has_prev());
    }
}
