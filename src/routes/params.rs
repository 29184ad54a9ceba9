use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

const MAX_PAGE: i64 = 1_000_000;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self { page, per_page }
    }

    /// Returns `(page, per_page, offset)` with page in 1..=1_000_000 and
    /// per_page in 1..=100.
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Name,
}

// Query structs keep page/per_page inline: serde_urlencoded cannot parse
// numbers through #[serde(flatten)].

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub brand_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status_id: Option<i32>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LowStockQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub threshold: Option<i32>,
}

impl LowStockQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RevenueQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelQuery {
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_to_first_page_of_twenty() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
    }

    #[test]
    fn pagination_clamps_out_of_range_values() {
        assert_eq!(Pagination::new(Some(0), Some(500)).normalize(), (1, 100, 0));
        assert_eq!(Pagination::new(Some(3), Some(0)).normalize(), (3, 1, 2));
        assert_eq!(Pagination::new(Some(2), Some(10)).normalize(), (2, 10, 10));
    }

    #[test]
    fn huge_page_numbers_are_capped_instead_of_overflowing() {
        let (page, per_page, offset) =
            Pagination::new(Some(i64::MAX / 10), Some(100)).normalize();
        assert_eq!(page, MAX_PAGE);
        assert_eq!(per_page, 100);
        assert_eq!(offset, (MAX_PAGE - 1) * 100);

        let (page, _, offset) = Pagination::new(Some(i64::MAX), None).normalize();
        assert_eq!(page, MAX_PAGE);
        assert!(offset > 0);
    }
}
