//! Generic filter/page request and paging arithmetic.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default page size for the POST select entry point.
pub const DEFAULT_PER_PAGE: i64 = 25;
/// Default page size for the GET list entry point.
pub const LIST_PER_PAGE: i64 = 100;
pub const MAX_PER_PAGE: i64 = 200;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub select: Option<Vec<String>>,
    /// Equality filters, ANDed.
    #[serde(rename = "where")]
    pub where_eq: Option<Map<String, Value>>,
    pub or_where: Option<Map<String, Value>>,
    /// Case-insensitive substring filters, ANDed.
    pub like: Option<Map<String, Value>>,
    pub or_like: Option<Map<String, Value>>,
    pub order_by: Vec<OrderBy>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub with_total: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrderBy {
    pub field: String,
    pub dir: String,
}

/// Resolved paging window. `limit` over-fetches one row to detect a further page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub per_page: i64,
    pub offset: i64,
    pub limit: i64,
}

impl PageParams {
    /// Non-positive or missing values fall back to page 1 / `default_per_page`; per_page is capped.
    pub fn new(page: Option<i64>, per_page: Option<i64>, default_per_page: i64) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let per_page = per_page
            .filter(|p| *p > 0)
            .unwrap_or(default_per_page)
            .clamp(1, MAX_PER_PAGE);
        PageParams {
            page,
            per_page,
            offset: (page - 1).saturating_mul(per_page),
            limit: per_page + 1,
        }
    }
}

impl PageRequest {
    pub fn paging(&self, default_per_page: i64) -> PageParams {
        PageParams::new(self.page, self.per_page, default_per_page)
    }
}

/// Paging block returned alongside a page of rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Paging {
    pub page: i64,
    pub per_page: i64,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<i64>,
}

impl Paging {
    pub fn new(params: &PageParams, has_more: bool, total_rows: Option<i64>) -> Self {
        Paging {
            page: params.page,
            per_page: params.per_page,
            has_more,
            total_rows,
            total_pages: total_rows.map(|t| (t + params.per_page - 1) / params.per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_and_offsets() {
        assert_eq!(
            PageParams::new(None, None, DEFAULT_PER_PAGE),
            PageParams { page: 1, per_page: 25, offset: 0, limit: 26 }
        );
        assert_eq!(
            PageParams::new(Some(3), Some(10), DEFAULT_PER_PAGE),
            PageParams { page: 3, per_page: 10, offset: 20, limit: 11 }
        );
    }

    #[test]
    fn per_page_is_bounded() {
        for (input, default, want) in [
            (Some(0), DEFAULT_PER_PAGE, 25),
            (Some(-4), LIST_PER_PAGE, 100),
            (Some(1), DEFAULT_PER_PAGE, 1),
            (Some(200), DEFAULT_PER_PAGE, 200),
            (Some(5000), DEFAULT_PER_PAGE, 200),
        ] {
            let p = PageParams::new(None, input, default);
            assert_eq!(p.per_page, want, "{:?}", input);
            assert!((1..=MAX_PER_PAGE).contains(&p.per_page));
        }
    }

    #[test]
    fn non_positive_page_is_first_page() {
        assert_eq!(PageParams::new(Some(0), None, 25).page, 1);
        assert_eq!(PageParams::new(Some(-2), None, 25).offset, 0);
    }

    #[test]
    fn total_pages_round_up() {
        let p = PageParams::new(Some(1), Some(2), 25);
        assert_eq!(Paging::new(&p, true, Some(3)).total_pages, Some(2));
        assert_eq!(Paging::new(&p, false, Some(0)).total_pages, Some(0));
        assert_eq!(Paging::new(&p, false, None).total_pages, None);
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let req: PageRequest = serde_json::from_value(serde_json::json!({
            "where": {"nama_ps": "Budi"},
            "order_by": [{"field": "nama_ps"}],
            "per_page": 2
        }))
        .unwrap();
        assert_eq!(req.where_eq.as_ref().unwrap()["nama_ps"], "Budi");
        assert_eq!(req.order_by[0].dir, "");
        assert!(!req.with_total);
        assert_eq!(req.paging(DEFAULT_PER_PAGE).limit, 3);
    }

    #[test]
    fn paging_block_omits_totals_unless_requested() {
        let p = PageParams::new(None, Some(2), 25);
        let json = serde_json::to_value(Paging::new(&p, true, None)).unwrap();
        assert_eq!(json, serde_json::json!({"page": 1, "per_page": 2, "has_more": true}));
    }
}
