//! Query and aggregation types shared by every asset store.
//!
//! All inventory queries are tenant-scoped (by owning HR email) and
//! paginated by default.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use assetdesk_assets::{Asset, AssetStatus, Availability, ProductType};

/// Page/size pagination (0-based pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub size: u32,
}

impl Pagination {
    pub const DEFAULT_SIZE: u32 = 10;
    pub const MAX_SIZE: u32 = 1000;

    pub fn new(page: Option<u32>, size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(0),
            size: size.unwrap_or(Self::DEFAULT_SIZE).clamp(1, Self::MAX_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Sort direction on `product_quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Filtered inventory search within one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetQuery {
    pub owner: String,
    pub search: Option<String>,
    pub availability: Option<Availability>,
    pub product_type: Option<ProductType>,
    /// `None` orders newest first by `date_added`.
    pub sort: Option<SortOrder>,
    pub pagination: Pagination,
}

impl AssetQuery {
    pub fn for_owner(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            search: None,
            availability: None,
            product_type: None,
            sort: None,
            pagination: Pagination::default(),
        }
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        asset.is_owned_by(&self.owner)
            && self
                .search
                .as_deref()
                .is_none_or(|needle| contains_ignore_case(&asset.product_name, needle))
            && self.availability.is_none_or(|a| asset.availability == Some(a))
            && self.product_type.is_none_or(|t| asset.product_type == Some(t))
    }

    /// Order `items` the way the query asks for.
    pub fn sort(&self, items: &mut [Asset]) {
        match self.sort {
            Some(SortOrder::Asc) => items.sort_by(|a, b| a.product_quantity.cmp(&b.product_quantity)),
            Some(SortOrder::Desc) => items.sort_by(|a, b| b.product_quantity.cmp(&a.product_quantity)),
            None => items.sort_by(|a, b| b.date_added.cmp(&a.date_added).then(b.id.cmp(&a.id))),
        }
    }
}

/// Filters over an employee's own requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub search: Option<String>,
    pub status: Option<AssetStatus>,
}

impl RequestFilter {
    pub fn matches(&self, asset: &Asset) -> bool {
        self.search
            .as_deref()
            .is_none_or(|needle| contains_ignore_case(&asset.product_name, needle))
            && self.status.is_none_or(|s| asset.status == Some(s))
    }
}

/// One page of results plus the total across all pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        let has_more = pagination.offset() + (items.len() as u64) < total;
        Self {
            items,
            total,
            page: pagination.page,
            size: pagination.size,
            has_more,
        }
    }
}

/// Request count for one product name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopRequest {
    pub product_name: String,
    pub count: u64,
}

/// Requested items split by product type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeBreakdown {
    pub returnable: u64,
    pub non_returnable: u64,
}

pub const TOP_REQUESTS_LIMIT: usize = 4;
pub const LIMITED_STOCK_THRESHOLD: i64 = 10;

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Escape a user search term for use inside an `ILIKE '%...%'` pattern.
pub fn like_pattern(search: &str) -> String {
    let mut out = String::with_capacity(search.len() + 2);
    out.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Half-open `[start, end)` window covering the calendar month of `now` (UTC).
pub fn month_window(now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (year, month) = (now.year(), now.month());
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

    let start = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?.and_utc();
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.and_hms_opt(0, 0, 0)?.and_utc();
    Some((start, end))
}
