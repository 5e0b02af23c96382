//! Request/response bodies that exist only at the HTTP boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use assetdesk_assets::{AssetStatus, Availability, ProductType};
use assetdesk_infra::query::{AssetQuery, Pagination, RequestFilter, SortOrder};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// `PUT /asset_status_change/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChangeRequest {
    pub status: AssetStatus,
    #[serde(rename = "approvedDate", default)]
    pub approved_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentRequest {
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentResponse {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

/// Query string of `GET /assets_get`. Unknown filter values are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetsQueryParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub search: Option<String>,
    #[serde(rename = "availabilityCheck")]
    pub availability_check: Option<String>,
    #[serde(rename = "productType")]
    pub product_type: Option<String>,
    pub sort: Option<String>,
}

impl AssetsQueryParams {
    pub fn into_query(self, owner: &str) -> AssetQuery {
        let mut query = AssetQuery::for_owner(owner);
        query.search = non_blank(self.search);
        query.availability = self.availability_check.as_deref().and_then(Availability::parse);
        query.product_type = self.product_type.as_deref().and_then(ProductType::parse);
        query.sort = self.sort.as_deref().and_then(SortOrder::parse);
        query.pagination = Pagination::new(self.page, self.size);
        query
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestQueryParams {
    pub search: Option<String>,
    pub status: Option<String>,
}

impl RequestQueryParams {
    pub fn into_filter(self) -> RequestFilter {
        RequestFilter {
            search: non_blank(self.search),
            status: self.status.as_deref().and_then(AssetStatus::parse),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
