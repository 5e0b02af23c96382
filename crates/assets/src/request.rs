use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use assetdesk_core::{AssetId, DomainError, DomainResult};

use crate::asset::{Asset, AssetStatus, Availability, ProductType, validate_name, validate_quantity};

/// Payload an employee submits to request an asset.
///
/// The requester fields are always written. Any asset fields present are
/// merged as well, so clients may send back the whole asset document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRequest {
    #[serde(rename = "requesterEmail")]
    pub requester_email: String,

    #[serde(rename = "requesterName", default)]
    pub requester_name: Option<String>,

    #[serde(rename = "requestDate", default)]
    pub request_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub status: Option<AssetStatus>,

    #[serde(default)]
    pub product_name: Option<String>,

    #[serde(default)]
    pub product_quantity: Option<i64>,

    #[serde(default)]
    pub product_type: Option<ProductType>,

    #[serde(default)]
    pub availability: Option<Availability>,

    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,

    /// Only honoured when the request creates a new asset.
    #[serde(rename = "Item_Added_By", default)]
    pub item_added_by: Option<String>,
}

impl AssetRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if self.requester_email.trim().is_empty() {
            return Err(DomainError::validation("requesterEmail cannot be empty"));
        }
        if let Some(name) = &self.product_name {
            validate_name(name)?;
        }
        if let Some(quantity) = self.product_quantity {
            validate_quantity(quantity)?;
        }
        if let Some(status) = self.status.filter(|s| *s != AssetStatus::Pending) {
            return Err(DomainError::validation(format!(
                "a request can only be pending, got {}",
                status.as_str()
            )));
        }
        Ok(())
    }

    /// Drop the inventory fields, keeping only what a requester may write.
    pub fn without_inventory_fields(self) -> Self {
        Self {
            product_name: None,
            product_quantity: None,
            product_type: None,
            availability: None,
            date_added: None,
            ..self
        }
    }

    fn effective_status(&self) -> AssetStatus {
        self.status.unwrap_or(AssetStatus::Pending)
    }
}

impl Asset {
    /// Merge a request into this asset.
    ///
    /// Applying the same request twice leaves the asset unchanged after the
    /// first application. The owning tenant is never rewritten.
    pub fn apply_request(&mut self, request: &AssetRequest) -> DomainResult<()> {
        request.validate()?;

        if let Some(name) = &request.product_name {
            self.product_name = name.clone();
        }
        if let Some(quantity) = request.product_quantity {
            self.product_quantity = quantity;
        }
        if request.product_type.is_some() {
            self.product_type = request.product_type;
        }
        if request.availability.is_some() {
            self.availability = request.availability;
        }
        if request.date_added.is_some() {
            self.date_added = request.date_added;
        }

        self.requester_email = Some(request.requester_email.clone());
        self.requester_name = request.requester_name.clone();
        self.request_date = request.request_date;
        self.notes = request.notes.clone();
        self.status = Some(request.effective_status());
        Ok(())
    }

    /// Build a new asset with `id` from a request that matched nothing.
    pub fn from_request(id: AssetId, request: &AssetRequest) -> DomainResult<Self> {
        request.validate()?;
        let product_name = request
            .product_name
            .clone()
            .ok_or_else(|| DomainError::validation("product_name is required to create an asset"))?;

        Ok(Self {
            id,
            product_name,
            product_quantity: request.product_quantity.unwrap_or(0),
            product_type: request.product_type,
            availability: request.availability,
            date_added: request.date_added,
            item_added_by: request.item_added_by.clone(),
            requester_email: Some(request.requester_email.clone()),
            requester_name: request.requester_name.clone(),
            request_date: request.request_date,
            notes: request.notes.clone(),
            status: Some(request.effective_status()),
            approved_date: None,
        })
    }

    /// Apply an HR edit of the inventory fields.
    pub fn apply_details(&mut self, details: &AssetDetails) -> DomainResult<()> {
        details.validate()?;
        if let Some(name) = &details.product_name {
            self.product_name = name.clone();
        }
        if let Some(quantity) = details.product_quantity {
            self.product_quantity = quantity;
        }
        if details.product_type.is_some() {
            self.product_type = details.product_type;
        }
        if details.date_added.is_some() {
            self.date_added = details.date_added;
        }
        Ok(())
    }
}

/// Editable inventory fields of an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDetails {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_quantity: Option<i64>,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,
}

impl AssetDetails {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.product_name {
            validate_name(name)?;
        }
        if let Some(quantity) = self.product_quantity {
            validate_quantity(quantity)?;
        }
        Ok(())
    }
}
