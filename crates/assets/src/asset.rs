use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use assetdesk_core::{AssetId, DomainError, DomainResult, Entity};

/// Whether an asset must come back after use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    Returnable,
    #[serde(rename = "Non-returnable")]
    NonReturnable,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Returnable => "Returnable",
            ProductType::NonReturnable => "Non-returnable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Returnable" => Some(ProductType::Returnable),
            "Non-returnable" => Some(ProductType::NonReturnable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    OutOfStock,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::OutOfStock => "out_of_stock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(Availability::Available),
            "out_of_stock" => Some(Availability::OutOfStock),
            _ => None,
        }
    }

    fn for_quantity(quantity: i64) -> Self {
        if quantity > 0 { Availability::Available } else { Availability::OutOfStock }
    }
}

/// Request status lifecycle.
///
/// `pending` is the only entry state; HR moves a request to `approved` or
/// `rejected`, and a returnable item ends in `returned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Pending => "pending",
            AssetStatus::Approved => "approved",
            AssetStatus::Rejected => "rejected",
            AssetStatus::Returned => "returned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AssetStatus::Pending),
            "approved" => Some(AssetStatus::Approved),
            "rejected" => Some(AssetStatus::Rejected),
            "returned" => Some(AssetStatus::Returned),
            _ => None,
        }
    }
}

/// A company asset and, once requested, the request made against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "_id")]
    pub id: AssetId,

    pub product_name: String,

    pub product_quantity: i64,

    #[serde(default)]
    pub product_type: Option<ProductType>,

    #[serde(default)]
    pub availability: Option<Availability>,

    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,

    /// Email of the HR user owning this asset (tenant key).
    #[serde(rename = "Item_Added_By", default)]
    pub item_added_by: Option<String>,

    #[serde(rename = "requesterEmail", default)]
    pub requester_email: Option<String>,

    #[serde(rename = "requesterName", default)]
    pub requester_name: Option<String>,

    #[serde(rename = "requestDate", default)]
    pub request_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub status: Option<AssetStatus>,

    #[serde(rename = "approvedDate", default)]
    pub approved_date: Option<DateTime<Utc>>,
}

impl Entity for Asset {
    type Id = AssetId;

    fn id(&self) -> AssetId {
        self.id
    }
}

/// Payload for adding an asset to a company's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAsset {
    pub product_name: String,
    pub product_quantity: i64,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub availability: Option<Availability>,
    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,
}

/// A lifecycle transition on an asset request.
///
/// Transitions do not check the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Reject,
    Approve { approved_date: DateTime<Utc> },
    MarkReturned,
}

impl Transition {
    pub fn target_status(&self) -> AssetStatus {
        match self {
            Transition::Reject => AssetStatus::Rejected,
            Transition::Approve { .. } => AssetStatus::Approved,
            Transition::MarkReturned => AssetStatus::Returned,
        }
    }
}

pub(crate) fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("product_name cannot be empty"));
    }
    Ok(())
}

pub(crate) fn validate_quantity(quantity: i64) -> DomainResult<()> {
    if quantity < 0 {
        return Err(DomainError::validation("product_quantity cannot be negative"));
    }
    Ok(())
}

impl Asset {
    /// Build an inventory asset owned by `owner`.
    ///
    /// The owner always comes from the authenticated caller, never the payload.
    pub fn create(id: AssetId, owner: &str, new: NewAsset, now: DateTime<Utc>) -> DomainResult<Self> {
        validate_name(&new.product_name)?;
        validate_quantity(new.product_quantity)?;

        Ok(Self {
            id,
            availability: Some(
                new.availability
                    .unwrap_or_else(|| Availability::for_quantity(new.product_quantity)),
            ),
            product_name: new.product_name,
            product_quantity: new.product_quantity,
            product_type: new.product_type,
            date_added: Some(new.date_added.unwrap_or(now)),
            item_added_by: Some(owner.to_string()),
            requester_email: None,
            requester_name: None,
            request_date: None,
            notes: None,
            status: None,
            approved_date: None,
        })
    }

    pub fn is_owned_by(&self, email: &str) -> bool {
        self.item_added_by.as_deref() == Some(email)
    }

    pub fn is_requested_by(&self, email: &str) -> bool {
        self.requester_email.as_deref() == Some(email)
    }

    /// Apply a lifecycle transition in place.
    ///
    /// `MarkReturned` sets the status and puts one unit back in stock as a
    /// single mutation; stores must persist both or neither.
    pub fn apply(&mut self, transition: &Transition) -> DomainResult<()> {
        match transition {
            Transition::Reject => {}
            Transition::Approve { approved_date } => {
                self.approved_date = Some(*approved_date);
            }
            Transition::MarkReturned => {
                self.product_quantity = self
                    .product_quantity
                    .checked_add(1)
                    .ok_or_else(|| DomainError::invariant("product_quantity overflow"))?;
            }
        }
        self.status = Some(transition.target_status());
        Ok(())
    }
}
