use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use assetdesk_core::{DomainError, DomainResult, Entity, PaymentId};

/// One settled subscription payment. Records are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    #[serde(rename = "_id")]
    pub id: PaymentId,
    pub email: String,
    pub category_price: f64,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(rename = "transactionId", default)]
    pub transaction_id: Option<String>,
    pub date: DateTime<Utc>,
}

impl Entity for PaymentRecord {
    type Id = PaymentId;

    fn id(&self) -> PaymentId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub email: String,
    pub category_price: f64,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(rename = "transactionId", default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn record(id: PaymentId, new: NewPayment, now: DateTime<Utc>) -> DomainResult<Self> {
        amount_in_cents(new.category_price)?;
        Ok(Self {
            id,
            email: new.email,
            category_price: new.category_price,
            category: new.category,
            transaction_id: new.transaction_id,
            date: new.date.unwrap_or(now),
        })
    }
}

/// Convert a dollar price into the integer cent amount the gateway charges.
pub fn amount_in_cents(price: f64) -> DomainResult<i64> {
    if !price.is_finite() || price <= 0.0 {
        return Err(DomainError::validation("price must be a positive amount"));
    }
    let cents = (price * 100.0).round();
    if cents < 1.0 || cents > i64::MAX as f64 {
        return Err(DomainError::validation("price is out of range"));
    }
    Ok(cents as i64)
}
