//! Payment gateway clients.
//!
//! The API only needs one operation from a gateway: open a payment intent
//! for an amount and hand the client secret back to the browser.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("payment gateway request failed: {0}")]
    Transport(String),

    #[error("payment gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("payment gateway response was not understood: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent and return its client secret.
    async fn create_intent(&self, amount_cents: i64, currency: &str) -> Result<String, GatewayError>;
}

/// Stripe REST adapter (`POST /v1/payment_intents`).
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self), err)]
    async fn create_intent(&self, amount_cents: i64, currency: &str) -> Result<String, GatewayError> {
        let amount = amount_cents.to_string();
        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", currency),
                ("payment_method_types[]", "card"),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            return Err(GatewayError::Rejected { status: status.as_u16(), message });
        }

        let intent = response
            .json::<PaymentIntentResponse>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        intent
            .client_secret
            .ok_or_else(|| GatewayError::InvalidResponse("missing client_secret".into()))
    }
}

/// In-process gateway for development and tests. Secrets are deterministic.
#[derive(Debug, Default)]
pub struct DevPaymentGateway {
    issued: AtomicU64,
}

impl DevPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for DevPaymentGateway {
    async fn create_intent(&self, amount_cents: i64, currency: &str) -> Result<String, GatewayError> {
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(amount_cents, currency, "dev payment intent created");
        Ok(format!("pi_dev_{n}_secret_{amount_cents}{currency}"))
    }
}
