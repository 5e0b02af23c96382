//! Subscription checkout: payment intents and the payment history.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{get, post},
};
use chrono::Utc;
use tracing::info;

use assetdesk_core::PaymentId;
use assetdesk_directory::{NewPayment, PaymentRecord, amount_in_cents};

use crate::app::routes::common::ok_json;
use crate::app::{dto, errors, services::AppServices};
use crate::authz::require_self;
use crate::context::IdentityContext;

pub const CURRENCY: &str = "usd";

pub fn authenticated() -> Router {
    Router::new()
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/payments", post(record_payment))
        .route("/payments/:email", get(payment_history))
}

pub async fn create_payment_intent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Json(body): Json<dto::PaymentIntentRequest>,
) -> axum::response::Response {
    let amount = match amount_in_cents(body.price) {
        Ok(amount) => amount,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.gateway.create_intent(amount, CURRENCY).await {
        Ok(client_secret) => {
            info!(email = %identity.email(), amount_cents = amount, "payment intent created");
            ok_json(dto::PaymentIntentResponse { client_secret })
        }
        Err(e) => errors::gateway_error_to_response(e),
    }
}

pub async fn record_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Json(body): Json<NewPayment>,
) -> axum::response::Response {
    if let Err(resp) = require_self(&identity, &body.email) {
        return resp;
    }
    let record = match PaymentRecord::record(PaymentId::new(), body, Utc::now()) {
        Ok(record) => record,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let (email, category) = (record.email.clone(), record.category);

    match services.payments.append(record).await {
        Ok(result) => {
            info!(email = %email, category = ?category, "payment recorded");
            ok_json(result)
        }
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn payment_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_self(&identity, &email) {
        return resp;
    }
    match services.payments.list_by_email(&email).await {
        Ok(records) => ok_json(records),
        Err(e) => errors::repo_error_to_response(e),
    }
}
