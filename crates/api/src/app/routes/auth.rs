//! `POST /jwt`: token issuance for registered users.

use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode};
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

use assetdesk_auth::TokenError;

use crate::app::routes::common::ok_json;
use crate::app::{dto, errors, services::AppServices};

pub async fn issue_token(
    Extension(services): Extension<Arc<AppServices>>,
    Json(identity): Json<Value>,
) -> axum::response::Response {
    let Some(email) = identity.get("email").and_then(Value::as_str).map(str::to_string) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "email is required");
    };

    match services.users.find_by_email(&email).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::unauthorized(),
        Err(e) => return errors::repo_error_to_response(e),
    }

    match services.tokens.issue(identity, Utc::now()) {
        Ok(issued) => {
            info!(email = %email, exp = issued.claims.exp, "token issued");
            ok_json(dto::TokenResponse { token: issued.token })
        }
        Err(TokenError::Identity(e)) => errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
        Err(e) => {
            error!(error = %e, "token signing failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "could not issue token")
        }
    }
}
