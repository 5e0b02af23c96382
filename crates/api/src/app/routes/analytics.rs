//! HR dashboard aggregates and the employee's monthly history.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;

use assetdesk_infra::query::{LIMITED_STOCK_THRESHOLD, TOP_REQUESTS_LIMIT, month_window};

use crate::app::routes::common::ok_json;
use crate::app::{errors, services::AppServices};
use crate::authz::require_self;
use crate::context::IdentityContext;

pub fn authenticated() -> Router {
    Router::new().route("/monthly_requests/:email", get(monthly_requests))
}

pub fn hr() -> Router {
    Router::new()
        .route("/top_requests/:email", get(top_requests))
        .route("/limited_stock/:email", get(limited_stock))
        .route("/pending_requests/:email", get(pending_requests))
        .route("/request_stats/:email", get(request_stats))
}

pub async fn top_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_self(&identity, &email) {
        return resp;
    }
    match services.assets.top_requested(&email, TOP_REQUESTS_LIMIT).await {
        Ok(top) => ok_json(top),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn limited_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_self(&identity, &email) {
        return resp;
    }
    match services.assets.limited_stock(&email, LIMITED_STOCK_THRESHOLD).await {
        Ok(assets) => ok_json(assets),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn pending_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_self(&identity, &email) {
        return resp;
    }
    match services.assets.pending_requests(&email).await {
        Ok(assets) => ok_json(assets),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn request_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_self(&identity, &email) {
        return resp;
    }
    match services.assets.type_breakdown(&email).await {
        Ok(stats) => ok_json(stats),
        Err(e) => errors::repo_error_to_response(e),
    }
}

/// Requests made by the caller during the current calendar month (UTC).
pub async fn monthly_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_self(&identity, &email) {
        return resp;
    }
    let Some((from, to)) = month_window(Utc::now()) else {
        return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "clock_error", "could not compute month window");
    };
    match services.assets.requests_between(&email, from, to).await {
        Ok(assets) => ok_json(assets),
        Err(e) => errors::repo_error_to_response(e),
    }
}
