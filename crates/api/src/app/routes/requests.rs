//! Request lifecycle endpoints: listing requests and moving them through
//! reject / approve / return.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, patch, put},
};
use chrono::Utc;

use assetdesk_assets::AssetStatus;
use assetdesk_core::AssetId;

use crate::app::routes::common::{ok_json, parse_id};
use crate::app::{dto, errors, services::AppServices};
use crate::authz::require_self;
use crate::context::{IdentityContext, PrincipalContext};

pub fn authenticated() -> Router {
    Router::new()
        .route("/assetByEmail/:email", get(my_requests))
        .route("/asset_returned/:id", patch(mark_returned))
}

pub fn hr() -> Router {
    Router::new()
        .route("/allRequestByEmail/:email", get(requests_for_owner))
        .route("/asset_rejected/:id", patch(reject))
        .route("/asset_status_change/:id", put(change_status))
}

pub async fn my_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
    Query(params): Query<dto::RequestQueryParams>,
) -> axum::response::Response {
    if let Err(resp) = require_self(&identity, &email) {
        return resp;
    }
    match services.assets.list_by_requester(&email, &params.into_filter()).await {
        Ok(assets) => ok_json(assets),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn requests_for_owner(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_self(&identity, &email) {
        return resp;
    }
    match services.assets.list_requests_for_owner(&email).await {
        Ok(assets) => ok_json(assets),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn reject(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AssetId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.lifecycle.reject(id, principal.email()).await {
        Ok(result) => ok_json(result),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

/// Owner or requester puts the item back; stock goes up by one.
pub async fn mark_returned(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AssetId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.lifecycle.mark_returned(id, identity.email()).await {
        Ok(result) => ok_json(result),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

/// `approved` (with `approvedDate`, defaulting to now) or `rejected`.
pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::StatusChangeRequest>,
) -> axum::response::Response {
    let id: AssetId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let result = match body.status {
        AssetStatus::Approved => {
            let approved_date = body.approved_date.unwrap_or_else(Utc::now);
            services.lifecycle.approve(id, principal.email(), approved_date).await
        }
        AssetStatus::Rejected => services.lifecycle.reject(id, principal.email()).await,
        other => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                format!("status must be approved or rejected, got {}", other.as_str()),
            );
        }
    };

    match result {
        Ok(result) => ok_json(result),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}
