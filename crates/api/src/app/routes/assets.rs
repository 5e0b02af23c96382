//! Inventory endpoints: HR catalog management, tenant search, and the
//! employee request (upsert) path.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    routing::{delete, get, patch, post, put},
};
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use assetdesk_assets::{Asset, AssetDetails, AssetRequest, NewAsset};
use assetdesk_core::AssetId;
use assetdesk_infra::query::{Page, Pagination};

use crate::app::routes::common::{ok_json, parse_id};
use crate::app::{dto, errors, services::AppServices};
use crate::authz::{require_self, tenant_of};
use crate::context::{IdentityContext, PrincipalContext};

pub fn authenticated() -> Router {
    Router::new()
        .route("/assets_get", get(search_assets))
        .route("/assetOne/:id", get(get_asset))
        .route("/assets/:id", put(request_asset))
}

pub fn hr() -> Router {
    Router::new()
        .route("/addAssets", post(add_asset))
        .route("/assets", get(list_assets))
        .route("/update/:id", patch(update_asset))
        .route("/asset/delete/:id", delete(delete_asset))
}

/// The new asset is always owned by the caller.
pub async fn add_asset(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewAsset>,
) -> axum::response::Response {
    let asset = match Asset::create(AssetId::new(), principal.email(), body, Utc::now()) {
        Ok(asset) => asset,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let (id, name, quantity) = (asset.id, asset.product_name.clone(), asset.product_quantity);

    match services.assets.insert(asset).await {
        Ok(result) => {
            info!(asset_id = %id, product = %name, quantity, owner = %principal.email(), "asset added");
            ok_json(result)
        }
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn list_assets(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.assets.list_by_owner(principal.email()).await {
        Ok(assets) => ok_json(assets),
        Err(e) => errors::repo_error_to_response(e),
    }
}

/// Paginated inventory of the caller's tenant. Callers outside any company
/// get an empty page.
pub async fn search_assets(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Query(params): Query<dto::AssetsQueryParams>,
) -> axum::response::Response {
    let tenant = match tenant_of(services.users.as_ref(), &identity).await {
        Ok(tenant) => tenant,
        Err(resp) => return resp,
    };
    let Some(owner) = tenant else {
        return ok_json(Page::<Asset>::new(Vec::new(), 0, Pagination::new(params.page, params.size)));
    };

    match services.assets.search(&params.into_query(&owner)).await {
        Ok(page) => ok_json(page),
        Err(e) => errors::repo_error_to_response(e),
    }
}

/// One asset visible to the caller, or `null`.
pub async fn get_asset(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AssetId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let tenant = match tenant_of(services.users.as_ref(), &identity).await {
        Ok(tenant) => tenant,
        Err(resp) => return resp,
    };

    match services.assets.get(id).await {
        Ok(Some(asset))
            if asset.is_requested_by(identity.email())
                || tenant.as_deref().is_some_and(|owner| asset.is_owned_by(owner)) =>
        {
            ok_json(asset)
        }
        Ok(_) => ok_json(Value::Null),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn update_asset(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<AssetDetails>,
) -> axum::response::Response {
    let id: AssetId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(e) = body.validate() {
        return errors::domain_error_to_response(e);
    }

    match services.assets.update_details(id, principal.email(), &body).await {
        Ok(result) => ok_json(result),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn delete_asset(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AssetId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.assets.delete(id, principal.email()).await {
        Ok(result) => {
            info!(asset_id = %id, deleted = result.deleted_count, "asset deleted");
            ok_json(result)
        }
        Err(e) => errors::repo_error_to_response(e),
    }
}

/// Request an asset (or create it from the payload) on behalf of the caller.
///
/// The payload requester must be the caller. An existing asset keeps its
/// owner and, unless the caller owns it, its inventory fields; callers inside
/// a company may only request that company's assets. Creating a new asset
/// needs a company, and the asset is owned by it.
pub async fn request_asset(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
    Json(body): Json<AssetRequest>,
) -> axum::response::Response {
    let id: AssetId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_self(&identity, &body.requester_email) {
        return resp;
    }

    let tenant = match tenant_of(services.users.as_ref(), &identity).await {
        Ok(tenant) => tenant,
        Err(resp) => return resp,
    };
    let existing = match services.assets.get(id).await {
        Ok(existing) => existing,
        Err(e) => return errors::repo_error_to_response(e),
    };

    let request = match (existing, tenant) {
        (Some(asset), Some(tenant)) if !asset.is_owned_by(&tenant) => {
            warn!(asset_id = %id, email = %identity.email(), "cross-tenant asset request denied");
            return errors::forbidden();
        }
        (Some(asset), _) if asset.is_owned_by(identity.email()) => AssetRequest { item_added_by: None, ..body },
        (Some(_), _) => AssetRequest { item_added_by: None, ..body.without_inventory_fields() },
        (None, Some(tenant)) => AssetRequest { item_added_by: Some(tenant), ..body },
        (None, None) => {
            warn!(asset_id = %id, email = %identity.email(), "asset creation from user outside any company");
            return errors::forbidden();
        }
    };

    match services.lifecycle.request(id, &request).await {
        Ok(result) => ok_json(result),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}
