//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: stores, lifecycle manager, gateway and token issuer
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response bodies used only at the HTTP boundary
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use assetdesk_auth::{Hs256Jwt, JwtValidator};
use assetdesk_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router from configuration (entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let tokens = Arc::new(Hs256Jwt::new(&config.access_token_secret)?);
    let services = AppServices::from_config(config, tokens).await?;
    Ok(router(Arc::new(services)))
}

/// Compose public, authenticated and HR-only routes over `services`.
///
/// Guards run as route layers: the authenticator first, then (for HR routes)
/// the role authorizer. Unmatched paths never reach either.
pub fn router(services: Arc<AppServices>) -> Router {
    let jwt: Arc<dyn JwtValidator> = services.tokens.clone();
    let auth_state = middleware::AuthState { jwt, users: services.users.clone() };

    let authenticated = routes::authenticated().route_layer(axum::middleware::from_fn_with_state(
        auth_state.clone(),
        middleware::authenticate,
    ));

    let hr_only = routes::hr()
        .route_layer(axum::middleware::from_fn_with_state(auth_state.clone(), middleware::require_hr))
        .route_layer(axum::middleware::from_fn_with_state(auth_state, middleware::authenticate));

    routes::public()
        .merge(authenticated)
        .merge(hr_only)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
