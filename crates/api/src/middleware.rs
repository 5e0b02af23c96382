use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::warn;

use assetdesk_auth::{JwtValidator, Role, authorize};
use assetdesk_infra::UserRepository;

use crate::app::errors;
use crate::context::{IdentityContext, PrincipalContext};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub users: Arc<dyn UserRepository>,
}

/// Token authenticator: 401 unless the bearer token verifies and is unexpired.
pub async fn authenticate(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return errors::unauthorized();
    };

    let claims = match state.jwt.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(reason = %e, path = %req.uri().path(), "rejected bearer token");
            return errors::unauthorized();
        }
    };

    req.extensions_mut().insert(IdentityContext::new(claims));
    next.run(req).await
}

/// Role authorizer: 403 unless the authenticated identity's stored role is `hr`.
///
/// Must run after [`authenticate`].
pub async fn require_hr(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let Some(identity) = req.extensions().get::<IdentityContext>().cloned() else {
        return errors::unauthorized();
    };

    let user = match state.users.find_by_email(identity.email()).await {
        Ok(user) => user,
        Err(e) => return errors::repo_error_to_response(e),
    };

    let principal = user.as_ref().map(|u| u.principal());
    if let Err(e) = authorize(principal.as_ref(), Role::Hr) {
        warn!(email = %identity.email(), reason = %e, "admin route denied");
        return errors::forbidden();
    }

    if let Some(user) = user {
        req.extensions_mut().insert(PrincipalContext::new(user));
    }
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}
