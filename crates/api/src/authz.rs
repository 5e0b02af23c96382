//! Request-level ownership and tenancy guards.

use assetdesk_auth::ensure_self;
use assetdesk_infra::UserRepository;

use crate::app::errors;
use crate::context::IdentityContext;

/// Self-ownership: 403 unless `email` is the caller's own token email.
pub fn require_self(identity: &IdentityContext, email: &str) -> Result<(), axum::response::Response> {
    ensure_self(identity.email(), email).map_err(|e| {
        tracing::warn!(caller = %identity.email(), requested = %email, reason = %e, "ownership check failed");
        errors::forbidden()
    })
}

/// Owning HR email of the caller's company, if the caller belongs to one.
pub async fn tenant_of(
    users: &dyn UserRepository,
    identity: &IdentityContext,
) -> Result<Option<String>, axum::response::Response> {
    let user = users
        .find_by_email(identity.email())
        .await
        .map_err(errors::repo_error_to_response)?;
    Ok(user.and_then(|u| u.tenant_owner().map(str::to_string)))
}
