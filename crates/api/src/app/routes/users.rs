//! User directory endpoints: signup, company membership, role probes,
//! subscription state.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{get, patch, post},
};
use serde_json::{Value, json};
use tracing::{info, warn};

use assetdesk_auth::{Role, authorize};
use assetdesk_core::UserId;
use assetdesk_directory::{CompanyAssignment, NewUser, SubscriptionUpdate, User};

use crate::app::routes::common::{ok_json, parse_id};
use crate::app::{errors, services::AppServices};
use crate::authz::require_self;
use crate::context::{IdentityContext, PrincipalContext};

pub fn public() -> Router {
    Router::new().route("/users", post(signup))
}

pub fn authenticated() -> Router {
    Router::new()
        .route("/users/company/:company_name", get(list_company))
        .route("/users/hr/:email", get(is_hr))
        .route("/users/employee/:email", get(is_employee))
        .route("/usersCheck/:email", get(check_hr))
        .route("/usersCheckEmployee/:email", get(check_employee))
        .route("/users/payment/:email", patch(update_subscription))
}

pub fn hr() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/unaffiliated_users", get(list_unaffiliated))
        .route("/users/:id", patch(assign_company))
        .route("/usersRemove/:id", patch(remove_from_company))
}

/// Idempotent per email: a repeat signup reports `insertedId: null`.
pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewUser>,
) -> axum::response::Response {
    let user = match User::register(UserId::new(), body) {
        Ok(user) => user,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let email = user.email.clone();

    match services.users.insert_if_absent(user).await {
        Ok(result) => {
            info!(email = %email, created = result.inserted_id.is_some(), "signup");
            ok_json(result)
        }
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.users.list().await {
        Ok(users) => ok_json(users),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn list_unaffiliated(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.users.list_unaffiliated().await {
        Ok(users) => ok_json(users),
        Err(e) => errors::repo_error_to_response(e),
    }
}

/// Roster of the caller's own company; any other company is 403.
pub async fn list_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(company_name): Path<String>,
) -> axum::response::Response {
    let caller = match services.users.find_by_email(identity.email()).await {
        Ok(caller) => caller,
        Err(e) => return errors::repo_error_to_response(e),
    };
    if caller.and_then(|u| u.company_name).as_deref() != Some(company_name.as_str()) {
        warn!(email = %identity.email(), company = %company_name, "foreign company roster denied");
        return errors::forbidden();
    }

    match services.users.list_by_company(&company_name).await {
        Ok(users) => ok_json(users),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn assign_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<CompanyAssignment>,
) -> axum::response::Response {
    let id: UserId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(e) = body.validate() {
        return errors::domain_error_to_response(e);
    }

    match services.users.find_by_id(id).await {
        Ok(Some(user)) if !can_manage(&user, principal.email()) => {
            warn!(user_id = %id, by = %principal.email(), "assignment of another company's user denied");
            return errors::forbidden();
        }
        Ok(_) => {}
        Err(e) => return errors::repo_error_to_response(e),
    }

    match services.users.assign_company(id, &body, principal.email()).await {
        Ok(result) => {
            info!(user_id = %id, company = %body.company_name, by = %principal.email(), "user added to company");
            ok_json(result)
        }
        Err(e) => errors::repo_error_to_response(e),
    }
}

/// Only the HR user who added an employee may remove them.
pub async fn remove_from_company(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.users.find_by_id(id).await {
        Ok(Some(user)) if user.added_by.as_deref() != Some(principal.email()) => {
            warn!(user_id = %id, by = %principal.email(), "removal of another company's user denied");
            return errors::forbidden();
        }
        Ok(_) => {}
        Err(e) => return errors::repo_error_to_response(e),
    }

    match services.users.remove_from_company(id).await {
        Ok(result) => ok_json(result),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn is_hr(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
) -> axum::response::Response {
    match has_role(&services, &identity, &email, Role::Hr).await {
        Ok((ok, _)) => ok_json(json!({ "hr": ok })),
        Err(resp) => resp,
    }
}

pub async fn is_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
) -> axum::response::Response {
    match has_role(&services, &identity, &email, Role::Employee).await {
        Ok((ok, _)) => ok_json(json!({ "employee": ok })),
        Err(resp) => resp,
    }
}

/// The full user record if it is an HR account, else `false`.
pub async fn check_hr(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
) -> axum::response::Response {
    match has_role(&services, &identity, &email, Role::Hr).await {
        Ok((true, Some(user))) => ok_json(user),
        Ok(_) => ok_json(Value::Bool(false)),
        Err(resp) => resp,
    }
}

pub async fn check_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
) -> axum::response::Response {
    match has_role(&services, &identity, &email, Role::Employee).await {
        Ok((true, Some(user))) => ok_json(user),
        Ok(_) => ok_json(Value::Bool(false)),
        Err(resp) => resp,
    }
}

pub async fn update_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<IdentityContext>,
    Path(email): Path<String>,
    Json(body): Json<SubscriptionUpdate>,
) -> axum::response::Response {
    if let Err(resp) = require_self(&identity, &email) {
        return resp;
    }
    if let Err(e) = body.validate() {
        return errors::domain_error_to_response(e);
    }

    match services.users.update_subscription(&email, &body).await {
        Ok(result) => {
            info!(email = %email, category = body.category, payment = body.payment.as_str(), "subscription updated");
            ok_json(result)
        }
        Err(e) => errors::repo_error_to_response(e),
    }
}

/// An HR account may add a user who is unaffiliated or already its own, never
/// another HR account.
fn can_manage(user: &User, hr_email: &str) -> bool {
    !user.is_hr() && user.added_by.as_deref().is_none_or(|added_by| added_by == hr_email)
}

/// Role probe behind the self-ownership check.
async fn has_role(
    services: &AppServices,
    identity: &IdentityContext,
    email: &str,
    role: Role,
) -> Result<(bool, Option<User>), axum::response::Response> {
    require_self(identity, email)?;

    let user = services
        .users
        .find_by_email(email)
        .await
        .map_err(errors::repo_error_to_response)?;
    let principal = user.as_ref().map(User::principal);
    let ok = authorize(principal.as_ref(), role).is_ok();
    Ok((ok, user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Option<Role>, added_by: Option<&str>) -> User {
        let mut user = User::register(
            UserId::new(),
            NewUser {
                email: "a@x.com".into(),
                name: None,
                photo: None,
                role,
                company_name: None,
                company_logo: None,
                category: None,
                payment: None,
            },
        )
        .unwrap();
        user.added_by = added_by.map(str::to_string);
        user
    }

    #[test]
    fn hr_manages_only_free_or_own_users() {
        assert!(can_manage(&user(None, None), "hr1@acme.io"));
        assert!(can_manage(&user(Some(Role::Employee), Some("hr1@acme.io")), "hr1@acme.io"));
        assert!(!can_manage(&user(Some(Role::Employee), Some("hr2@globex.io")), "hr1@acme.io"));
        assert!(!can_manage(&user(Some(Role::Hr), None), "hr1@acme.io"));
    }
}
