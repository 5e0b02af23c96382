use axum::{
    Router,
    routing::{get, post},
};

pub mod analytics;
pub mod assets;
pub mod auth;
pub mod common;
pub mod payments;
pub mod requests;
pub mod system;
pub mod users;

/// Routes reachable without a token.
pub fn public() -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/jwt", post(auth::issue_token))
        .merge(users::public())
}

/// Routes that need a valid token.
pub fn authenticated() -> Router {
    Router::new()
        .merge(users::authenticated())
        .merge(assets::authenticated())
        .merge(requests::authenticated())
        .merge(analytics::authenticated())
        .merge(payments::authenticated())
}

/// Routes that need a valid token and the `hr` role.
pub fn hr() -> Router {
    Router::new()
        .merge(users::hr())
        .merge(assets::hr())
        .merge(requests::hr())
        .merge(analytics::hr())
}
