use std::str::FromStr;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::app::errors;

/// Parse a path id; 400 `invalid_id` on failure.
pub fn parse_id<T: FromStr>(raw: &str) -> Result<T, axum::response::Response> {
    raw.parse().map_err(|_| errors::invalid_id())
}

pub fn ok_json<T: Serialize>(body: T) -> axum::response::Response {
    (StatusCode::OK, Json(body)).into_response()
}
