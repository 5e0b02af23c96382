use axum::http::StatusCode;

pub async fn root() -> &'static str {
    "my assets is running"
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
