use axum::response::IntoResponse;
use axum::{Router, routing};

pub fn router() -> Router {
    Router::new().route("/health", routing::get(health))
}

async fn health() -> impl IntoResponse {
    "OK"
}
