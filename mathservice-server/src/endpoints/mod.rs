//! Contains all HTTP endpoint handlers.
//!
//! Use [`routes`] to create a router with all endpoints.

use axum::Router;

pub mod add;
pub mod health;

pub fn routes() -> Router {
    Router::new()
        .merge(health::router())
        .merge(add::router())
}
