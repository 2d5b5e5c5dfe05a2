//! API routes within the application. Each module exposes a sub-router which
//! is nested under the API prefix by `create_router`.
pub mod admin;
pub mod ai_search;
pub mod auth;
pub mod cars;
pub mod cart;
pub mod orders;
pub mod tyres;
pub mod wheels;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::{constants::api::API_URI_PREFIX, state::AppState};

/// Liveness check. Does not touch dependencies.
async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Build every API route, nested under `API_URI_PREFIX`.
pub fn create_router(state: &AppState) -> Router<AppState> {
    let api = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::create_router(state))
        .nest("/tyres", tyres::create_router())
        .nest("/cart", cart::create_router())
        .nest("/makes", cars::create_router())
        .nest("/orders", orders::create_router(state))
        .nest("/admin", admin::create_router(state))
        .nest("/wheels", wheels::create_router())
        .nest("/wheelsize", wheels::create_passthrough_router())
        .nest("/ai-search", ai_search::create_router());
    let prefix = API_URI_PREFIX.trim_end_matches('/');
    if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    }
}
