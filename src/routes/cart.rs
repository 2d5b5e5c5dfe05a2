//! Server-side cart reconciliation.
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::{
    db::models::tyre::Tyre,
    services::cart::{self, CartItem, ReconciledCart},
    state::AppState,
    utils::httperror::HttpError,
};

pub fn create_router() -> Router<AppState> {
    Router::new().route("/validate", post(validate))
}

#[derive(Deserialize)]
struct ValidateCartRequest {
    #[serde(default)]
    items: Vec<CartItem>,
}

async fn validate(
    State(state): State<AppState>,
    Json(body): Json<ValidateCartRequest>,
) -> Result<Json<ReconciledCart<Tyre>>, HttpError> {
    Ok(Json(cart::validate(&body.items, &state.db).await?))
}
