//! Vehicle lookups backed by the local car and fitment tables.
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::{db::models::tyre::Tyre, services::cars, state::AppState, utils::httperror::HttpError};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(makes))
        .route("/{make}/models", get(models))
        .route("/{make}/{model}/years", get(years))
        .route("/{make}/{model}/{year}/tyres", get(tyres_for_car))
}

async fn makes(State(state): State<AppState>) -> Result<Json<Vec<String>>, HttpError> {
    Ok(Json(cars::makes(&state.db).await?))
}

async fn models(
    State(state): State<AppState>,
    Path(make): Path<String>,
) -> Result<Json<Vec<String>>, HttpError> {
    Ok(Json(cars::models(&make, &state.db).await?))
}

async fn years(
    State(state): State<AppState>,
    Path((make, model)): Path<(String, String)>,
) -> Result<Json<Vec<i32>>, HttpError> {
    Ok(Json(cars::years(&make, &model, &state.db).await?))
}

async fn tyres_for_car(
    State(state): State<AppState>,
    Path((make, model, year)): Path<(String, String, i32)>,
) -> Result<Json<Vec<Tyre>>, HttpError> {
    Ok(Json(cars::tyres_for_car(&make, &model, year, &state.db).await?))
}
