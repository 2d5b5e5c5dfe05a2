//! Public catalog routes: search, lookup, size facets and stock checks.
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::models::tyre::Tyre,
    services::tyres::{self, StockLevel},
    state::AppState,
    utils::httperror::HttpError,
};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(search))
        .route("/by-id/{tyre_id}", get(retrieve))
        .route("/distinct/widths", get(widths))
        .route("/distinct/aspects", get(aspects))
        .route("/distinct/rims", get(rims))
        .route("/stock-check", post(stock_check))
}

#[derive(Deserialize)]
struct SearchParameters {
    size: Option<String>,
    brand: Option<String>,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParameters>,
) -> Result<Json<Vec<Tyre>>, HttpError> {
    Ok(Json(
        tyres::search(params.size.as_deref(), params.brand.as_deref(), &state.db).await?,
    ))
}

async fn retrieve(
    State(state): State<AppState>,
    Path(tyre_id): Path<Uuid>,
) -> Result<Json<Tyre>, HttpError> {
    tyres::retrieve(tyre_id, &state.db)
        .await?
        .map(Json)
        .ok_or_else(|| HttpError::message(StatusCode::NOT_FOUND, "Tyre not found"))
}

async fn widths(State(state): State<AppState>) -> Result<Json<Vec<u16>>, HttpError> {
    Ok(Json(tyres::widths(&state.db).await?))
}

/// Facet parameters arrive as free text; anything unparseable counts as absent.
#[derive(Deserialize)]
struct FacetParameters {
    width: Option<String>,
    aspect: Option<String>,
}

fn facet_value(raw: Option<&str>) -> Option<u16> {
    raw.and_then(|value| value.trim().parse().ok())
}

async fn aspects(
    State(state): State<AppState>,
    Query(params): Query<FacetParameters>,
) -> Result<Json<Vec<u16>>, HttpError> {
    let Some(width) = facet_value(params.width.as_deref()) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(tyres::aspects(width, &state.db).await?))
}

async fn rims(
    State(state): State<AppState>,
    Query(params): Query<FacetParameters>,
) -> Result<Json<Vec<u16>>, HttpError> {
    let (Some(width), Some(aspect)) = (
        facet_value(params.width.as_deref()),
        facet_value(params.aspect.as_deref()),
    ) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(tyres::rims(width, aspect, &state.db).await?))
}

#[derive(Deserialize)]
struct StockCheckRequest {
    ids: Vec<Uuid>,
}

async fn stock_check(
    State(state): State<AppState>,
    Json(body): Json<StockCheckRequest>,
) -> Result<Json<Vec<StockLevel>>, HttpError> {
    Ok(Json(tyres::stock_levels(&body.ids, &state.db).await?))
}

#[cfg(test)]
mod tests {
    use super::facet_value;

    #[test]
    fn facet_values_ignore_junk() {
        assert_eq!(facet_value(Some(" 205 ")), Some(205));
        assert_eq!(facet_value(Some("abc")), None);
        assert_eq!(facet_value(Some("")), None);
        assert_eq!(facet_value(None), None);
    }
}
