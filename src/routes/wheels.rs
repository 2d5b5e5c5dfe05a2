//! Vehicle data from the Wheel-Size API: normalized lookups under /wheels
//! and raw pass-through listings under /wheelsize.
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    clients::wheelsize::errors::WheelSizeError,
    services::wheels::{self, FitmentLookup, Variant},
    state::AppState,
    utils::httperror::HttpError,
};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/years", get(years))
        .route("/variants", get(variants))
        .route("/fitments/{make}/{model}/{year}", get(fitments))
}

pub fn create_passthrough_router() -> Router<AppState> {
    Router::new()
        .route("/makes", get(raw_makes))
        .route("/models/{make}", get(raw_models))
        .route("/years/{make}/{model}", get(raw_years))
}

/// Treat blank query values as missing.
fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[derive(Deserialize)]
struct VehicleParameters {
    make: Option<String>,
    model: Option<String>,
    year: Option<i32>,
}

async fn years(
    State(state): State<AppState>,
    Query(params): Query<VehicleParameters>,
) -> Result<Json<Vec<i32>>, HttpError> {
    let (Some(make), Some(model)) = (
        required(params.make.as_deref()),
        required(params.model.as_deref()),
    ) else {
        return Err(HttpError::message(StatusCode::BAD_REQUEST, "Missing make or model"));
    };
    Ok(Json(wheels::years(&state.wheel_size, make, model).await?))
}

async fn variants(
    State(state): State<AppState>,
    Query(params): Query<VehicleParameters>,
) -> Result<Json<Vec<Variant>>, HttpError> {
    let (Some(make), Some(model), Some(year)) = (
        required(params.make.as_deref()),
        required(params.model.as_deref()),
        params.year,
    ) else {
        return Err(HttpError::message(StatusCode::BAD_REQUEST, "Missing parameters"));
    };
    Ok(Json(
        wheels::variants(&state.wheel_size, make, model, year).await?,
    ))
}

#[derive(Deserialize)]
struct FitmentParameters {
    #[serde(rename = "mod")]
    modification: Option<String>,
}

async fn fitments(
    State(state): State<AppState>,
    Path((make, model, year)): Path<(String, String, i32)>,
    Query(params): Query<FitmentParameters>,
) -> Result<Json<FitmentLookup>, HttpError> {
    let Some(modification) = required(params.modification.as_deref()) else {
        return Err(HttpError::message(StatusCode::BAD_REQUEST, "Variant (mod) required"));
    };
    Ok(Json(
        wheels::fitments(&state.wheel_size, &make, &model, year, modification, &state.db).await?,
    ))
}

async fn raw_makes(State(state): State<AppState>) -> Result<Json<serde_json::Value>, HttpError> {
    Ok(Json(state.wheel_size.makes().await?))
}

async fn raw_models(
    State(state): State<AppState>,
    Path(make): Path<String>,
) -> Result<Json<serde_json::Value>, HttpError> {
    Ok(Json(state.wheel_size.models(&make).await?))
}

async fn raw_years(
    State(state): State<AppState>,
    Path((make, model)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, HttpError> {
    Ok(Json(state.wheel_size.generations_raw(&make, &model).await?))
}

impl From<WheelSizeError> for HttpError {
    fn from(err: WheelSizeError) -> Self {
        match err {
            WheelSizeError::NotConfigured => {
                Self::message(StatusCode::SERVICE_UNAVAILABLE, "Vehicle data is not configured")
            }
            err @ (WheelSizeError::InvalidUrl(_) | WheelSizeError::Http(_)) => {
                tracing::error!(error = %err, "Wheel-Size request failed");
                Self::message(StatusCode::BAD_GATEWAY, "Failed to fetch vehicle data")
            }
        }
    }
}

impl From<wheels::errors::WheelsError> for HttpError {
    fn from(err: wheels::errors::WheelsError) -> Self {
        match err {
            wheels::errors::WheelsError::DatabaseError(err) => err.into(),
            wheels::errors::WheelsError::Upstream(err) => err.into(),
            wheels::errors::WheelsError::NotFound => {
                Self::message(StatusCode::NOT_FOUND, "Nothing found for this vehicle")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_parameters_are_missing() {
        assert_eq!(required(Some(" Creta ")), Some("Creta"));
        assert_eq!(required(Some("  ")), None);
        assert_eq!(required(None), None);
    }

    #[test]
    fn unconfigured_upstream_is_unavailable() {
        assert_eq!(
            HttpError::from(WheelSizeError::NotConfigured).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            HttpError::from(wheels::errors::WheelsError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
    }
}
