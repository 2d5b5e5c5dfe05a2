//! LLM-assisted tyre size search.
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{
    clients::openrouter::errors::OpenRouterError,
    services::ai_search::{self, AiFitment},
    state::AppState,
    utils::httperror::HttpError,
};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(search))
        .route("/fitment", post(fitment))
}

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
}

#[derive(Serialize)]
struct SearchResponse {
    sizes: Vec<String>,
}

async fn search(
    State(state): State<AppState>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, HttpError> {
    Ok(Json(SearchResponse {
        sizes: ai_search::search(&state.openrouter, &body.query).await?,
    }))
}

#[derive(Deserialize)]
struct FitmentRequest {
    #[serde(default)]
    make: String,
    #[serde(default)]
    model: String,
    year: Option<i32>,
}

async fn fitment(
    State(state): State<AppState>,
    Json(body): Json<FitmentRequest>,
) -> Result<Json<AiFitment>, HttpError> {
    let year = body
        .year
        .ok_or_else(|| HttpError::message(StatusCode::BAD_REQUEST, "Missing make/model/year"))?;
    Ok(Json(
        ai_search::fitment(
            &state.openrouter,
            &state.wheel_size,
            &body.make,
            &body.model,
            year,
            &state.db,
        )
        .await?,
    ))
}

impl From<OpenRouterError> for HttpError {
    fn from(err: OpenRouterError) -> Self {
        match err {
            OpenRouterError::NotConfigured => {
                Self::message(StatusCode::SERVICE_UNAVAILABLE, "AI search is not configured")
            }
            err @ (OpenRouterError::EmptyResponse | OpenRouterError::Http(_)) => {
                tracing::error!(error = %err, "OpenRouter request failed");
                Self::message(StatusCode::BAD_GATEWAY, "AI service failed")
            }
        }
    }
}

impl From<ai_search::errors::AiSearchError> for HttpError {
    fn from(err: ai_search::errors::AiSearchError) -> Self {
        match err {
            ai_search::errors::AiSearchError::Upstream(err) => err.into(),
            ai_search::errors::AiSearchError::EmptyQuery => {
                Self::message(StatusCode::BAD_REQUEST, "Query is required")
            }
            ai_search::errors::AiSearchError::MissingVehicle => Self::message(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Please include the car make, model and year",
            ),
            ai_search::errors::AiSearchError::InvalidOutput => {
                Self::message(StatusCode::BAD_GATEWAY, "Invalid AI output")
            }
        }
    }
}

impl From<ai_search::errors::AiFitmentError> for HttpError {
    fn from(err: ai_search::errors::AiFitmentError) -> Self {
        match err {
            ai_search::errors::AiFitmentError::DatabaseError(err) => err.into(),
            ai_search::errors::AiFitmentError::Upstream(err) => err.into(),
            ai_search::errors::AiFitmentError::MissingVehicle => {
                Self::message(StatusCode::BAD_REQUEST, "Missing make/model/year")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_errors_map_to_statuses() {
        assert_eq!(
            HttpError::from(ai_search::errors::AiSearchError::MissingVehicle).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            HttpError::from(ai_search::errors::AiSearchError::InvalidOutput).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            HttpError::from(OpenRouterError::NotConfigured).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            HttpError::from(ai_search::errors::AiSearchError::EmptyQuery).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
