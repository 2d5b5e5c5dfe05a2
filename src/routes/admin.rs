//! Back-office routes. Every route here requires an administrator session.
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    constants::s3::S3_EXTERNAL_URI,
    db::models::{car::Car, fitment::Fitment, tyre::Tyre},
    middleware::auth::session_middleware,
    services::{
        cars::{self, CarDetails},
        fitments::{self, ExpansionReport, FitmentDetails},
        media::errors::StoreImageError,
        sessions::AdministratorSession,
        stats::{self, DashboardStats},
        tyres::{self, NewTyre, TyreUpdate},
    },
    state::AppState,
    utils::httperror::HttpError,
};

/// Upper bound on an uploaded tyre image.
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Create a router for the /admin route.
pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/tyres", get(list_tyres))
        .route("/tyres", post(create_tyre))
        .route("/tyres/{tyre_id}", put(update_tyre))
        .route("/tyres/{tyre_id}", delete(delete_tyre))
        .route("/tyres/{tyre_id}/stock", patch(set_stock))
        .route(
            "/tyres/{tyre_id}/images",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route("/cars", get(list_cars))
        .route("/cars", post(create_car))
        .route("/cars/{car_id}", put(update_car))
        .route("/cars/{car_id}", delete(delete_car))
        .route("/fitments", get(list_fitments))
        .route("/fitments", post(create_fitment))
        .route("/fitments/{fitment_id}", delete(delete_fitment))
        .route("/fitments/expand-years", post(expand_years))
        .route("/stats", get(dashboard_stats))
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<AdministratorSession>,
        ))
}

async fn list_tyres(State(state): State<AppState>) -> Result<Json<Vec<Tyre>>, HttpError> {
    Ok(Json(tyres::list_all(&state.db).await?))
}

async fn create_tyre(
    State(state): State<AppState>,
    Extension(session): Extension<AdministratorSession>,
    Json(body): Json<NewTyre>,
) -> Result<(StatusCode, Json<Tyre>), HttpError> {
    let tyre = tyres::create(body, &state.db).await?;
    tracing::info!(admin_id = %session.user_id(), tyre_id = %tyre.id(), "Admin created tyre");
    Ok((StatusCode::CREATED, Json(tyre)))
}

async fn update_tyre(
    State(state): State<AppState>,
    Path(tyre_id): Path<Uuid>,
    Json(body): Json<TyreUpdate>,
) -> Result<Json<Tyre>, HttpError> {
    Ok(Json(tyres::update(tyre_id, body, &state.db).await?))
}

async fn delete_tyre(
    State(state): State<AppState>,
    Path(tyre_id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    tyres::delete(tyre_id, &state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct SetStockRequest {
    stock: Option<i32>,
}

async fn set_stock(
    State(state): State<AppState>,
    Path(tyre_id): Path<Uuid>,
    Json(body): Json<SetStockRequest>,
) -> Result<Json<Tyre>, HttpError> {
    let stock = body
        .stock
        .ok_or_else(|| HttpError::message(StatusCode::BAD_REQUEST, "Stock is required"))?;
    Ok(Json(tyres::set_stock(tyre_id, stock, &state.db).await?))
}

/// Accepts a multipart form with the image in its first file field.
async fn upload_image(
    State(state): State<AppState>,
    Path(tyre_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Tyre>, HttpError> {
    let store = state.media_store.as_ref().map(Arc::clone).ok_or_else(|| {
        HttpError::message(StatusCode::SERVICE_UNAVAILABLE, "Image storage is not configured")
    })?;
    let field = multipart
        .next_field()
        .await
        .map_err(|err| HttpError::message(StatusCode::BAD_REQUEST, err.body_text()))?
        .ok_or_else(|| HttpError::message(StatusCode::BAD_REQUEST, "No image uploaded"))?;
    let image = field
        .bytes()
        .await
        .map_err(|err| HttpError::message(StatusCode::BAD_REQUEST, err.body_text()))?;
    Ok(Json(
        tyres::add_image(tyre_id, image.to_vec(), store, &S3_EXTERNAL_URI, &state.db).await?,
    ))
}

async fn list_cars(State(state): State<AppState>) -> Result<Json<Vec<Car>>, HttpError> {
    Ok(Json(cars::list_all(&state.db).await?))
}

async fn create_car(
    State(state): State<AppState>,
    Json(body): Json<CarDetails>,
) -> Result<(StatusCode, Json<Car>), HttpError> {
    Ok((StatusCode::CREATED, Json(cars::create(body, &state.db).await?)))
}

async fn update_car(
    State(state): State<AppState>,
    Path(car_id): Path<Uuid>,
    Json(body): Json<CarDetails>,
) -> Result<Json<Car>, HttpError> {
    Ok(Json(cars::update(car_id, body, &state.db).await?))
}

async fn delete_car(
    State(state): State<AppState>,
    Path(car_id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    cars::delete(car_id, &state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_fitments(State(state): State<AppState>) -> Result<Json<Vec<Fitment>>, HttpError> {
    Ok(Json(fitments::list_all(&state.db).await?))
}

async fn create_fitment(
    State(state): State<AppState>,
    Json(body): Json<FitmentDetails>,
) -> Result<(StatusCode, Json<Fitment>), HttpError> {
    Ok((StatusCode::CREATED, Json(fitments::create(body, &state.db).await?)))
}

async fn delete_fitment(
    State(state): State<AppState>,
    Path(fitment_id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    fitments::delete(fitment_id, &state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn expand_years(
    State(state): State<AppState>,
) -> Result<Json<ExpansionReport>, HttpError> {
    Ok(Json(fitments::expand_years(&state.db).await?))
}

async fn dashboard_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, HttpError> {
    Ok(Json(stats::dashboard(&state.db).await?))
}

impl From<tyres::errors::TyreValidationError> for HttpError {
    fn from(err: tyres::errors::TyreValidationError) -> Self {
        Self::message(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<tyres::errors::TyreCreateError> for HttpError {
    fn from(err: tyres::errors::TyreCreateError) -> Self {
        match err {
            tyres::errors::TyreCreateError::DatabaseError(err) => err.into(),
            tyres::errors::TyreCreateError::Invalid(err) => err.into(),
            tyres::errors::TyreCreateError::DuplicateSku => {
                Self::message(StatusCode::CONFLICT, "A tyre with this SKU already exists")
            }
        }
    }
}

impl From<tyres::errors::TyreUpdateError> for HttpError {
    fn from(err: tyres::errors::TyreUpdateError) -> Self {
        match err {
            tyres::errors::TyreUpdateError::DatabaseError(err) => err.into(),
            tyres::errors::TyreUpdateError::Invalid(err) => err.into(),
            tyres::errors::TyreUpdateError::NonExistent => {
                Self::message(StatusCode::NOT_FOUND, "Tyre not found")
            }
        }
    }
}

impl From<tyres::errors::TyreDeleteError> for HttpError {
    fn from(err: tyres::errors::TyreDeleteError) -> Self {
        match err {
            tyres::errors::TyreDeleteError::DatabaseError(err) => err.into(),
            tyres::errors::TyreDeleteError::NonExistent => {
                Self::message(StatusCode::NOT_FOUND, "Tyre not found")
            }
        }
    }
}

impl From<tyres::errors::TyreImageError> for HttpError {
    fn from(err: tyres::errors::TyreImageError) -> Self {
        match err {
            tyres::errors::TyreImageError::DatabaseError(err) => err.into(),
            tyres::errors::TyreImageError::NonExistent => {
                Self::message(StatusCode::NOT_FOUND, "Tyre not found")
            }
            tyres::errors::TyreImageError::Media(StoreImageError::StorageError(err)) => {
                tracing::error!(error = %err, "Failed to write image to object store");
                Self::message(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store image")
            }
            tyres::errors::TyreImageError::Media(
                err @ (StoreImageError::InvalidFileType | StoreImageError::Empty),
            ) => Self::message(StatusCode::BAD_REQUEST, err.to_string()),
        }
    }
}

impl From<cars::errors::CarValidationError> for HttpError {
    fn from(err: cars::errors::CarValidationError) -> Self {
        Self::message(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<cars::errors::CarCreateError> for HttpError {
    fn from(err: cars::errors::CarCreateError) -> Self {
        match err {
            cars::errors::CarCreateError::DatabaseError(err) => err.into(),
            cars::errors::CarCreateError::Invalid(err) => err.into(),
        }
    }
}

impl From<cars::errors::CarUpdateError> for HttpError {
    fn from(err: cars::errors::CarUpdateError) -> Self {
        match err {
            cars::errors::CarUpdateError::DatabaseError(err) => err.into(),
            cars::errors::CarUpdateError::Invalid(err) => err.into(),
            cars::errors::CarUpdateError::NonExistent => {
                Self::message(StatusCode::NOT_FOUND, "Car not found")
            }
        }
    }
}

impl From<cars::errors::CarDeleteError> for HttpError {
    fn from(err: cars::errors::CarDeleteError) -> Self {
        match err {
            cars::errors::CarDeleteError::DatabaseError(err) => err.into(),
            cars::errors::CarDeleteError::NonExistent => {
                Self::message(StatusCode::NOT_FOUND, "Car not found")
            }
        }
    }
}

impl From<fitments::errors::FitmentCreateError> for HttpError {
    fn from(err: fitments::errors::FitmentCreateError) -> Self {
        match err {
            fitments::errors::FitmentCreateError::DatabaseError(err) => err.into(),
            err @ (fitments::errors::FitmentCreateError::MissingFields
            | fitments::errors::FitmentCreateError::NegativePrice) => {
                Self::message(StatusCode::BAD_REQUEST, err.to_string())
            }
        }
    }
}

impl From<fitments::errors::FitmentDeleteError> for HttpError {
    fn from(err: fitments::errors::FitmentDeleteError) -> Self {
        match err {
            fitments::errors::FitmentDeleteError::DatabaseError(err) => err.into(),
            fitments::errors::FitmentDeleteError::NonExistent => {
                Self::message(StatusCode::NOT_FOUND, "Fitment not found")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_are_bad_requests() {
        assert_eq!(
            HttpError::from(tyres::errors::TyreCreateError::Invalid(
                tyres::errors::TyreValidationError::TooManyFeatures
            ))
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HttpError::from(tyres::errors::TyreCreateError::DuplicateSku).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            HttpError::from(tyres::errors::TyreImageError::Media(
                StoreImageError::InvalidFileType
            ))
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HttpError::from(cars::errors::CarUpdateError::NonExistent).status(),
            StatusCode::NOT_FOUND
        );
    }
}
