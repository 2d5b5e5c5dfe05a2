//! Routes for placing orders and managing their lifecycle.
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::models::apporder::{AppOrder, AppOrderWithCustomer, OrderStatus},
    middleware::auth::session_middleware,
    services::{
        orders::{self, NewOrder, PlacedOrder},
        payments::UpiPaymentInfo,
        sessions::{AdministratorSession, GenericAuthenticatedSession},
    },
    state::AppState,
    utils::httperror::HttpError,
};

/// Create a router for routes under the order service.
pub fn create_router(state: &AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route("/", post(create_order))
        .route("/my-orders", get(my_orders))
        .route("/{order_id}/upi", get(upi_info))
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<GenericAuthenticatedSession>,
        ));
    let administrator = Router::new()
        .route("/", get(list_orders))
        .route("/{order_id}", get(retrieve_order))
        .route("/{order_id}/status", put(update_status))
        .route("/{order_id}/verify-payment", put(verify_payment))
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<AdministratorSession>,
        ));
    authenticated.merge(administrator)
}

async fn create_order(
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
    Json(body): Json<NewOrder>,
) -> Result<(StatusCode, Json<PlacedOrder>), HttpError> {
    let placed = orders::create(session.user_id(), body, &state.db, &state.mailer).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

async fn my_orders(
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
) -> Result<Json<Vec<AppOrder>>, HttpError> {
    Ok(Json(orders::my_orders(session.user_id(), &state.db).await?))
}

async fn upi_info(
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<UpiPaymentInfo>, HttpError> {
    Ok(Json(
        orders::upi_info(order_id, session.user_id(), session.is_admin(), &state.db).await?,
    ))
}

async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<Vec<AppOrderWithCustomer>>, HttpError> {
    Ok(Json(orders::list_all(&state.db).await?))
}

async fn retrieve_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<AppOrderWithCustomer>, HttpError> {
    orders::get(order_id, &state.db)
        .await?
        .map(Json)
        .ok_or_else(|| HttpError::message(StatusCode::NOT_FOUND, "Order not found"))
}

#[derive(Deserialize)]
struct UpdateStatusRequest {
    status: OrderStatus,
}

async fn update_status(
    State(state): State<AppState>,
    Extension(session): Extension<AdministratorSession>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<AppOrder>, HttpError> {
    tracing::info!(admin_id = %session.user_id(), %order_id, status = ?body.status, "Admin status update");
    Ok(Json(
        orders::update_status(order_id, body.status, &state.db).await?,
    ))
}

async fn verify_payment(
    State(state): State<AppState>,
    Extension(session): Extension<AdministratorSession>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<AppOrder>, HttpError> {
    tracing::info!(admin_id = %session.user_id(), %order_id, "Admin payment verification");
    Ok(Json(
        orders::verify_payment(order_id, &state.db, &state.mailer).await?,
    ))
}

impl From<orders::errors::OrderCreateError> for HttpError {
    fn from(error: orders::errors::OrderCreateError) -> Self {
        match error {
            orders::errors::OrderCreateError::DatabaseError(err) => err.into(),
            orders::errors::OrderCreateError::UserNonExistent(user_id) => {
                tracing::warn!(%user_id, "Order attempted by a user who does not exist");
                Self::from(StatusCode::UNAUTHORIZED)
            }
            orders::errors::OrderCreateError::TyreNonExistent(tyre_id) => {
                Self::message(StatusCode::NOT_FOUND, format!("Tyre {tyre_id} not found"))
            }
            orders::errors::OrderCreateError::InsufficientStock(tyre_id) => {
                tracing::info!(%tyre_id, "Order rejected for insufficient stock");
                Self::message(
                    StatusCode::CONFLICT,
                    format!("Insufficient stock for tyre {tyre_id}"),
                )
            }
            orders::errors::OrderCreateError::UpiUnavailable => {
                tracing::error!("UPI order attempted but UPI_ID is not configured");
                Self::message(StatusCode::SERVICE_UNAVAILABLE, "UPI payments are not available")
            }
            err @ (orders::errors::OrderCreateError::EmptyOrder
            | orders::errors::OrderCreateError::InvalidQuantity
            | orders::errors::OrderCreateError::IncompleteAddress
            | orders::errors::OrderCreateError::CostTooLarge) => {
                Self::message(StatusCode::BAD_REQUEST, err.to_string())
            }
        }
    }
}

impl From<orders::errors::UpiInfoError> for HttpError {
    fn from(error: orders::errors::UpiInfoError) -> Self {
        match error {
            orders::errors::UpiInfoError::DatabaseError(err) => err.into(),
            orders::errors::UpiInfoError::QrCode(err) => {
                tracing::error!(error = %err, "Failed to render UPI QR code");
                Self::from(StatusCode::INTERNAL_SERVER_ERROR)
            }
            orders::errors::UpiInfoError::NonExistent(_) => {
                Self::message(StatusCode::NOT_FOUND, "Order not found")
            }
            orders::errors::UpiInfoError::UpiUnavailable => {
                Self::message(StatusCode::SERVICE_UNAVAILABLE, "UPI payments are not available")
            }
            err @ (orders::errors::UpiInfoError::NotUpi
            | orders::errors::UpiInfoError::AlreadyPaid) => {
                Self::message(StatusCode::BAD_REQUEST, err.to_string())
            }
        }
    }
}

impl From<orders::errors::OrderStatusError> for HttpError {
    fn from(error: orders::errors::OrderStatusError) -> Self {
        match error {
            orders::errors::OrderStatusError::DatabaseError(err) => err.into(),
            orders::errors::OrderStatusError::NonExistent(order_id) => {
                Self::message(StatusCode::NOT_FOUND, format!("Order {order_id} not found"))
            }
            err @ orders::errors::OrderStatusError::Final(_) => {
                Self::message(StatusCode::CONFLICT, err.to_string())
            }
        }
    }
}

impl From<orders::errors::VerifyPaymentError> for HttpError {
    fn from(error: orders::errors::VerifyPaymentError) -> Self {
        match error {
            orders::errors::VerifyPaymentError::DatabaseError(err) => err.into(),
            orders::errors::VerifyPaymentError::NonExistent(order_id) => {
                Self::message(StatusCode::NOT_FOUND, format!("Order {order_id} not found"))
            }
            err @ (orders::errors::VerifyPaymentError::NotUpi
            | orders::errors::VerifyPaymentError::AlreadyPaid) => {
                Self::message(StatusCode::BAD_REQUEST, err.to_string())
            }
            err @ orders::errors::VerifyPaymentError::Final(_) => {
                Self::message(StatusCode::CONFLICT, err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_errors_map_to_statuses() {
        let tyre_id = Uuid::new_v4();
        assert_eq!(
            HttpError::from(orders::errors::OrderCreateError::InsufficientStock(tyre_id)).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            HttpError::from(orders::errors::OrderCreateError::TyreNonExistent(tyre_id)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            HttpError::from(orders::errors::OrderCreateError::EmptyOrder).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HttpError::from(orders::errors::OrderStatusError::Final(OrderStatus::Delivered))
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            HttpError::from(orders::errors::VerifyPaymentError::AlreadyPaid).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HttpError::from(orders::errors::VerifyPaymentError::NotUpi).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HttpError::from(orders::errors::VerifyPaymentError::Final(OrderStatus::Cancelled))
                .status(),
            StatusCode::CONFLICT
        );
    }
}
