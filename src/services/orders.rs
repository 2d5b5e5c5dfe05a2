//! Checkout and the order lifecycle. Prices always come from the catalog and
//! stock is reserved in the same transaction the order is written in.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    constants::payments::{UPI_ID, UPI_PAYEE_NAME},
    db::{
        self,
        errors::DatabaseError,
        models::{
            apporder::{
                AppOrder, AppOrderInsert, AppOrderWithCustomer, OrderItem, OrderStatus,
                PaymentMode, PaymentStatus, ShippingAddress,
            },
            appuser::AppUser,
            tyre::Tyre,
        },
    },
    services::{
        cart::{self, CartItem},
        notifications::{self, Mailer, OutgoingEmail, UpiPayee},
        payments::{self, UpiPaymentInfo},
    },
};

#[derive(Deserialize, Clone, Debug)]
pub struct NewOrder {
    pub items: Vec<CartItem>,
    #[serde(alias = "shippingAddress")]
    pub shipping_address: ShippingAddress,
    #[serde(alias = "paymentMode", default)]
    pub payment_mode: PaymentMode,
}

#[derive(Serialize, Debug)]
pub struct PlacedOrder {
    pub order: AppOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi: Option<UpiPaymentInfo>,
}

fn address_is_complete(address: &ShippingAddress) -> bool {
    [
        &address.full_name,
        &address.address,
        &address.city,
        &address.state,
        &address.pincode,
        &address.phone,
    ]
    .iter()
    .all(|field| !field.trim().is_empty())
}

/// Check the request shape and return its lines with duplicates merged,
/// ordered by tyre id so concurrent orders lock rows in the same order.
fn validate_new_order(order: &NewOrder) -> Result<Vec<CartItem>, errors::OrderCreateError> {
    if order.items.is_empty() {
        return Err(errors::OrderCreateError::EmptyOrder);
    }
    if order.items.iter().any(|item| item.quantity <= 0) {
        return Err(errors::OrderCreateError::InvalidQuantity);
    }
    if !address_is_complete(&order.shipping_address) {
        return Err(errors::OrderCreateError::IncompleteAddress);
    }
    let mut lines = cart::merge_lines(&order.items);
    lines.sort_unstable_by_key(|line| line.tyre_id);
    Ok(lines)
}

fn snapshot(tyre: &Tyre, quantity: i32) -> OrderItem {
    OrderItem {
        tyre_id: tyre.id(),
        brand: tyre.brand.clone(),
        title: tyre.title.clone(),
        size: tyre.size().to_owned(),
        price: tyre.price(),
        quantity,
        image: tyre.images.first().cloned(),
    }
}

/// Sum of unit price times quantity, `None` on overflow.
fn order_total(items: &[OrderItem]) -> Option<i64> {
    items.iter().try_fold(0_i64, |total, item| {
        item.price
            .checked_mul(i64::from(item.quantity))
            .and_then(|line| total.checked_add(line))
    })
}

/// Cancelled and delivered orders are final.
pub fn ensure_not_final(current: OrderStatus) -> Result<(), errors::OrderStatusError> {
    match current {
        OrderStatus::Cancelled | OrderStatus::Delivered => {
            Err(errors::OrderStatusError::Final(current))
        }
        OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Shipped => Ok(()),
    }
}

/// Check a status change and return the lines whose stock goes back on the
/// shelf. Only cancelling restocks, and a cancelled order is final, so stock
/// is restored at most once.
fn plan_transition(
    current: OrderStatus,
    target: OrderStatus,
    items: &[OrderItem],
) -> Result<Vec<(Uuid, i32)>, errors::OrderStatusError> {
    ensure_not_final(current)?;
    if target != OrderStatus::Cancelled {
        return Ok(Vec::new());
    }
    Ok(items.iter().map(|item| (item.tyre_id, item.quantity)).collect())
}

/// Only open, unpaid UPI orders can have their payment verified.
fn ensure_payment_verifiable(
    status: OrderStatus,
    payment_mode: PaymentMode,
    payment_status: PaymentStatus,
) -> Result<(), errors::VerifyPaymentError> {
    if ensure_not_final(status).is_err() {
        return Err(errors::VerifyPaymentError::Final(status));
    }
    if payment_mode != PaymentMode::Upi {
        return Err(errors::VerifyPaymentError::NotUpi);
    }
    if payment_status == PaymentStatus::Paid {
        return Err(errors::VerifyPaymentError::AlreadyPaid);
    }
    Ok(())
}

fn configured_payee() -> Option<UpiPayee<'static>> {
    UPI_ID.as_deref().map(|vpa| UpiPayee {
        vpa,
        name: UPI_PAYEE_NAME.as_str(),
    })
}

fn upi_info_for(order: &AppOrder, payee: UpiPayee<'_>) -> Result<UpiPaymentInfo, errors::UpiInfoError> {
    let (info, _png) = payments::upi_payment_for_order(
        payee.vpa,
        payee.name,
        order.total_amount(),
        &order.id().to_string(),
    )?;
    Ok(info)
}

/// Hand a built email to the background sender, logging build failures.
fn dispatch(
    mailer: &Mailer,
    order_id: Uuid,
    email: Result<Option<OutgoingEmail>, notifications::errors::NotificationError>,
) {
    match email {
        Ok(Some(email)) => notifications::spawn_send(mailer.clone(), email),
        Ok(None) => tracing::debug!(%order_id, "Customer has no email address, skipping"),
        Err(e) => tracing::error!(%order_id, error = %e, "Failed to build order email"),
    }
}

/// Place an order for `user_id`, reserving stock for every line.
pub async fn create(
    user_id: Uuid,
    new_order: NewOrder,
    db_conn: &db::ConnectionPool,
    mailer: &Mailer,
) -> Result<PlacedOrder, errors::OrderCreateError> {
    let lines = validate_new_order(&new_order)?;
    let payee = configured_payee();
    if new_order.payment_mode == PaymentMode::Upi && payee.is_none() {
        return Err(errors::OrderCreateError::UpiUnavailable);
    }
    let user = AppUser::select_one(user_id, db_conn)
        .await?
        .ok_or(errors::OrderCreateError::UserNonExistent(user_id))?;

    let mut tx = db_conn.begin().await.map_err(DatabaseError::from)?;
    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        match Tyre::reserve_stock(line.tyre_id, line.quantity, &mut tx).await? {
            Some(tyre) => items.push(snapshot(&tyre, line.quantity)),
            None if Tyre::exists(line.tyre_id, &mut tx).await? => {
                return Err(errors::OrderCreateError::InsufficientStock(line.tyre_id))
            }
            None => return Err(errors::OrderCreateError::TyreNonExistent(line.tyre_id)),
        }
    }
    let total_amount = order_total(&items).ok_or(errors::OrderCreateError::CostTooLarge)?;
    let order = AppOrderInsert {
        user_id,
        items,
        total_amount,
        shipping_address: new_order.shipping_address,
        payment_mode: new_order.payment_mode,
    }
    .store(&mut tx)
    .await?;
    tx.commit().await.map_err(DatabaseError::from)?;
    tracing::info!(order_id = %order.id(), %user_id, total_amount, "Order placed");

    let upi = match (order.payment_mode(), payee) {
        (PaymentMode::Upi, Some(payee)) => {
            dispatch(mailer, order.id(), notifications::upi_pending(&order, &user));
            upi_info_for(&order, payee)
                .inspect_err(|e| {
                    tracing::error!(order_id = %order.id(), error = %e, "Failed to render UPI QR");
                })
                .ok()
        }
        _ => {
            dispatch(
                mailer,
                order.id(),
                notifications::order_confirmation(&order, &user, None),
            );
            None
        }
    };
    Ok(PlacedOrder { order, upi })
}

/// A user's own orders, newest first.
pub async fn my_orders(
    user_id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<AppOrder>, DatabaseError> {
    AppOrder::select_by_user(user_id, db_conn).await
}

/// Re-issue UPI payment details for an unpaid UPI order. Only the owner or
/// an admin may see them.
pub async fn upi_info(
    order_id: Uuid,
    requester_id: Uuid,
    requester_is_admin: bool,
    db_conn: &db::ConnectionPool,
) -> Result<UpiPaymentInfo, errors::UpiInfoError> {
    let order = AppOrder::select_one(order_id, db_conn)
        .await?
        .filter(|order| requester_is_admin || order.user_id() == requester_id)
        .ok_or(errors::UpiInfoError::NonExistent(order_id))?;
    if order.payment_mode() != PaymentMode::Upi {
        return Err(errors::UpiInfoError::NotUpi);
    }
    if order.payment_status() == PaymentStatus::Paid {
        return Err(errors::UpiInfoError::AlreadyPaid);
    }
    let payee = configured_payee().ok_or(errors::UpiInfoError::UpiUnavailable)?;
    upi_info_for(&order, payee)
}

pub async fn list_all(
    db_conn: &db::ConnectionPool,
) -> Result<Vec<AppOrderWithCustomer>, DatabaseError> {
    AppOrder::select_all_with_customer(db_conn).await
}

pub async fn get(
    order_id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<Option<AppOrderWithCustomer>, DatabaseError> {
    AppOrder::select_one_with_customer(order_id, db_conn).await
}

/// Move an order to `status`. Cancelling puts the reserved stock back.
pub async fn update_status(
    order_id: Uuid,
    status: OrderStatus,
    db_conn: &db::ConnectionPool,
) -> Result<AppOrder, errors::OrderStatusError> {
    let mut tx = db_conn.begin().await.map_err(DatabaseError::from)?;
    let mut order = AppOrder::select_for_update(order_id, &mut tx)
        .await?
        .ok_or(errors::OrderStatusError::NonExistent(order_id))?;
    for (tyre_id, quantity) in plan_transition(order.status(), status, order.items())? {
        Tyre::restore_stock(tyre_id, quantity, &mut tx).await?;
    }
    let previous = order.status();
    order.set_status(status);
    order.update(&mut tx).await?;
    tx.commit().await.map_err(DatabaseError::from)?;
    tracing::info!(%order_id, ?previous, ?status, "Order status updated");
    Ok(order)
}

/// Mark a UPI order as paid and confirmed, then send the confirmation.
pub async fn verify_payment(
    order_id: Uuid,
    db_conn: &db::ConnectionPool,
    mailer: &Mailer,
) -> Result<AppOrder, errors::VerifyPaymentError> {
    let mut tx = db_conn.begin().await.map_err(DatabaseError::from)?;
    let mut order = AppOrder::select_for_update(order_id, &mut tx)
        .await?
        .ok_or(errors::VerifyPaymentError::NonExistent(order_id))?;
    ensure_payment_verifiable(order.status(), order.payment_mode(), order.payment_status())?;
    order.set_payment_status(PaymentStatus::Paid);
    order.set_status(OrderStatus::Confirmed);
    order.update(&mut tx).await?;
    tx.commit().await.map_err(DatabaseError::from)?;
    tracing::info!(%order_id, "UPI payment verified");

    match AppUser::select_one(order.user_id(), db_conn).await? {
        Some(user) => dispatch(
            mailer,
            order_id,
            notifications::order_confirmation(&order, &user, configured_payee()),
        ),
        None => tracing::warn!(%order_id, "Order owner no longer exists, skipping confirmation"),
    }
    Ok(order)
}

pub mod errors {
    use thiserror::Error;
    use uuid::Uuid;

    use crate::{
        db::{errors::DatabaseError, models::apporder::OrderStatus},
        services::payments::errors::QrRenderError,
    };

    #[derive(Error, Debug)]
    pub enum OrderCreateError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("Order has no items")]
        EmptyOrder,
        #[error("Quantities must be at least 1")]
        InvalidQuantity,
        #[error("Shipping address is incomplete")]
        IncompleteAddress,
        #[error("UPI payments are not available")]
        UpiUnavailable,
        #[error("User does not exist")]
        UserNonExistent(Uuid),
        #[error("Tyre does not exist")]
        TyreNonExistent(Uuid),
        #[error("Insufficient stock")]
        InsufficientStock(Uuid),
        #[error("Order total is too large")]
        CostTooLarge,
    }

    #[derive(Error, Debug)]
    pub enum UpiInfoError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error(transparent)]
        QrCode(#[from] QrRenderError),
        #[error("Order does not exist")]
        NonExistent(Uuid),
        #[error("Order is not a UPI order")]
        NotUpi,
        #[error("Order is already paid")]
        AlreadyPaid,
        #[error("UPI payments are not available")]
        UpiUnavailable,
    }

    #[derive(Error, Debug)]
    pub enum OrderStatusError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("Order does not exist")]
        NonExistent(Uuid),
        #[error("Order is {0:?} and can no longer change status")]
        Final(OrderStatus),
    }

    #[derive(Error, Debug)]
    pub enum VerifyPaymentError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("Order does not exist")]
        NonExistent(Uuid),
        #[error("Order is not a UPI order")]
        NotUpi,
        #[error("Payment already verified")]
        AlreadyPaid,
        #[error("Order is {0:?} and can no longer be confirmed")]
        Final(OrderStatus),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: String::from("Asha Rao"),
            address: String::from("12 MG Road"),
            city: String::from("Bengaluru"),
            state: String::from("Karnataka"),
            pincode: String::from("560001"),
            phone: String::from("9876543210"),
        }
    }

    fn line(price: i64, quantity: i32) -> OrderItem {
        OrderItem {
            tyre_id: Uuid::new_v4(),
            brand: String::from("MRF"),
            title: String::from("ZLX"),
            size: String::from("165/80R14"),
            price,
            quantity,
            image: None,
        }
    }

    #[test]
    fn totals_use_snapshot_prices() {
        assert_eq!(order_total(&[line(450_000, 2), line(99_900, 1)]), Some(999_900));
        assert_eq!(order_total(&[]), Some(0));
        assert_eq!(order_total(&[line(i64::MAX, 2)]), None);
    }

    #[test]
    fn request_body_accepts_camel_case() {
        let order: NewOrder = serde_json::from_value(serde_json::json!({
            "items": [{"tyreId": Uuid::nil(), "quantity": 2}],
            "shippingAddress": {
                "fullName": "Asha Rao", "address": "12 MG Road", "city": "Bengaluru",
                "state": "Karnataka", "pincode": "560001", "phone": "9876543210"
            },
            "paymentMode": "UPI"
        }))
        .expect("deserializes");
        assert_eq!(order.payment_mode, PaymentMode::Upi);
        assert_eq!(order.shipping_address, address());
    }

    #[test]
    fn validation_rejects_bad_requests() {
        let tyre_id = Uuid::new_v4();
        let mut order = NewOrder {
            items: Vec::new(),
            shipping_address: address(),
            payment_mode: PaymentMode::Cod,
        };
        assert!(matches!(
            validate_new_order(&order),
            Err(errors::OrderCreateError::EmptyOrder)
        ));
        order.items = vec![CartItem { tyre_id, quantity: 0 }];
        assert!(matches!(
            validate_new_order(&order),
            Err(errors::OrderCreateError::InvalidQuantity)
        ));
        order.items = vec![CartItem { tyre_id, quantity: 1 }];
        order.shipping_address.pincode = String::from("  ");
        assert!(matches!(
            validate_new_order(&order),
            Err(errors::OrderCreateError::IncompleteAddress)
        ));
    }

    #[test]
    fn validation_merges_duplicate_lines() {
        let tyre_id = Uuid::new_v4();
        let order = NewOrder {
            items: vec![
                CartItem { tyre_id, quantity: 1 },
                CartItem { tyre_id, quantity: 3 },
            ],
            shipping_address: address(),
            payment_mode: PaymentMode::Cod,
        };
        assert_eq!(
            validate_new_order(&order).expect("valid"),
            vec![CartItem { tyre_id, quantity: 4 }]
        );
    }

    #[test]
    fn final_statuses_cannot_change() {
        for open in [OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Shipped] {
            assert!(ensure_not_final(open).is_ok());
        }
        assert!(matches!(
            ensure_not_final(OrderStatus::Cancelled),
            Err(errors::OrderStatusError::Final(OrderStatus::Cancelled))
        ));
        assert!(matches!(
            ensure_not_final(OrderStatus::Delivered),
            Err(errors::OrderStatusError::Final(OrderStatus::Delivered))
        ));
    }

    #[test]
    fn cancelling_restocks_every_line_once() {
        let items = [line(450_000, 2), line(99_900, 1)];
        let restock = plan_transition(OrderStatus::Pending, OrderStatus::Cancelled, &items)
            .expect("open order can be cancelled");
        assert_eq!(
            restock,
            vec![(items[0].tyre_id, 2), (items[1].tyre_id, 1)]
        );
        assert!(plan_transition(OrderStatus::Confirmed, OrderStatus::Shipped, &items)
            .expect("open order can ship")
            .is_empty());
        assert!(matches!(
            plan_transition(OrderStatus::Cancelled, OrderStatus::Cancelled, &items),
            Err(errors::OrderStatusError::Final(OrderStatus::Cancelled))
        ));
        assert!(matches!(
            plan_transition(OrderStatus::Delivered, OrderStatus::Cancelled, &items),
            Err(errors::OrderStatusError::Final(OrderStatus::Delivered))
        ));
    }

    #[test]
    fn payment_verification_needs_an_open_unpaid_upi_order() {
        assert!(ensure_payment_verifiable(
            OrderStatus::Pending,
            PaymentMode::Upi,
            PaymentStatus::Pending
        )
        .is_ok());
        assert!(matches!(
            ensure_payment_verifiable(OrderStatus::Pending, PaymentMode::Cod, PaymentStatus::Pending),
            Err(errors::VerifyPaymentError::NotUpi)
        ));
        assert!(matches!(
            ensure_payment_verifiable(OrderStatus::Confirmed, PaymentMode::Upi, PaymentStatus::Paid),
            Err(errors::VerifyPaymentError::AlreadyPaid)
        ));
        assert!(matches!(
            ensure_payment_verifiable(
                OrderStatus::Cancelled,
                PaymentMode::Upi,
                PaymentStatus::Pending
            ),
            Err(errors::VerifyPaymentError::Final(OrderStatus::Cancelled))
        ));
        assert!(matches!(
            ensure_payment_verifiable(
                OrderStatus::Delivered,
                PaymentMode::Upi,
                PaymentStatus::Pending
            ),
            Err(errors::VerifyPaymentError::Final(OrderStatus::Delivered))
        ));
    }

    #[test]
    fn lines_are_ordered_by_tyre_id() {
        let (low, high) = {
            let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
            if a < b { (a, b) } else { (b, a) }
        };
        let order = NewOrder {
            items: vec![
                CartItem { tyre_id: high, quantity: 1 },
                CartItem { tyre_id: low, quantity: 2 },
            ],
            shipping_address: address(),
            payment_mode: PaymentMode::Cod,
        };
        let lines = validate_new_order(&order).expect("valid");
        assert_eq!(
            lines.iter().map(|line| line.tyre_id).collect::<Vec<_>>(),
            vec![low, high]
        );
    }
}
