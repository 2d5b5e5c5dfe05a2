//! Models mapping to the apporder database table. Line items and the shipping
//! address are JSONB snapshots taken when the order was placed.
use serde::{Deserialize, Serialize};
use sqlx::{query_as, query_scalar, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{errors::DatabaseError, Connection, ConnectionPool};

#[derive(sqlx::Type, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[sqlx(type_name = "order_status")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(sqlx::Type, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[sqlx(type_name = "payment_mode", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMode {
    #[default]
    Cod,
    Upi,
}

#[derive(sqlx::Type, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[sqlx(type_name = "payment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// A line item as it was when the order was placed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OrderItem {
    pub tyre_id: Uuid,
    pub brand: String,
    pub title: String,
    pub size: String,
    /// Unit price in paise.
    pub price: i64,
    pub quantity: i32,
    pub image: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShippingAddress {
    #[serde(alias = "fullName")]
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone: String,
}

/// INSERT model for an `AppOrder`.
pub struct AppOrderInsert {
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total_amount: i64,
    pub shipping_address: ShippingAddress,
    pub payment_mode: PaymentMode,
}

#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct AppOrder {
    id: Uuid,
    user_id: Uuid,
    items: Json<Vec<OrderItem>>,
    total_amount: i64,
    shipping_address: Json<ShippingAddress>,
    payment_mode: PaymentMode,
    payment_status: PaymentStatus,
    status: OrderStatus,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

/// An order joined with the name and email of the customer who placed it.
#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct AppOrderWithCustomer {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: AppOrder,
    pub customer_name: String,
    pub customer_email: Option<String>,
}

/// The columns stats are computed from.
#[derive(sqlx::FromRow, Clone, Copy, Debug)]
pub struct OrderSalesRow {
    pub created_at: OffsetDateTime,
    pub total_amount: i64,
    pub status: OrderStatus,
}

impl AppOrderInsert {
    /// Store this INSERT model on a transaction connection and return the
    /// complete `AppOrder`.
    pub async fn store(self, conn: &mut Connection) -> Result<AppOrder, DatabaseError> {
        let payment_status = PaymentStatus::Pending;
        Ok(query_as::<_, AppOrder>(
            "INSERT INTO apporder (user_id, items, total_amount, shipping_address, payment_mode,
            payment_status) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(self.user_id)
        .bind(Json(self.items))
        .bind(self.total_amount)
        .bind(Json(self.shipping_address))
        .bind(self.payment_mode)
        .bind(payment_status)
        .fetch_one(conn)
        .await?)
    }
}

impl AppOrder {
    pub const fn id(&self) -> Uuid {
        self.id
    }
    pub const fn user_id(&self) -> Uuid {
        self.user_id
    }
    pub fn items(&self) -> &[OrderItem] {
        &self.items.0
    }
    pub const fn total_amount(&self) -> i64 {
        self.total_amount
    }
    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address.0
    }
    pub const fn payment_mode(&self) -> PaymentMode {
        self.payment_mode
    }
    pub const fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }
    pub const fn status(&self) -> OrderStatus {
        self.status
    }
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }
    pub fn set_payment_status(&mut self, payment_status: PaymentStatus) {
        self.payment_status = payment_status;
    }
    pub const fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub async fn select_one(
        id: Uuid,
        db_conn: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM apporder WHERE id = $1")
            .bind(id)
            .fetch_optional(db_conn)
            .await?)
    }
    /// Select and row-lock an order inside a transaction.
    pub async fn select_for_update(
        id: Uuid,
        conn: &mut Connection,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(
            query_as::<_, Self>("SELECT * FROM apporder WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?,
        )
    }
    /// A user's own orders, newest first.
    pub async fn select_by_user(
        user_id: Uuid,
        db_conn: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM apporder WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(db_conn)
        .await?)
    }
    /// Every order with its customer, newest first.
    pub async fn select_all_with_customer(
        db_conn: &ConnectionPool,
    ) -> Result<Vec<AppOrderWithCustomer>, DatabaseError> {
        Ok(query_as::<_, AppOrderWithCustomer>(
            "SELECT apporder.*, appuser.name AS customer_name, appuser.email AS customer_email
            FROM apporder JOIN appuser ON appuser.id = apporder.user_id
            ORDER BY apporder.created_at DESC",
        )
        .fetch_all(db_conn)
        .await?)
    }
    /// One order with its customer.
    pub async fn select_one_with_customer(
        id: Uuid,
        db_conn: &ConnectionPool,
    ) -> Result<Option<AppOrderWithCustomer>, DatabaseError> {
        Ok(query_as::<_, AppOrderWithCustomer>(
            "SELECT apporder.*, appuser.name AS customer_name, appuser.email AS customer_email
            FROM apporder JOIN appuser ON appuser.id = apporder.user_id
            WHERE apporder.id = $1",
        )
        .bind(id)
        .fetch_optional(db_conn)
        .await?)
    }
    pub async fn count(db_conn: &ConnectionPool) -> Result<i64, DatabaseError> {
        Ok(query_scalar::<_, i64>("SELECT count(*) FROM apporder")
            .fetch_one(db_conn)
            .await?)
    }
    pub async fn select_sales_rows(
        db_conn: &ConnectionPool,
    ) -> Result<Vec<OrderSalesRow>, DatabaseError> {
        Ok(query_as::<_, OrderSalesRow>(
            "SELECT created_at, total_amount, status FROM apporder",
        )
        .fetch_all(db_conn)
        .await?)
    }
    /// Write status and payment status back on a transaction connection.
    pub async fn update(&mut self, conn: &mut Connection) -> Result<(), DatabaseError> {
        self.updated_at = query_scalar::<_, OffsetDateTime>(
            "UPDATE apporder SET status = $1, payment_status = $2, updated_at = now()
            WHERE id = $3 RETURNING updated_at",
        )
        .bind(self.status)
        .bind(self.payment_status)
        .bind(self.id)
        .fetch_one(conn)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_mode_wire_names() {
        assert_eq!(serde_json::to_string(&PaymentMode::Upi).expect("serializes"), "\"UPI\"");
        let mode: PaymentMode = serde_json::from_str("\"COD\"").expect("deserializes");
        assert_eq!(mode, PaymentMode::Cod);
        let status: OrderStatus = serde_json::from_str("\"Cancelled\"").expect("deserializes");
        assert_eq!(status, OrderStatus::Cancelled);
    }
}
