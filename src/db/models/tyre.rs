//! Models mapping to the tyre database table: the sellable catalog.
use serde::Serialize;
use sqlx::{query, query_as, query_scalar};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{errors::DatabaseError, Connection, ConnectionPool};

/// INSERT model for a `Tyre`. Fields are validated by the tyre service before
/// one of these is built.
pub struct TyreInsert {
    pub sku: String,
    pub brand: String,
    pub title: String,
    pub size: String,
    /// Normalized form of `size` used for lookups.
    pub size_key: String,
    pub price: i64,
    pub warranty_months: i32,
    pub images: Vec<String>,
    pub stock: i32,
    pub tyre_type: String,
    pub load_index: Option<String>,
    pub rating: Option<String>,
    pub features: Vec<String>,
}

/// A `Tyre` stored in the database. Prices are in paise.
#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct Tyre {
    id: Uuid,
    pub sku: String,
    pub brand: String,
    pub title: String,
    size: String,
    #[serde(skip)]
    size_key: String,
    price: i64,
    pub warranty_months: i32,
    pub images: Vec<String>,
    stock: i32,
    #[serde(rename = "type")]
    pub tyre_type: String,
    pub load_index: Option<String>,
    pub rating: Option<String>,
    pub features: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

impl TyreInsert {
    /// Store this INSERT model in the database and return a complete `Tyre` model.
    pub async fn store(self, db_conn: &ConnectionPool) -> Result<Tyre, DatabaseError> {
        Ok(query_as::<_, Tyre>(
            "INSERT INTO tyre (sku, brand, title, size, size_key, price, warranty_months, images,
            stock, tyre_type, load_index, rating, features)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING *",
        )
        .bind(self.sku)
        .bind(self.brand)
        .bind(self.title)
        .bind(self.size)
        .bind(self.size_key)
        .bind(self.price)
        .bind(self.warranty_months)
        .bind(self.images)
        .bind(self.stock)
        .bind(self.tyre_type)
        .bind(self.load_index)
        .bind(self.rating)
        .bind(self.features)
        .fetch_one(db_conn)
        .await?)
    }
}

impl Tyre {
    pub const fn id(&self) -> Uuid {
        self.id
    }
    pub fn size(&self) -> &str {
        &self.size
    }
    pub fn size_key(&self) -> &str {
        &self.size_key
    }
    /// Set the display size together with its lookup key.
    pub fn set_size(&mut self, size: String, size_key: String) {
        self.size = size;
        self.size_key = size_key;
    }
    pub const fn price(&self) -> i64 {
        self.price
    }
    pub fn set_price(&mut self, price: i64) {
        self.price = price;
    }
    pub const fn stock(&self) -> i32 {
        self.stock
    }
    pub fn set_stock(&mut self, stock: i32) {
        self.stock = stock;
    }

    /// Select a `Tyre` from the database by ID.
    pub async fn select_one(
        id: Uuid,
        db_conn: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM tyre WHERE id = $1")
            .bind(id)
            .fetch_optional(db_conn)
            .await?)
    }
    /// Select every `Tyre` whose ID is in `ids`.
    pub async fn select_many(
        ids: &[Uuid],
        db_conn: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM tyre WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(db_conn)
            .await?)
    }
    /// Retrieve the whole catalog, newest first.
    pub async fn select_all(db_conn: &ConnectionPool) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM tyre ORDER BY created_at DESC")
            .fetch_all(db_conn)
            .await?)
    }
    /// Search by size-key pattern (a SQL `LIKE` pattern) and/or a brand
    /// pattern (`ILIKE`). Either may be omitted.
    pub async fn search(
        size_key_pattern: Option<&str>,
        brand_pattern: Option<&str>,
        limit: i64,
        db_conn: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM tyre
            WHERE ($1::text IS NULL OR size_key LIKE $1)
            AND ($2::text IS NULL OR brand ILIKE $2)
            ORDER BY brand, price LIMIT $3",
        )
        .bind(size_key_pattern)
        .bind(brand_pattern)
        .bind(limit)
        .fetch_all(db_conn)
        .await?)
    }
    /// Select priced tyres whose size key is one of `size_keys`.
    pub async fn select_priced_by_size_keys(
        size_keys: &[String],
        limit: i64,
        db_conn: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM tyre WHERE size_key = ANY($1) AND price > 0
            ORDER BY price LIMIT $2",
        )
        .bind(size_keys)
        .bind(limit)
        .fetch_all(db_conn)
        .await?)
    }
    /// Every distinct display size in the catalog.
    pub async fn select_distinct_sizes(
        db_conn: &ConnectionPool,
    ) -> Result<Vec<String>, DatabaseError> {
        Ok(query_scalar::<_, String>("SELECT DISTINCT size FROM tyre")
            .fetch_all(db_conn)
            .await?)
    }
    /// Current stock for each existing ID in `ids`.
    pub async fn select_stock(
        ids: &[Uuid],
        db_conn: &ConnectionPool,
    ) -> Result<Vec<(Uuid, i32)>, DatabaseError> {
        Ok(
            query_as::<_, (Uuid, i32)>("SELECT id, stock FROM tyre WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(db_conn)
                .await?,
        )
    }
    pub async fn count(db_conn: &ConnectionPool) -> Result<i64, DatabaseError> {
        Ok(query_scalar::<_, i64>("SELECT count(*) FROM tyre")
            .fetch_one(db_conn)
            .await?)
    }
    /// Take `quantity` units out of stock if at least that many remain.
    /// Returns the updated row, or `None` when the tyre is missing or short.
    pub async fn reserve_stock(
        id: Uuid,
        quantity: i32,
        conn: &mut Connection,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "UPDATE tyre SET stock = stock - $2, updated_at = now()
            WHERE id = $1 AND stock >= $2 RETURNING *",
        )
        .bind(id)
        .bind(quantity)
        .fetch_optional(conn)
        .await?)
    }
    /// Put `quantity` units back into stock. Missing tyres are skipped.
    pub async fn restore_stock(
        id: Uuid,
        quantity: i32,
        conn: &mut Connection,
    ) -> Result<(), DatabaseError> {
        query("UPDATE tyre SET stock = stock + $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(quantity)
            .execute(conn)
            .await?;
        Ok(())
    }
    /// Whether a tyre with this ID exists, checked on a transaction connection.
    pub async fn exists(id: Uuid, conn: &mut Connection) -> Result<bool, DatabaseError> {
        Ok(
            query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM tyre WHERE id = $1)")
                .bind(id)
                .fetch_one(conn)
                .await?,
        )
    }
    /// Update the database record to match the model's current state.
    pub async fn update(&mut self, db_conn: &ConnectionPool) -> Result<(), DatabaseError> {
        self.updated_at = query_scalar::<_, OffsetDateTime>(
            "UPDATE tyre SET sku = $1, brand = $2, title = $3, size = $4, size_key = $5,
            price = $6, warranty_months = $7, images = $8, stock = $9, tyre_type = $10,
            load_index = $11, rating = $12, features = $13, updated_at = now()
            WHERE id = $14 RETURNING updated_at",
        )
        .bind(&self.sku)
        .bind(&self.brand)
        .bind(&self.title)
        .bind(&self.size)
        .bind(&self.size_key)
        .bind(self.price)
        .bind(self.warranty_months)
        .bind(&self.images)
        .bind(self.stock)
        .bind(&self.tyre_type)
        .bind(&self.load_index)
        .bind(&self.rating)
        .bind(&self.features)
        .bind(self.id)
        .fetch_one(db_conn)
        .await?;
        Ok(())
    }
    /// Delete the corresponding record from the database. Also consumes the
    /// model itself for consistency.
    pub async fn delete(self, db_conn: &ConnectionPool) -> Result<(), DatabaseError> {
        query("DELETE FROM tyre WHERE id = $1")
            .bind(self.id)
            .execute(db_conn)
            .await?;
        Ok(())
    }
}
