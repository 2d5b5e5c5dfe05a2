//! Models mapping to the fitment database table: which tyre size fits which
//! car, optionally pinned to a model year.
use serde::Serialize;
use sqlx::{query, query_as, query_scalar};
use uuid::Uuid;

use crate::db::{errors::DatabaseError, ConnectionPool};

/// INSERT model for a `Fitment`.
#[derive(Clone, Debug)]
pub struct FitmentInsert {
    pub car_make: String,
    pub car_model: String,
    pub year: Option<i32>,
    pub tyre_brand: Option<String>,
    pub tyre_size: String,
    pub price: i64,
}

#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct Fitment {
    id: Uuid,
    pub car_make: String,
    pub car_model: String,
    pub year: Option<i32>,
    pub tyre_brand: Option<String>,
    pub tyre_size: String,
    pub price: i64,
}

impl FitmentInsert {
    pub async fn store(self, db_conn: &ConnectionPool) -> Result<Fitment, DatabaseError> {
        Ok(query_as::<_, Fitment>(
            "INSERT INTO fitment (car_make, car_model, year, tyre_brand, tyre_size, price)
            VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(self.car_make)
        .bind(self.car_model)
        .bind(self.year)
        .bind(self.tyre_brand)
        .bind(self.tyre_size)
        .bind(self.price)
        .fetch_one(db_conn)
        .await?)
    }
}

impl Fitment {
    pub const fn id(&self) -> Uuid {
        self.id
    }
    pub async fn select_one(
        id: Uuid,
        db_conn: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM fitment WHERE id = $1")
            .bind(id)
            .fetch_optional(db_conn)
            .await?)
    }
    pub async fn select_all(db_conn: &ConnectionPool) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM fitment ORDER BY car_make, car_model, year NULLS FIRST",
        )
        .fetch_all(db_conn)
        .await?)
    }
    /// Fitments for a car, matching make and model case-insensitively. With a
    /// year, only rows pinned to that year match.
    pub async fn select_matching(
        make: &str,
        model: &str,
        year: Option<i32>,
        db_conn: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM fitment
            WHERE lower(car_make) = lower($1) AND lower(car_model) = lower($2)
            AND ($3::int IS NULL OR year = $3)",
        )
        .bind(make)
        .bind(model)
        .bind(year)
        .fetch_all(db_conn)
        .await?)
    }
    /// Fitments not yet pinned to a model year.
    pub async fn select_without_year(
        db_conn: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM fitment WHERE year IS NULL")
            .fetch_all(db_conn)
            .await?)
    }
    /// Whether an identical (make, model, year, size) row already exists.
    pub async fn exists(
        make: &str,
        model: &str,
        year: i32,
        tyre_size: &str,
        db_conn: &ConnectionPool,
    ) -> Result<bool, DatabaseError> {
        Ok(query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM fitment
            WHERE lower(car_make) = lower($1) AND lower(car_model) = lower($2)
            AND year = $3 AND tyre_size = $4)",
        )
        .bind(make)
        .bind(model)
        .bind(year)
        .bind(tyre_size)
        .fetch_one(db_conn)
        .await?)
    }
    pub async fn delete(self, db_conn: &ConnectionPool) -> Result<(), DatabaseError> {
        query("DELETE FROM fitment WHERE id = $1")
            .bind(self.id)
            .execute(db_conn)
            .await?;
        Ok(())
    }
}
