//! Models mapping to the car database table: locally curated vehicles.
use serde::Serialize;
use sqlx::{query, query_as, query_scalar};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{errors::DatabaseError, ConnectionPool};

/// INSERT model for a `Car`.
pub struct CarInsert {
    pub make: String,
    pub model: String,
    pub years: Vec<i32>,
    pub car_type: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub tyre_size: Option<String>,
}

#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct Car {
    id: Uuid,
    pub make: String,
    pub model: String,
    pub years: Vec<i32>,
    pub car_type: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub tyre_size: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl CarInsert {
    /// Store this INSERT model in the database and return a complete `Car` model.
    pub async fn store(self, db_conn: &ConnectionPool) -> Result<Car, DatabaseError> {
        Ok(query_as::<_, Car>(
            "INSERT INTO car (make, model, years, car_type, fuel_type, transmission, tyre_size)
            VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(self.make)
        .bind(self.model)
        .bind(self.years)
        .bind(self.car_type)
        .bind(self.fuel_type)
        .bind(self.transmission)
        .bind(self.tyre_size)
        .fetch_one(db_conn)
        .await?)
    }
}

impl Car {
    pub const fn id(&self) -> Uuid {
        self.id
    }
    pub async fn select_one(
        id: Uuid,
        db_conn: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM car WHERE id = $1")
            .bind(id)
            .fetch_optional(db_conn)
            .await?)
    }
    pub async fn select_all(db_conn: &ConnectionPool) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM car ORDER BY make, model")
            .fetch_all(db_conn)
            .await?)
    }
    /// Select the first car matching make and model, ignoring case.
    pub async fn select_by_make_model(
        make: &str,
        model: &str,
        db_conn: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM car WHERE lower(make) = lower($1) AND lower(model) = lower($2)
            ORDER BY created_at LIMIT 1",
        )
        .bind(make)
        .bind(model)
        .fetch_optional(db_conn)
        .await?)
    }
    pub async fn select_distinct_makes(
        db_conn: &ConnectionPool,
    ) -> Result<Vec<String>, DatabaseError> {
        Ok(
            query_scalar::<_, String>("SELECT DISTINCT make FROM car ORDER BY make")
                .fetch_all(db_conn)
                .await?,
        )
    }
    pub async fn select_distinct_models(
        make: &str,
        db_conn: &ConnectionPool,
    ) -> Result<Vec<String>, DatabaseError> {
        Ok(query_scalar::<_, String>(
            "SELECT DISTINCT model FROM car WHERE lower(make) = lower($1) ORDER BY model",
        )
        .bind(make)
        .fetch_all(db_conn)
        .await?)
    }
    pub async fn count(db_conn: &ConnectionPool) -> Result<i64, DatabaseError> {
        Ok(query_scalar::<_, i64>("SELECT count(*) FROM car")
            .fetch_one(db_conn)
            .await?)
    }
    /// Update the database record to match the model's current state.
    pub async fn update(&self, db_conn: &ConnectionPool) -> Result<(), DatabaseError> {
        query(
            "UPDATE car SET make = $1, model = $2, years = $3, car_type = $4, fuel_type = $5,
            transmission = $6, tyre_size = $7 WHERE id = $8",
        )
        .bind(&self.make)
        .bind(&self.model)
        .bind(&self.years)
        .bind(&self.car_type)
        .bind(&self.fuel_type)
        .bind(&self.transmission)
        .bind(&self.tyre_size)
        .bind(self.id)
        .execute(db_conn)
        .await?;
        Ok(())
    }
    pub async fn delete(self, db_conn: &ConnectionPool) -> Result<(), DatabaseError> {
        query("DELETE FROM car WHERE id = $1")
            .bind(self.id)
            .execute(db_conn)
            .await?;
        Ok(())
    }
}
