//! Cached Wheel-Size fitment lookups, keyed by (make, model, year, modification).
use sqlx::{query, query_scalar};

use crate::db::{errors::DatabaseError, ConnectionPool};

pub struct FitmentCache;

impl FitmentCache {
    /// The cached tyre sizes for a vehicle modification, if any.
    pub async fn select_sizes(
        make: &str,
        model: &str,
        year: i32,
        modification: &str,
        db_conn: &ConnectionPool,
    ) -> Result<Option<Vec<String>>, DatabaseError> {
        Ok(query_scalar::<_, Vec<String>>(
            "SELECT sizes FROM fitment_cache
            WHERE make = $1 AND model = $2 AND year = $3 AND modification = $4",
        )
        .bind(make)
        .bind(model)
        .bind(year)
        .bind(modification)
        .fetch_optional(db_conn)
        .await?)
    }
    /// Insert or replace the cached sizes for a vehicle modification.
    pub async fn upsert(
        make: &str,
        model: &str,
        year: i32,
        modification: &str,
        sizes: &[String],
        db_conn: &ConnectionPool,
    ) -> Result<(), DatabaseError> {
        query(
            "INSERT INTO fitment_cache (make, model, year, modification, sizes)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (make, model, year, modification)
            DO UPDATE SET sizes = EXCLUDED.sizes, created_at = now()",
        )
        .bind(make)
        .bind(model)
        .bind(year)
        .bind(modification)
        .bind(sizes)
        .execute(db_conn)
        .await?;
        Ok(())
    }
}
