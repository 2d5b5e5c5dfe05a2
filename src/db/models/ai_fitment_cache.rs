//! Cached AI fitment answers, keyed by lowercase `make|model|year`.
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{query, query_scalar, types::Json};

use crate::db::{errors::DatabaseError, ConnectionPool};

pub struct AiFitmentCache;

impl AiFitmentCache {
    /// Load a cached result. Rows that no longer deserialize are treated as misses.
    pub async fn select<T: DeserializeOwned + Send + Unpin + 'static>(
        key: &str,
        db_conn: &ConnectionPool,
    ) -> Result<Option<T>, DatabaseError> {
        let raw = query_scalar::<_, Json<serde_json::Value>>(
            "SELECT result FROM ai_fitment_cache WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(db_conn)
        .await?;
        Ok(raw.and_then(|Json(value)| serde_json::from_value(value).ok()))
    }
    pub async fn upsert<T: Serialize + Sync>(
        key: &str,
        result: &T,
        db_conn: &ConnectionPool,
    ) -> Result<(), DatabaseError> {
        query(
            "INSERT INTO ai_fitment_cache (key, result) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET result = EXCLUDED.result, updated_at = now()",
        )
        .bind(key)
        .bind(Json(result))
        .execute(db_conn)
        .await?;
        Ok(())
    }
}
