//! Contains database models and interaction code.
pub mod models;
use crate::constants::db as constants;

/// An alias for the underlying DBMS specific pool type.
pub type ConnectionPool = sqlx::PgPool;

/// A single connection checked out of the pool, used inside transactions.
pub type Connection = sqlx::PgConnection;

/// Initiate a pooled connection to the database.
pub async fn connect() -> Result<ConnectionPool, errors::DatabaseError> {
    Ok(sqlx::PgPool::connect(&constants::DB_URL).await?)
}

/// Apply any pending schema migrations from `migrations/`.
pub async fn migrate(db_conn: &ConnectionPool) -> Result<(), errors::MigrationError> {
    sqlx::migrate!("./migrations").run(db_conn).await?;
    Ok(())
}

pub mod errors {
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error(transparent)]
    pub struct DatabaseError(#[from] sqlx::Error);

    impl DatabaseError {
        /// Whether this error is a unique constraint violation.
        pub fn is_unique_violation(&self) -> bool {
            matches!(self.0, sqlx::Error::Database(ref err) if err.is_unique_violation())
        }
    }

    #[derive(Error, Debug)]
    #[error(transparent)]
    pub struct MigrationError(#[from] sqlx::migrate::MigrateError);
}
