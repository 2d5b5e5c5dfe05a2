//! Shared errors used in multiple services.
use crate::{
    db::errors::DatabaseError,
    services::{otp::store::errors::OtpStorageError, sessions::errors::SessionStorageError},
};
use thiserror::Error;

/// Errors returned by underlying storage layers.
#[derive(Error, Debug)]
pub enum StorageError {
    /// An error returned by the database.
    #[error(transparent)]
    DatabaseError(#[from] DatabaseError),
    /// An error returned by the session store.
    #[error(transparent)]
    SessionStorageError(#[from] SessionStorageError),
    /// An error returned by the one-time password store.
    #[error(transparent)]
    OtpStorageError(#[from] OtpStorageError),
}
