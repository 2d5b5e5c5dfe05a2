//! UPI payee configuration.
use std::{env::var, sync::LazyLock};

/// The merchant's UPI virtual payment address. UPI checkout is refused when unset.
pub static UPI_ID: LazyLock<Option<String>> =
    LazyLock::new(|| var("UPI_ID").ok().filter(|vpa| !vpa.trim().is_empty()));

/// The payee name shown by UPI apps.
pub static UPI_PAYEE_NAME: LazyLock<String> =
    LazyLock::new(|| var("UPI_PAYEE_NAME").unwrap_or_else(|_| String::from("TyreFusion")));
