//! Constants related to the general configuration of the entire API and its deployment.

use std::{env::var, sync::LazyLock};

/// A prefix to prepend to any API paths to make them externally accessible.
pub static API_URI_PREFIX: LazyLock<String> =
    LazyLock::new(|| var("API_URI_PREFIX").unwrap_or_else(|_| String::from("/api")));

/// The socket address the HTTP server listens on.
pub static BIND_ADDRESS: LazyLock<String> =
    LazyLock::new(|| var("BIND_ADDRESS").unwrap_or_else(|_| String::from("0.0.0.0:5000")));

/// The maximum number of rows returned by catalog listings.
pub const CATALOG_LIMIT: i64 = 200;
