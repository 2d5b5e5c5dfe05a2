//! Third-party API configuration. Every key is optional; features backed by a
//! missing key answer 503.
use std::{env::var, sync::LazyLock, time::Duration};

use super::secrets::optional_secret;

pub static OPENROUTER_API_KEY: LazyLock<Option<String>> =
    LazyLock::new(|| optional_secret("OPENROUTER_API_KEY"));

pub static OPENROUTER_MODEL: LazyLock<String> = LazyLock::new(|| {
    var("OPENROUTER_MODEL").unwrap_or_else(|_| String::from("openai/gpt-4o-mini"))
});

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

pub static WHEELSIZE_API_KEY: LazyLock<Option<String>> =
    LazyLock::new(|| optional_secret("WHEELSIZE_API_KEY"));

pub static WHEELSIZE_API_BASE: LazyLock<String> = LazyLock::new(|| {
    var("WHEELSIZE_API_BASE")
        .map(|base| base.trim_end_matches('/').to_owned())
        .unwrap_or_else(|_| String::from("https://api.wheel-size.com/v2"))
});

pub static FIREBASE_API_KEY: LazyLock<Option<String>> =
    LazyLock::new(|| optional_secret("FIREBASE_API_KEY"));

pub const FIREBASE_LOOKUP_URL: &str =
    "https://identitytoolkit.googleapis.com/v1/accounts:lookup";

/// Upper bound on any outbound HTTP call.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);
