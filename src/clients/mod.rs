//! HTTP clients for third-party APIs. Each client shares one pooled
//! `reqwest::Client` and is cheap to clone into the application state.
pub mod firebase;
pub mod openrouter;
pub mod wheelsize;

use crate::constants::integrations::HTTP_TIMEOUT;

/// Build the outbound HTTP client shared by every integration.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("tyrefusion-api/", env!("CARGO_PKG_VERSION")))
        .build()
}
