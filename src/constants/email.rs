//! Transactional email configuration.
use std::{env::var, sync::LazyLock};

use super::secrets::optional_secret;

/// Which provider delivers mail: `smtp`, `resend` or `log`.
pub static EMAIL_PROVIDER: LazyLock<String> = LazyLock::new(|| {
    var("EMAIL_PROVIDER")
        .map(|provider| provider.trim().to_lowercase())
        .unwrap_or_else(|_| String::from("log"))
});

/// The From header for outgoing mail.
pub static EMAIL_FROM: LazyLock<String> = LazyLock::new(|| {
    var("EMAIL_FROM").unwrap_or_else(|_| String::from("TyreFusion <orders@tyrefusion.in>"))
});

pub static SMTP_HOST: LazyLock<String> =
    LazyLock::new(|| var("SMTP_HOST").unwrap_or_else(|_| String::from("smtp.gmail.com")));

pub static SMTP_PORT: LazyLock<u16> = LazyLock::new(|| {
    var("SMTP_PORT")
        .map(|port| port.parse().expect("SMTP_PORT is not a valid port number"))
        .unwrap_or(587)
});

pub static SMTP_USERNAME: LazyLock<String> = LazyLock::new(|| {
    var("SMTP_USERNAME").expect("SMTP_USERNAME not provided in environment variables")
});

pub static SMTP_PASSWORD: LazyLock<String> = LazyLock::new(|| {
    optional_secret("SMTP_PASSWORD").expect(
        "Neither SMTP_PASSWORD nor SMTP_PASSWORD_DOCKER_SECRET provided in environment variables",
    )
});

pub static RESEND_API_KEY: LazyLock<String> = LazyLock::new(|| {
    optional_secret("RESEND_API_KEY").expect(
        "Neither RESEND_API_KEY nor RESEND_API_KEY_DOCKER_SECRET provided in environment variables",
    )
});

/// Endpoint for the Resend HTTP API.
pub const RESEND_API_URL: &str = "https://api.resend.com/emails";
