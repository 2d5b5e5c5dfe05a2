//! Identity policy: password bounds and the operator-managed admin allowlists.
use std::{env::var, sync::LazyLock};

/// The minimum password length users can set.
pub const PASSWORD_MIN_LENGTH: usize = 8;
/// The maximum password length users can set.
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Split a comma separated list, trimming and lowercasing entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Email addresses promoted to administrator on login.
pub static ADMIN_EMAILS: LazyLock<Vec<String>> =
    LazyLock::new(|| var("ADMIN_EMAILS").map(|raw| parse_list(&raw)).unwrap_or_default());

/// Phone numbers promoted to administrator on login.
pub static ADMIN_PHONES: LazyLock<Vec<String>> =
    LazyLock::new(|| var("ADMIN_PHONES").map(|raw| parse_list(&raw)).unwrap_or_default());

/// Whether phone OTPs are returned in the API response. There is no SMS
/// provider, so this is the only way to read a phone OTP in development.
pub static PHONE_OTP_ECHO: LazyLock<bool> = LazyLock::new(|| {
    var("PHONE_OTP_ECHO").is_ok_and(|value| matches!(value.trim(), "1" | "true" | "TRUE"))
});

#[cfg(test)]
mod tests {
    use super::parse_list;

    #[test]
    fn admin_lists_are_trimmed_and_lowercased() {
        assert_eq!(
            parse_list(" Owner@TyreFusion.in, ,ops@tyrefusion.in "),
            vec!["owner@tyrefusion.in", "ops@tyrefusion.in"]
        );
        assert!(parse_list("").is_empty());
    }
}
