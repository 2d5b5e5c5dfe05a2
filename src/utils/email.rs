//! A validated, normalized email address.
use std::sync::LazyLock;

use serde::Serialize;

static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)+$")
        .expect("Email regex invalid")
});

/// An email address which matched the address pattern. Stored trimmed and
/// lowercased so lookups and the admin allowlist compare reliably.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// The text before the `@`.
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for EmailAddress {
    type Error = ();
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let normalized = s.trim().to_lowercase();
        if EMAIL_REGEX.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(())
        }
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = ();
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_from(s.as_str())
    }
}

impl From<EmailAddress> for String {
    fn from(addr: EmailAddress) -> Self {
        addr.0
    }
}

impl core::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::EmailAddress;

    #[test]
    fn normalizes_case_and_whitespace() {
        let addr = EmailAddress::try_from("  Ravi.K@Example.COM ").expect("valid address");
        assert_eq!(addr.as_str(), "ravi.k@example.com");
        assert_eq!(addr.local_part(), "ravi.k");
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(EmailAddress::try_from("no-at-sign").is_err());
        assert!(EmailAddress::try_from("user@localhost").is_err());
        assert!(EmailAddress::try_from("").is_err());
    }
}
