//! A normalized phone number. Separators are stripped; a leading `+` is kept.
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for PhoneNumber {
    type Error = ();
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let trimmed = s.trim();
        let (plus, rest) = trimmed
            .strip_prefix('+')
            .map_or(("", trimmed), |rest| ("+", rest));
        if rest
            .chars()
            .any(|c| !c.is_ascii_digit() && !matches!(c, ' ' | '-' | '(' | ')'))
        {
            return Err(());
        }
        let digits: String = rest.chars().filter(char::is_ascii_digit).collect();
        if (10..=15).contains(&digits.len()) {
            Ok(Self(format!("{plus}{digits}")))
        } else {
            Err(())
        }
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

impl core::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::PhoneNumber;

    #[test]
    fn strips_separators() {
        let phone = PhoneNumber::try_from("+91 98765-43210").expect("valid phone");
        assert_eq!(phone.as_str(), "+919876543210");
        let local = PhoneNumber::try_from("(987) 654 3210").expect("valid phone");
        assert_eq!(local.as_str(), "9876543210");
    }

    #[test]
    fn rejects_short_or_lettered_numbers() {
        assert!(PhoneNumber::try_from("12345").is_err());
        assert!(PhoneNumber::try_from("98765abc10").is_err());
        assert!(PhoneNumber::try_from("").is_err());
    }
}
