//! One-time passwords for email and phone login. Codes are six digits, live
//! for five minutes and burn after five wrong guesses.
pub mod store;

use rand::Rng as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::constants::sessions::{OTP_MAX_ATTEMPTS, OTP_TIMEOUT};

/// Where a code was delivered. Email and phone codes never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpChannel {
    Email,
    Phone,
}

impl OtpChannel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OtpPurpose {
    /// The email belongs to an existing user.
    Login,
    /// The email is new; verifying creates the user.
    Signup,
    /// A phone login, which finds or creates the user.
    Phone,
}

impl OtpPurpose {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::Signup => "SIGNUP",
            Self::Phone => "PHONE",
        }
    }
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "LOGIN" => Some(Self::Login),
            "SIGNUP" => Some(Self::Signup),
            "PHONE" => Some(Self::Phone),
            _ => None,
        }
    }
}

/// Generate a 6-digit code.
pub fn generate_code() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

fn hash_code(code: &str) -> String {
    format!("{:x}", Sha256::digest(code.trim().as_bytes()))
}

/// What a wrong guess leads to, given the attempt count after recording it.
fn failure_outcome(attempts: i64) -> errors::OtpVerificationError {
    if attempts >= OTP_MAX_ATTEMPTS {
        errors::OtpVerificationError::TooManyAttempts
    } else {
        errors::OtpVerificationError::Incorrect {
            remaining: OTP_MAX_ATTEMPTS - attempts,
        }
    }
}

/// Create and store a fresh code, replacing any pending one. Returns the
/// plaintext code for delivery.
pub async fn issue(
    channel: OtpChannel,
    identifier: &str,
    purpose: OtpPurpose,
    otp_store: &mut store::Connection,
) -> Result<String, store::errors::OtpStorageError> {
    let code = generate_code();
    otp_store
        .put(
            channel.as_str(),
            identifier,
            store::OtpRecord {
                code_hash: hash_code(&code),
                purpose: purpose.as_str().to_owned(),
            },
            OTP_TIMEOUT,
        )
        .await?;
    tracing::debug!(channel = channel.as_str(), %identifier, purpose = purpose.as_str(), "Issued one-time password");
    Ok(code)
}

/// Turn a stored attempt into the login outcome.
fn attempt_outcome(attempt: store::Attempt) -> Result<OtpPurpose, errors::OtpVerificationError> {
    match attempt {
        store::Attempt::Missing => Err(errors::OtpVerificationError::Expired),
        store::Attempt::Exhausted => Err(errors::OtpVerificationError::TooManyAttempts),
        store::Attempt::Rejected(attempts) => Err(failure_outcome(attempts)),
        store::Attempt::Accepted(purpose) => {
            OtpPurpose::parse(&purpose).ok_or(errors::OtpVerificationError::Expired)
        }
    }
}

/// Check a submitted code. A correct code is consumed and its purpose
/// returned; concurrent submissions of the same code succeed at most once.
pub async fn verify(
    channel: OtpChannel,
    identifier: &str,
    code: &str,
    otp_store: &mut store::Connection,
) -> Result<OtpPurpose, errors::OtpVerificationError> {
    let attempt = otp_store
        .attempt(channel.as_str(), identifier, &hash_code(code), OTP_MAX_ATTEMPTS)
        .await?;
    attempt_outcome(attempt)
}

pub mod errors {
    use super::store::errors::OtpStorageError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum OtpVerificationError {
        #[error(transparent)]
        StorageError(#[from] OtpStorageError),
        #[error("OTP expired or not found")]
        Expired,
        #[error("Incorrect OTP")]
        Incorrect { remaining: i64 },
        #[error("Too many incorrect attempts")]
        TooManyAttempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            let value: u32 = code.parse().expect("numeric code");
            assert!((100_000..1_000_000).contains(&value));
        }
    }

    #[test]
    fn hash_ignores_surrounding_whitespace() {
        assert_eq!(hash_code(" 123456 "), hash_code("123456"));
        assert_ne!(hash_code("123456"), hash_code("123457"));
        assert_eq!(hash_code("123456").len(), 64);
    }

    #[test]
    fn fifth_failure_burns_the_code() {
        assert!(matches!(
            failure_outcome(1),
            errors::OtpVerificationError::Incorrect { remaining: 4 }
        ));
        assert!(matches!(
            failure_outcome(4),
            errors::OtpVerificationError::Incorrect { remaining: 1 }
        ));
        assert!(matches!(
            failure_outcome(5),
            errors::OtpVerificationError::TooManyAttempts
        ));
    }

    #[test]
    fn exhausted_codes_are_refused() {
        assert!(matches!(
            attempt_outcome(store::Attempt::Exhausted),
            Err(errors::OtpVerificationError::TooManyAttempts)
        ));
        assert!(matches!(
            attempt_outcome(store::Attempt::Rejected(OTP_MAX_ATTEMPTS)),
            Err(errors::OtpVerificationError::TooManyAttempts)
        ));
        assert!(matches!(
            attempt_outcome(store::Attempt::Rejected(2)),
            Err(errors::OtpVerificationError::Incorrect { remaining: 3 })
        ));
        assert!(matches!(
            attempt_outcome(store::Attempt::Missing),
            Err(errors::OtpVerificationError::Expired)
        ));
        assert!(matches!(
            attempt_outcome(store::Attempt::Accepted(String::from("SIGNUP"))),
            Ok(OtpPurpose::Signup)
        ));
    }

    #[test]
    fn purpose_round_trips_through_storage_form() {
        for purpose in [OtpPurpose::Login, OtpPurpose::Signup, OtpPurpose::Phone] {
            assert_eq!(OtpPurpose::parse(purpose.as_str()), Some(purpose));
        }
        assert_eq!(OtpPurpose::parse("other"), None);
    }
}
