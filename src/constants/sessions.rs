//! Constants related to authentication, sessions and one-time passwords.

/// Timeout for authenticated sessions in seconds.
pub const SESSION_TIMEOUT: u32 = 7 * 24 * 60 * 60;
/// Lifetime of a one-time password in seconds.
pub const OTP_TIMEOUT: u32 = 300;
/// Wrong guesses allowed before a one-time password is burned.
pub const OTP_MAX_ATTEMPTS: i64 = 5;
