//! Redis storage for one-time passwords. Only a hash of each code is kept.
use redis::{aio::MultiplexedConnection, Script};

#[derive(Clone)]
pub struct Connection(MultiplexedConnection);

/// What is stored for a pending one-time password.
pub(super) struct OtpRecord {
    pub code_hash: String,
    pub purpose: String,
}

fn otp_key(channel: &str, identifier: &str) -> String {
    format!("otp:{channel}:{identifier}")
}

impl Connection {
    pub const fn new(conn: MultiplexedConnection) -> Self {
        Self(conn)
    }

    /// Replace any pending code for this identifier and start its expiry clock.
    pub(super) async fn put(
        &mut self,
        channel: &str,
        identifier: &str,
        record: OtpRecord,
        seconds: u32,
    ) -> Result<(), errors::OtpStorageError> {
        let key = otp_key(channel, identifier);
        let _: () = redis::pipe()
            .atomic()
            .del(&key)
            .ignore()
            .hset_multiple(
                &key,
                &[
                    ("code", record.code_hash.as_str()),
                    ("purpose", record.purpose.as_str()),
                    ("attempts", "0"),
                ],
            )
            .ignore()
            .expire(&key, i64::from(seconds))
            .ignore()
            .query_async(&mut self.0)
            .await?;
        Ok(())
    }

    /// Check a code hash against the pending code in one atomic step. A
    /// correct code or an exhausted one is deleted; a wrong one counts an
    /// attempt. Nothing is written when no code is pending.
    pub(super) async fn attempt(
        &mut self,
        channel: &str,
        identifier: &str,
        code_hash: &str,
        max_attempts: i64,
    ) -> Result<Attempt, errors::OtpStorageError> {
        let reply: (i64, String) = Script::new(ATTEMPT_SCRIPT)
            .key(otp_key(channel, identifier))
            .arg(code_hash)
            .arg(max_attempts)
            .invoke_async(&mut self.0)
            .await?;
        Ok(Attempt::from_reply(reply))
    }
}

/// The result of checking a submitted code.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Attempt {
    /// No code is pending.
    Missing,
    /// The code was already out of attempts and has been burned.
    Exhausted,
    /// The code matched and was consumed. Carries the stored purpose.
    Accepted(String),
    /// The code did not match. Carries the attempt count after this guess.
    Rejected(i64),
}

impl Attempt {
    fn from_reply((kind, value): (i64, String)) -> Self {
        match kind {
            1 => Self::Exhausted,
            2 => Self::Accepted(value),
            3 => value.parse().map_or(Self::Missing, Self::Rejected),
            _ => Self::Missing,
        }
    }
}

// KEYS[1] = otp key, ARGV[1] = submitted code hash, ARGV[2] = attempt limit.
// Replies {kind, value}: 0 missing, 1 exhausted, 2 accepted with purpose,
// 3 rejected with the new attempt count.
const ATTEMPT_SCRIPT: &str = r"
local fields = redis.call('HMGET', KEYS[1], 'code', 'purpose', 'attempts')
if not fields[1] then
    return {0, ''}
end
local limit = tonumber(ARGV[2])
if (tonumber(fields[3]) or 0) >= limit then
    redis.call('DEL', KEYS[1])
    return {1, ''}
end
if fields[1] == ARGV[1] then
    redis.call('DEL', KEYS[1])
    return {2, fields[2] or ''}
end
local attempts = redis.call('HINCRBY', KEYS[1], 'attempts', 1)
if attempts >= limit then
    redis.call('DEL', KEYS[1])
end
return {3, tostring(attempts)}
";

pub mod errors {
    use redis::RedisError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error(transparent)]
    pub struct OtpStorageError(#[from] RedisError);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_replies_map_to_attempts() {
        assert_eq!(Attempt::from_reply((0, String::new())), Attempt::Missing);
        assert_eq!(Attempt::from_reply((1, String::new())), Attempt::Exhausted);
        assert_eq!(
            Attempt::from_reply((2, String::from("LOGIN"))),
            Attempt::Accepted(String::from("LOGIN"))
        );
        assert_eq!(Attempt::from_reply((3, String::from("4"))), Attempt::Rejected(4));
        assert_eq!(Attempt::from_reply((3, String::from("x"))), Attempt::Missing);
    }

    #[test]
    fn keys_separate_channels() {
        assert_ne!(otp_key("email", "a@b.in"), otp_key("phone", "a@b.in"));
    }
}
