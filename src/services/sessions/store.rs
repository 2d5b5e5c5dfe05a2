//! Provides an abstracted interface to the underlying session store. Accessible only
//! within the session service, since no other part of the code should ever access
//! the session store.
use crate::constants::redis as constants;
use redis::{aio::MultiplexedConnection, AsyncCommands as _};
use uuid::Uuid;

/// Key namespace for authenticated sessions.
const SESSION_KEY_PREFIX: &str = "sessions:authenticated";

#[derive(Clone)]
/// A connection to the session store. Guaranteed to be safe to clone and share
/// between threads.
pub struct Connection(MultiplexedConnection);

/// Information stored under a given session token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    /// The user this session authenticates.
    pub user_id: Uuid,
    /// Whether the user held the admin role when the session was issued.
    pub admin: bool,
}

fn session_key(token: &str) -> String {
    format!("{SESSION_KEY_PREFIX}:{token}")
}

/// Write a new session and its expiry in one transaction. Every write is
/// conditional, so a token collision leaves the existing session untouched.
fn create_pipeline(key: &str, info: SessionInfo, seconds: u32) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .hset_nx(key, "user_id", info.user_id)
        .hset_nx(key, "admin", u8::from(info.admin))
        .ignore()
        .cmd("EXPIRE")
        .arg(key)
        .arg(seconds)
        .arg("NX")
        .ignore();
    pipe
}

impl Connection {
    /// Initiate a new (multiplexed) connection to the session store.
    /// This connection can be cloned and is safe share between threads.
    pub async fn connect() -> Result<Self, errors::SessionStorageError> {
        Ok(Self(
            redis::Client::open(constants::REDIS_URL.as_str())?
                .get_multiplexed_async_connection()
                .await?,
        ))
    }

    /// Hand out the raw multiplexed connection for other Redis-backed stores.
    pub fn multiplexed(&self) -> MultiplexedConnection {
        self.0.clone()
    }

    /// Store a new session. Fails with `Duplicate` if the token is taken.
    pub(super) async fn create(
        &mut self,
        token: &str,
        info: SessionInfo,
        seconds: u32,
    ) -> Result<(), errors::SessionCreationError> {
        let (created,): (bool,) = create_pipeline(&session_key(token), info, seconds)
            .query_async(&mut self.0)
            .await?;
        if !created {
            return Err(errors::SessionCreationError::Duplicate);
        }
        Ok(())
    }

    /// Delete a token and all associated data from the store.
    pub(super) async fn delete(&mut self, token: &str) -> Result<(), errors::SessionStorageError> {
        let _: () = self.0.del(session_key(token)).await?;
        Ok(())
    }

    /// Get stored session info associated with a given token.
    pub(super) async fn get_info(
        &mut self,
        token: &str,
    ) -> Result<Option<SessionInfo>, errors::SessionStorageError> {
        let (user_id, admin): (Option<Uuid>, Option<u8>) = redis::cmd("HMGET")
            .arg(session_key(token))
            .arg("user_id")
            .arg("admin")
            .query_async(&mut self.0)
            .await?;
        Ok(user_id.map(|user_id| SessionInfo {
            user_id,
            admin: admin.is_some_and(|flag| flag != 0),
        }))
    }
}

/// Errors returned by functions in this module.
pub mod errors {
    use redis::RedisError;
    use thiserror::Error;

    /// An error returned by the underlying storage layer.
    #[derive(Error, Debug)]
    #[error(transparent)]
    pub struct SessionStorageError(#[from] RedisError);

    /// Errors which can be thrown when creating a new session in the store.
    #[derive(Error, Debug)]
    pub enum SessionCreationError {
        /// There is already a session with the same token.
        #[error("Attempted to store a session token which already exists.")]
        Duplicate,
        /// There was an error while writing to/reading from the store.
        #[error(transparent)]
        StorageError(#[from] SessionStorageError),
    }

    impl From<RedisError> for SessionCreationError {
        fn from(err: RedisError) -> Self {
            Self::from(SessionStorageError::from(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_is_one_transaction() {
        let info = SessionInfo {
            user_id: Uuid::nil(),
            admin: true,
        };
        let packed = create_pipeline(&session_key("token"), info, 3600).get_packed_pipeline();
        let packed = String::from_utf8_lossy(&packed);
        let position = |needle: &str| packed.find(needle).expect(needle);
        assert!(position("MULTI") < position("HSETNX"));
        assert!(position("HSETNX") < position("EXPIRE"));
        assert!(position("EXPIRE") < position("EXEC"));
        assert!(packed.contains("$2\r\nNX\r\n"));
        assert!(!packed.contains("HSET\r\n"));
    }
}
