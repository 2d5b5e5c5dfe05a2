//! Logic for session handling. Creating, resolving and revoking bearer tokens.
use crate::constants::sessions::SESSION_TIMEOUT;
pub mod store;
use core::{fmt::Write as _, future::Future};
use store::{Connection, SessionInfo};
use uuid::Uuid;

/// Generates a new 24-byte token using a CSPRNG, hex encoded.
fn generate_token() -> String {
    let mut token_buf: [u8; 24] = [0; 24];
    getrandom::fill(&mut token_buf).expect("Error getting OS random. Critical, aborting.");
    token_buf
        .into_iter()
        .fold(String::with_capacity(48), |mut acc: String, x: u8| {
            let _ = write!(acc, "{x:02x}");
            acc
        })
}

#[derive(Clone, Debug)]
/// A session, associating a session token with a given user.
pub struct BaseSession {
    /// The session token used to identify this session.
    token: String,
    /// The information stored in this session.
    session_info: SessionInfo,
}

pub trait SessionTrait: Send + Sync + Clone + Sized + 'static {
    /// Get an instance of this session type given the corresponding session token.
    fn get(
        token: &str,
        session_store_conn: &mut Connection,
    ) -> impl Future<Output = Result<Option<Self>, errors::SessionStorageError>> + Send;
    /// Get the session token which identifies this session.
    fn token(&self) -> String;
    /// Delete this session, immediately invalidating it.
    fn delete(
        self,
        session_store_conn: &mut Connection,
    ) -> impl Future<Output = Result<(), errors::SessionStorageError>> + Send;
}

/// A session belonging to a regular customer.
#[derive(Clone, Debug)]
pub struct CustomerSession {
    /// The inner session used to interact with the session store.
    session: BaseSession,
}

/// A session which has been authorized to have administrative access.
#[derive(Clone, Debug)]
pub struct AdministratorSession {
    /// The inner session used to interact with the session store.
    session: BaseSession,
}

/// Any authenticated session, customer or administrator.
#[derive(Clone, Debug)]
pub enum GenericAuthenticatedSession {
    /// A customer session.
    Customer(CustomerSession),
    /// An administrator session.
    Administrator(AdministratorSession),
}

impl GenericAuthenticatedSession {
    /// Issue a fresh session for a user who has just proven their identity.
    pub async fn create(
        user_id: Uuid,
        admin: bool,
        session_store_conn: &mut Connection,
    ) -> Result<Self, errors::SessionStorageError> {
        let session =
            BaseSession::create(SessionInfo { user_id, admin }, session_store_conn).await?;
        Ok(Self::from_base(session))
    }

    fn from_base(session: BaseSession) -> Self {
        if session.session_info.admin {
            Self::Administrator(AdministratorSession { session })
        } else {
            Self::Customer(CustomerSession { session })
        }
    }

    fn base(&self) -> &BaseSession {
        match *self {
            Self::Customer(CustomerSession { ref session })
            | Self::Administrator(AdministratorSession { ref session }) => session,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.base().session_info.user_id
    }

    pub const fn is_admin(&self) -> bool {
        matches!(*self, Self::Administrator(_))
    }
}

impl SessionTrait for GenericAuthenticatedSession {
    async fn get(
        token: &str,
        session_store_conn: &mut Connection,
    ) -> Result<Option<Self>, errors::SessionStorageError> {
        Ok(BaseSession::get(token, session_store_conn)
            .await?
            .map(Self::from_base))
    }
    fn token(&self) -> String {
        self.base().token.clone()
    }
    async fn delete(self, session_store_conn: &mut Connection) -> Result<(), errors::SessionStorageError> {
        session_store_conn.delete(&self.base().token).await
    }
}

impl SessionTrait for AdministratorSession {
    async fn get(
        token: &str,
        session_store_conn: &mut Connection,
    ) -> Result<Option<Self>, errors::SessionStorageError> {
        Ok(BaseSession::get(token, session_store_conn)
            .await?
            .and_then(|session| session.session_info.admin.then_some(Self { session })))
    }
    fn token(&self) -> String {
        self.session.token.clone()
    }
    async fn delete(self, session_store_conn: &mut Connection) -> Result<(), errors::SessionStorageError> {
        session_store_conn.delete(&self.session.token).await
    }
}

impl AdministratorSession {
    /// Get the user ID of the admin identified by this session.
    pub const fn user_id(&self) -> Uuid {
        self.session.session_info.user_id
    }
}

impl BaseSession {
    /// Create a new session, retrying on the (vanishingly rare) token collision.
    async fn create(
        session_info: SessionInfo,
        session_store_conn: &mut Connection,
    ) -> Result<Self, errors::SessionStorageError> {
        let token = loop {
            let candidate = generate_token();
            match session_store_conn
                .create(&candidate, session_info, SESSION_TIMEOUT)
                .await
            {
                Ok(()) => break candidate,
                Err(store::errors::SessionCreationError::StorageError(error)) => {
                    return Err(error)
                }
                Err(store::errors::SessionCreationError::Duplicate) => {}
            }
        };
        Ok(Self {
            token,
            session_info,
        })
    }

    /// Get a session given its token.
    async fn get(
        token: &str,
        session_store_conn: &mut Connection,
    ) -> Result<Option<Self>, errors::SessionStorageError> {
        Ok(session_store_conn
            .get_info(token)
            .await?
            .map(|session_info| Self {
                token: token.to_owned(),
                session_info,
            }))
    }
}

/// Errors returned by function within this module.
pub mod errors {
    pub use super::store::errors::SessionStorageError;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_48_hex_chars_and_unique() {
        let first = generate_token();
        let second = generate_token();
        assert_eq!(first.len(), 48);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn admin_flag_selects_session_variant() {
        let user_id = Uuid::new_v4();
        let admin = GenericAuthenticatedSession::from_base(BaseSession {
            token: String::from("t"),
            session_info: SessionInfo {
                user_id,
                admin: true,
            },
        });
        assert!(admin.is_admin());
        assert_eq!(admin.user_id(), user_id);
        let customer = GenericAuthenticatedSession::from_base(BaseSession {
            token: String::from("t"),
            session_info: SessionInfo {
                user_id,
                admin: false,
            },
        });
        assert!(!customer.is_admin());
    }
}
