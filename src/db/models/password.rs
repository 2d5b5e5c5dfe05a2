//! Models mapping to the password database table. Represents a password-based
//! credential used by a user.
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use sqlx::query_as;
use uuid::Uuid;

use crate::db::{errors::DatabaseError, Connection, ConnectionPool};

/// INSERT model for a `Password`. Used ONLY when adding a new credential.
pub struct PasswordInsert {
    /// The ID of the user who uses this credential.
    user_id: Uuid,
    /// The hashed password string.
    password: String,
}

/// A `Password` which is stored in the database. Can only be constructed
/// by reading it from the database.
#[derive(sqlx::FromRow)]
pub struct Password {
    /// The ID of the user who uses this credential.
    user_id: Uuid,
    /// The hashed password string.
    password: String,
}

/// Instantiate an Argon2 context with the standard parameters.
fn create_argon2<'a>() -> Argon2<'a> {
    Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(12288, 3, 1, None).expect("Invalid Argon2id parameters"),
    )
}

/// Convert a raw password string into a hashed representation.
fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(create_argon2()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check a plaintext password against an encoded argon2 hash. Malformed
/// hashes never verify.
fn verify_hash(encoded: &str, password: &str) -> bool {
    PasswordHash::new(encoded).is_ok_and(|hash| {
        create_argon2()
            .verify_password(password.as_bytes(), &hash)
            .is_ok()
    })
}

impl PasswordInsert {
    /// Construct a new password INSERT model, hashing the plaintext.
    pub fn new(user_id: Uuid, password: &str) -> Result<Self, argon2::password_hash::Error> {
        Ok(Self {
            user_id,
            password: hash_password(password)?,
        })
    }
    /// Store this INSERT model on a transaction connection and return a complete
    /// `Password` model.
    pub async fn store(&self, conn: &mut Connection) -> Result<Password, DatabaseError> {
        Ok(query_as::<_, Password>(
            "INSERT INTO password (user_id, password) VALUES ($1, $2) RETURNING *",
        )
        .bind(self.user_id)
        .bind(&self.password)
        .fetch_one(conn)
        .await?)
    }
}

impl Password {
    /// Verify that a given plaintext password matches this credential.
    pub fn verify(&self, password: &str) -> bool {
        verify_hash(&self.password, password)
    }
    /// The user this credential belongs to.
    pub const fn user_id(&self) -> Uuid {
        self.user_id
    }
    /// Select a password credential from the database by the corresponding user's ID.
    pub async fn select(
        user_id: Uuid,
        db_conn: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(
            query_as::<_, Self>("SELECT * FROM password WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(db_conn)
                .await?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_hash};

    #[test]
    fn hash_verifies_only_the_original_password() {
        let encoded = hash_password("correct horse battery").expect("hashing succeeds");
        assert!(encoded.starts_with("$argon2id$"));
        assert!(verify_hash(&encoded, "correct horse battery"));
        assert!(!verify_hash(&encoded, "correct horse battery staple"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_hash("not-a-hash", "anything"));
    }
}
