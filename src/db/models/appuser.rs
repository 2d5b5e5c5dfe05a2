//! Models mapping to the appuser database table. Represents a user and their
//! associated information.
use crate::{
    db::{errors::DatabaseError, ConnectionPool},
    utils::{email::EmailAddress, phone::PhoneNumber},
};
use serde::Serialize;
use sqlx::{query, query_as, PgExecutor};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(sqlx::Type, Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[sqlx(type_name = "app_user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppUserRole {
    /// A regular customer, able to purchase items.
    User,
    /// An administrator, able to manage inventory and orders.
    Admin,
}

/// INSERT model for an `AppUser`. Used ONLY when creating a new user.
pub struct AppUserInsert {
    /// The user's display name.
    pub name: String,
    /// Optional email address. Private to enforce validity.
    email: Option<String>,
    /// Optional phone number. Private to enforce validity.
    phone: Option<String>,
}

/// An `AppUser` which is stored in the database. Can only be constructed by
/// reading it from the database.
#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct AppUser {
    /// The user's ID primary key.
    id: Uuid,
    /// The user's display name.
    pub name: String,
    /// The user's email address, if they signed up with one.
    email: Option<String>,
    /// The user's phone number, if they signed up with one.
    phone: Option<String>,
    /// The user's role.
    role: AppUserRole,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl AppUserInsert {
    /// A user identified by email address.
    pub fn with_email(name: &str, email: EmailAddress) -> Self {
        Self {
            name: name.to_owned(),
            email: Some(email.into()),
            phone: None,
        }
    }
    /// A user identified by phone number.
    pub fn with_phone(name: &str, phone: PhoneNumber) -> Self {
        Self {
            name: name.to_owned(),
            email: None,
            phone: Some(phone.into()),
        }
    }

    /// Store this INSERT model in the database and return a complete `AppUser` model.
    /// Accepts the pool or a transaction connection.
    pub async fn store(
        self,
        role: AppUserRole,
        db_conn: impl PgExecutor<'_>,
    ) -> Result<AppUser, DatabaseError> {
        Ok(query_as::<_, AppUser>(
            "INSERT INTO appuser (name, email, phone, role) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(self.name)
        .bind(self.email)
        .bind(self.phone)
        .bind(role)
        .fetch_one(db_conn)
        .await?)
    }
}

impl AppUser {
    /// Get the `AppUser`'s ID primary key.
    pub const fn id(&self) -> Uuid {
        self.id
    }
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
    pub const fn role(&self) -> AppUserRole {
        self.role
    }
    pub fn is_admin(&self) -> bool {
        self.role == AppUserRole::Admin
    }
    pub fn set_role(&mut self, role: AppUserRole) {
        self.role = role;
    }
    /// Select an `AppUser` from the database by ID.
    pub async fn select_one(
        id: Uuid,
        db_conn: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM appuser WHERE id = $1")
            .bind(id)
            .fetch_optional(db_conn)
            .await?)
    }
    /// Select an `AppUser` from the database by (normalized) email.
    pub async fn select_by_email(
        email: &EmailAddress,
        db_conn: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM appuser WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(db_conn)
            .await?)
    }
    /// Select an `AppUser` from the database by (normalized) phone number.
    pub async fn select_by_phone(
        phone: &PhoneNumber,
        db_conn: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>("SELECT * FROM appuser WHERE phone = $1")
            .bind(phone.as_str())
            .fetch_optional(db_conn)
            .await?)
    }
    /// Update the database record to match the model's current state.
    pub async fn update(&self, db_conn: &ConnectionPool) -> Result<(), DatabaseError> {
        query("UPDATE appuser SET name = $1, role = $2 WHERE id = $3")
            .bind(&self.name)
            .bind(self.role)
            .bind(self.id)
            .execute(db_conn)
            .await?;
        Ok(())
    }
}
