//! Identity: password and one-time-password login, Firebase phone login and
//! the admin allowlist.
use serde::Serialize;
use uuid::Uuid;

use crate::{
    clients::firebase::FirebaseClient,
    constants::auth::{ADMIN_EMAILS, ADMIN_PHONES, PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH},
    db::{
        self,
        errors::DatabaseError,
        models::{
            appuser::{AppUser, AppUserInsert, AppUserRole},
            password::{Password, PasswordInsert},
        },
    },
    services::{
        errors::StorageError,
        notifications::{self, Mailer},
        otp::{self, OtpChannel, OtpPurpose},
        sessions::{self, GenericAuthenticatedSession, SessionTrait as _},
    },
    utils::{email::EmailAddress, phone::PhoneNumber},
};

/// Name given to users created through a phone login.
const PHONE_USER_NAME: &str = "OTP User";

/// A freshly issued bearer token together with the user it authenticates.
#[derive(Serialize, Debug)]
pub struct AuthenticatedUser {
    pub token: String,
    pub user: AppUser,
}

/// Whether an email or phone number is on the operator's admin allowlist.
pub fn is_admin_identity(email: Option<&str>, phone: Option<&str>) -> bool {
    email.is_some_and(|email| ADMIN_EMAILS.iter().any(|admin| *admin == email.to_lowercase()))
        || phone.is_some_and(|phone| {
            ADMIN_PHONES.iter().any(|admin| {
                PhoneNumber::try_from(admin.as_str()).is_ok_and(|admin| admin.as_str() == phone)
            })
        })
}

/// Promote allowlisted users. Roles are never demoted here.
async fn sync_admin_role(
    user: &mut AppUser,
    db_conn: &db::ConnectionPool,
) -> Result<(), db::errors::DatabaseError> {
    if !user.is_admin() && is_admin_identity(user.email(), user.phone()) {
        tracing::info!(user_id = %user.id(), "Promoting allowlisted user to admin");
        user.set_role(AppUserRole::Admin);
        user.update(db_conn).await?;
    }
    Ok(())
}

fn initial_role(email: Option<&str>, phone: Option<&str>) -> AppUserRole {
    if is_admin_identity(email, phone) {
        AppUserRole::Admin
    } else {
        AppUserRole::User
    }
}

/// Sync the user's role and issue them a session.
async fn start_session(
    mut user: AppUser,
    db_conn: &db::ConnectionPool,
    session_store_conn: &mut sessions::store::Connection,
) -> Result<AuthenticatedUser, StorageError> {
    sync_admin_role(&mut user, db_conn).await?;
    let session =
        GenericAuthenticatedSession::create(user.id(), user.is_admin(), session_store_conn).await?;
    Ok(AuthenticatedUser {
        token: session.token(),
        user,
    })
}

/// Create a password-backed account.
pub async fn register(
    name: &str,
    email: &str,
    password: &str,
    db_conn: &db::ConnectionPool,
) -> Result<AppUser, errors::RegistrationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(errors::RegistrationError::MissingName);
    }
    let email =
        EmailAddress::try_from(email).map_err(|()| errors::RegistrationError::InvalidEmail)?;
    if !(PASSWORD_MIN_LENGTH..=PASSWORD_MAX_LENGTH).contains(&password.chars().count()) {
        return Err(errors::RegistrationError::InvalidPassword);
    }
    if AppUser::select_by_email(&email, db_conn).await?.is_some() {
        return Err(errors::RegistrationError::Duplicate);
    }
    let role = initial_role(Some(email.as_str()), None);
    let mut tx = db_conn.begin().await.map_err(DatabaseError::from)?;
    let user = AppUserInsert::with_email(name, email)
        .store(role, &mut *tx)
        .await
        .map_err(|err| {
            if err.is_unique_violation() {
                errors::RegistrationError::Duplicate
            } else {
                errors::RegistrationError::DatabaseError(err)
            }
        })?;
    PasswordInsert::new(user.id(), password)?
        .store(&mut tx)
        .await?;
    tx.commit().await.map_err(DatabaseError::from)?;
    tracing::info!(user_id = %user.id(), "Registered new user");
    Ok(user)
}

/// Authenticate with email and password.
pub async fn login(
    email: &str,
    password: &str,
    db_conn: &db::ConnectionPool,
    session_store_conn: &mut sessions::store::Connection,
) -> Result<AuthenticatedUser, errors::LoginError> {
    let email = EmailAddress::try_from(email).map_err(|()| errors::LoginError::InvalidCredentials)?;
    let Some(user) = AppUser::select_by_email(&email, db_conn).await.map_err(StorageError::from)?
    else {
        return Err(errors::LoginError::InvalidCredentials);
    };
    let verified = Password::select(user.id(), db_conn)
        .await
        .map_err(StorageError::from)?
        .is_some_and(|credential| credential.verify(password));
    if !verified {
        return Err(errors::LoginError::InvalidCredentials);
    }
    Ok(start_session(user, db_conn, session_store_conn).await?)
}

/// Email a login code. The purpose records whether verifying it signs in an
/// existing user or creates a new one.
pub async fn request_email_otp(
    email: &str,
    db_conn: &db::ConnectionPool,
    otp_store_conn: &mut otp::store::Connection,
    mailer: &Mailer,
) -> Result<OtpPurpose, errors::OtpRequestError> {
    let email = EmailAddress::try_from(email).map_err(|()| errors::OtpRequestError::InvalidEmail)?;
    let purpose = if AppUser::select_by_email(&email, db_conn)
        .await
        .map_err(StorageError::from)?
        .is_some()
    {
        OtpPurpose::Login
    } else {
        OtpPurpose::Signup
    };
    let code = otp::issue(OtpChannel::Email, email.as_str(), purpose, otp_store_conn)
        .await
        .map_err(StorageError::from)?;
    notifications::send_otp_email(mailer, email.as_str(), &code).await?;
    Ok(purpose)
}

/// Check an emailed code, creating the account on signup.
pub async fn verify_email_otp(
    email: &str,
    code: &str,
    name: Option<&str>,
    db_conn: &db::ConnectionPool,
    otp_store_conn: &mut otp::store::Connection,
    session_store_conn: &mut sessions::store::Connection,
) -> Result<AuthenticatedUser, errors::OtpLoginError> {
    let email = EmailAddress::try_from(email).map_err(|()| errors::OtpLoginError::InvalidIdentifier)?;
    otp::verify(OtpChannel::Email, email.as_str(), code, otp_store_conn).await?;
    let user = match AppUser::select_by_email(&email, db_conn)
        .await
        .map_err(StorageError::from)?
    {
        Some(user) => user,
        None => {
            let name = name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| email.local_part())
                .to_owned();
            let role = initial_role(Some(email.as_str()), None);
            AppUserInsert::with_email(&name, email)
                .store(role, db_conn)
                .await
                .map_err(StorageError::from)?
        }
    };
    Ok(start_session(user, db_conn, session_store_conn).await?)
}

/// Issue a code for a phone number. No SMS is sent; the caller decides
/// whether to reveal it.
pub async fn send_phone_otp(
    phone: &str,
    otp_store_conn: &mut otp::store::Connection,
) -> Result<String, errors::OtpRequestError> {
    let phone = PhoneNumber::try_from(phone).map_err(|()| errors::OtpRequestError::InvalidPhone)?;
    Ok(
        otp::issue(OtpChannel::Phone, phone.as_str(), OtpPurpose::Phone, otp_store_conn)
            .await
            .map_err(StorageError::from)?,
    )
}

async fn find_or_create_by_phone(
    phone: PhoneNumber,
    db_conn: &db::ConnectionPool,
) -> Result<AppUser, db::errors::DatabaseError> {
    if let Some(user) = AppUser::select_by_phone(&phone, db_conn).await? {
        return Ok(user);
    }
    let role = initial_role(None, Some(phone.as_str()));
    AppUserInsert::with_phone(PHONE_USER_NAME, phone)
        .store(role, db_conn)
        .await
}

/// Check a phone code and sign the owner of the number in.
pub async fn verify_phone_otp(
    phone: &str,
    code: &str,
    db_conn: &db::ConnectionPool,
    otp_store_conn: &mut otp::store::Connection,
    session_store_conn: &mut sessions::store::Connection,
) -> Result<AuthenticatedUser, errors::OtpLoginError> {
    let phone = PhoneNumber::try_from(phone).map_err(|()| errors::OtpLoginError::InvalidIdentifier)?;
    otp::verify(OtpChannel::Phone, phone.as_str(), code, otp_store_conn).await?;
    let user = find_or_create_by_phone(phone, db_conn)
        .await
        .map_err(StorageError::from)?;
    Ok(start_session(user, db_conn, session_store_conn).await?)
}

/// Sign in with a Firebase phone-auth ID token.
pub async fn firebase_login(
    id_token: &str,
    firebase: &FirebaseClient,
    db_conn: &db::ConnectionPool,
    session_store_conn: &mut sessions::store::Connection,
) -> Result<AuthenticatedUser, errors::FirebaseLoginError> {
    let raw_phone = firebase.verified_phone_number(id_token).await?;
    let phone = PhoneNumber::try_from(raw_phone.as_str())
        .map_err(|()| errors::FirebaseLoginError::InvalidPhone(raw_phone.clone()))?;
    let user = find_or_create_by_phone(phone, db_conn)
        .await
        .map_err(StorageError::from)?;
    Ok(start_session(user, db_conn, session_store_conn).await?)
}

pub async fn current_user(
    user_id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<Option<AppUser>, db::errors::DatabaseError> {
    AppUser::select_one(user_id, db_conn).await
}

pub async fn logout(
    session: GenericAuthenticatedSession,
    session_store_conn: &mut sessions::store::Connection,
) -> Result<(), sessions::errors::SessionStorageError> {
    let user_id = session.user_id();
    session.delete(session_store_conn).await?;
    tracing::debug!(%user_id, "Session revoked");
    Ok(())
}

pub mod errors {
    use thiserror::Error;

    use crate::{
        clients::firebase::errors::FirebaseError,
        db::errors::DatabaseError,
        services::{
            errors::StorageError, notifications::errors::NotificationError,
            otp::errors::OtpVerificationError,
        },
    };

    #[derive(Error, Debug)]
    pub enum RegistrationError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("Failed to hash password: {0}")]
        HashError(#[from] argon2::password_hash::Error),
        #[error("Name is required")]
        MissingName,
        #[error("Invalid email address")]
        InvalidEmail,
        #[error("Password must be between 8 and 128 characters")]
        InvalidPassword,
        #[error("A user with this email already exists")]
        Duplicate,
    }

    #[derive(Error, Debug)]
    pub enum LoginError {
        #[error(transparent)]
        StorageError(#[from] StorageError),
        #[error("Invalid credentials")]
        InvalidCredentials,
    }

    #[derive(Error, Debug)]
    pub enum OtpRequestError {
        #[error(transparent)]
        StorageError(#[from] StorageError),
        #[error(transparent)]
        NotificationError(#[from] NotificationError),
        #[error("Invalid email address")]
        InvalidEmail,
        #[error("Invalid phone number")]
        InvalidPhone,
    }

    #[derive(Error, Debug)]
    pub enum OtpLoginError {
        #[error(transparent)]
        StorageError(#[from] StorageError),
        #[error(transparent)]
        Verification(#[from] OtpVerificationError),
        #[error("Invalid email address or phone number")]
        InvalidIdentifier,
    }

    #[derive(Error, Debug)]
    pub enum FirebaseLoginError {
        #[error(transparent)]
        StorageError(#[from] StorageError),
        #[error(transparent)]
        Firebase(#[from] FirebaseError),
        #[error("Firebase returned an unusable phone number: {0}")]
        InvalidPhone(String),
    }
}
