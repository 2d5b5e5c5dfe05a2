//! Routes under /auth handling registration, login and sessions.
use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    clients::firebase::errors::FirebaseError,
    constants::auth::PHONE_OTP_ECHO,
    db::models::appuser::AppUser,
    middleware::auth::session_middleware,
    services::{
        auth::{self, AuthenticatedUser},
        errors::StorageError,
        otp::{errors::OtpVerificationError, OtpPurpose},
        sessions::GenericAuthenticatedSession,
    },
    state::AppState,
    utils::httperror::HttpError,
};

/// Create a router for the /auth route.
pub fn create_router(state: &AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
        .layer(from_fn_with_state(
            state.clone(),
            session_middleware::<GenericAuthenticatedSession>,
        ));
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/request-otp", post(request_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/send-otp", post(send_phone_otp))
        .route("/verify-phone-otp", post(verify_phone_otp))
        .route("/firebase-login", post(firebase_login))
        .merge(authenticated)
}

/// Reject a request when any required field is blank. Request bodies default
/// missing fields to empty so that they land here rather than in axum's
/// plain-text rejection.
fn require(fields: &[&str], message: &'static str) -> Result<(), HttpError> {
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(HttpError::message(StatusCode::BAD_REQUEST, message));
    }
    Ok(())
}

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AppUser>), HttpError> {
    let user = auth::register(&body.name, &body.email, &body.password, &state.db).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthenticatedUser>, HttpError> {
    require(&[&body.email, &body.password], "Email and password are required")?;
    let mut session_store = state.session_store.clone();
    Ok(Json(
        auth::login(&body.email, &body.password, &state.db, &mut session_store).await?,
    ))
}

#[derive(Deserialize)]
struct RequestOtpRequest {
    #[serde(default)]
    email: String,
}

#[derive(Serialize)]
struct RequestOtpResponse {
    message: &'static str,
    purpose: OtpPurpose,
}

/// Email a login code. The purpose tells the client whether to ask for a
/// name before verifying.
async fn request_otp(
    State(state): State<AppState>,
    Json(body): Json<RequestOtpRequest>,
) -> Result<Json<RequestOtpResponse>, HttpError> {
    require(&[&body.email], "Email is required")?;
    let mut otp_store = state.otp_store.clone();
    let purpose =
        auth::request_email_otp(&body.email, &state.db, &mut otp_store, &state.mailer).await?;
    Ok(Json(RequestOtpResponse {
        message: "OTP sent to email",
        purpose,
    }))
}

#[derive(Deserialize)]
struct VerifyOtpRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    otp: String,
    name: Option<String>,
}

async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<Json<AuthenticatedUser>, HttpError> {
    require(&[&body.email, &body.otp], "Email and OTP are required")?;
    let mut otp_store = state.otp_store.clone();
    let mut session_store = state.session_store.clone();
    Ok(Json(
        auth::verify_email_otp(
            &body.email,
            &body.otp,
            body.name.as_deref(),
            &state.db,
            &mut otp_store,
            &mut session_store,
        )
        .await?,
    ))
}

#[derive(Deserialize)]
struct SendPhoneOtpRequest {
    #[serde(default)]
    phone: String,
}

#[derive(Serialize)]
struct SendPhoneOtpResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    otp: Option<String>,
}

/// Issue a phone code. There is no SMS provider, so the code is only ever
/// revealed when echoing is switched on.
async fn send_phone_otp(
    State(state): State<AppState>,
    Json(body): Json<SendPhoneOtpRequest>,
) -> Result<Json<SendPhoneOtpResponse>, HttpError> {
    require(&[&body.phone], "Phone number is required")?;
    let mut otp_store = state.otp_store.clone();
    let code = auth::send_phone_otp(&body.phone, &mut otp_store).await?;
    Ok(Json(SendPhoneOtpResponse {
        message: "OTP generated",
        otp: PHONE_OTP_ECHO.then_some(code),
    }))
}

#[derive(Deserialize)]
struct VerifyPhoneOtpRequest {
    #[serde(default)]
    phone: String,
    #[serde(default)]
    otp: String,
}

async fn verify_phone_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyPhoneOtpRequest>,
) -> Result<Json<AuthenticatedUser>, HttpError> {
    require(&[&body.phone, &body.otp], "Phone number and OTP are required")?;
    let mut otp_store = state.otp_store.clone();
    let mut session_store = state.session_store.clone();
    Ok(Json(
        auth::verify_phone_otp(
            &body.phone,
            &body.otp,
            &state.db,
            &mut otp_store,
            &mut session_store,
        )
        .await?,
    ))
}

#[derive(Deserialize)]
struct FirebaseLoginRequest {
    #[serde(alias = "idToken", default)]
    id_token: String,
}

async fn firebase_login(
    State(state): State<AppState>,
    Json(body): Json<FirebaseLoginRequest>,
) -> Result<Json<AuthenticatedUser>, HttpError> {
    require(&[&body.id_token], "Firebase ID token missing")?;
    let mut session_store = state.session_store.clone();
    Ok(Json(
        auth::firebase_login(
            body.id_token.trim(),
            &state.firebase,
            &state.db,
            &mut session_store,
        )
        .await?,
    ))
}

async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
) -> Result<Json<AppUser>, HttpError> {
    let user_id = session.user_id();
    let user = auth::current_user(user_id, &state.db).await?.ok_or_else(|| {
        tracing::warn!(%user_id, "Session refers to a user that no longer exists");
        HttpError::message(StatusCode::NOT_FOUND, "User not found")
    })?;
    Ok(Json(user))
}

async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<GenericAuthenticatedSession>,
) -> Result<StatusCode, HttpError> {
    let mut session_store = state.session_store.clone();
    auth::logout(session, &mut session_store).await?;
    Ok(StatusCode::NO_CONTENT)
}

impl From<StorageError> for HttpError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DatabaseError(err) => err.into(),
            StorageError::SessionStorageError(err) => err.into(),
            StorageError::OtpStorageError(err) => {
                tracing::error!(error = %err, "OTP store error in handler");
                Self::from(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl From<OtpVerificationError> for HttpError {
    fn from(err: OtpVerificationError) -> Self {
        match err {
            OtpVerificationError::StorageError(err) => StorageError::from(err).into(),
            OtpVerificationError::Expired => {
                Self::message(StatusCode::UNAUTHORIZED, "OTP expired or not found")
            }
            OtpVerificationError::Incorrect { remaining } => Self::message(
                StatusCode::BAD_REQUEST,
                format!("Incorrect OTP. {remaining} attempts remaining"),
            ),
            OtpVerificationError::TooManyAttempts => Self::message(
                StatusCode::UNAUTHORIZED,
                "Too many incorrect attempts. Request a new OTP",
            ),
        }
    }
}

impl From<auth::errors::RegistrationError> for HttpError {
    fn from(err: auth::errors::RegistrationError) -> Self {
        match err {
            auth::errors::RegistrationError::DatabaseError(err) => err.into(),
            auth::errors::RegistrationError::HashError(err) => {
                tracing::error!(error = %err, "Password hashing failed");
                Self::from(StatusCode::INTERNAL_SERVER_ERROR)
            }
            auth::errors::RegistrationError::Duplicate => {
                Self::message(StatusCode::CONFLICT, "User already exists")
            }
            err @ (auth::errors::RegistrationError::MissingName
            | auth::errors::RegistrationError::InvalidEmail
            | auth::errors::RegistrationError::InvalidPassword) => {
                Self::message(StatusCode::BAD_REQUEST, err.to_string())
            }
        }
    }
}

impl From<auth::errors::LoginError> for HttpError {
    fn from(err: auth::errors::LoginError) -> Self {
        match err {
            auth::errors::LoginError::StorageError(err) => err.into(),
            auth::errors::LoginError::InvalidCredentials => {
                tracing::info!("Failed login attempt");
                Self::message(StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
        }
    }
}

impl From<auth::errors::OtpRequestError> for HttpError {
    fn from(err: auth::errors::OtpRequestError) -> Self {
        match err {
            auth::errors::OtpRequestError::StorageError(err) => err.into(),
            auth::errors::OtpRequestError::NotificationError(err) => {
                tracing::error!(error = %err, "Failed to deliver OTP email");
                Self::message(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send OTP")
            }
            err @ (auth::errors::OtpRequestError::InvalidEmail
            | auth::errors::OtpRequestError::InvalidPhone) => {
                Self::message(StatusCode::BAD_REQUEST, err.to_string())
            }
        }
    }
}

impl From<auth::errors::OtpLoginError> for HttpError {
    fn from(err: auth::errors::OtpLoginError) -> Self {
        match err {
            auth::errors::OtpLoginError::StorageError(err) => err.into(),
            auth::errors::OtpLoginError::Verification(err) => err.into(),
            auth::errors::OtpLoginError::InvalidIdentifier => {
                Self::message(StatusCode::BAD_REQUEST, "Invalid email address or phone number")
            }
        }
    }
}

impl From<auth::errors::FirebaseLoginError> for HttpError {
    fn from(err: auth::errors::FirebaseLoginError) -> Self {
        match err {
            auth::errors::FirebaseLoginError::StorageError(err) => err.into(),
            auth::errors::FirebaseLoginError::Firebase(FirebaseError::NotConfigured) => {
                Self::message(StatusCode::SERVICE_UNAVAILABLE, "Firebase login is not configured")
            }
            auth::errors::FirebaseLoginError::Firebase(
                FirebaseError::InvalidToken | FirebaseError::MissingPhoneNumber,
            ) => Self::message(StatusCode::UNAUTHORIZED, "Invalid Firebase token"),
            auth::errors::FirebaseLoginError::Firebase(err) => {
                tracing::error!(error = %err, "Firebase token lookup failed");
                Self::message(StatusCode::BAD_GATEWAY, "Firebase verification failed")
            }
            auth::errors::FirebaseLoginError::InvalidPhone(phone) => {
                tracing::warn!(%phone, "Firebase returned an unusable phone number");
                Self::message(StatusCode::BAD_REQUEST, "Unsupported phone number")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_failures_map_to_client_errors() {
        assert_eq!(
            HttpError::from(OtpVerificationError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            HttpError::from(OtpVerificationError::TooManyAttempts).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            HttpError::from(OtpVerificationError::Incorrect { remaining: 2 }).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn registration_errors_map_to_statuses() {
        assert_eq!(
            HttpError::from(auth::errors::RegistrationError::Duplicate).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            HttpError::from(auth::errors::RegistrationError::InvalidPassword).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HttpError::from(auth::errors::LoginError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn missing_fields_are_bad_requests() {
        let body: LoginRequest =
            serde_json::from_value(serde_json::json!({"email": "asha@example.in"}))
                .expect("missing password still deserializes");
        let err = require(&[&body.email, &body.password], "Email and password are required")
            .expect_err("blank password is rejected");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let body: VerifyPhoneOtpRequest =
            serde_json::from_value(serde_json::json!({})).expect("empty body deserializes");
        assert!(require(&[&body.phone, &body.otp], "required").is_err());
        assert!(require(&["9876543210", "123456"], "required").is_ok());
    }
}
