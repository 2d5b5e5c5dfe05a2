//! Verifies Firebase ID tokens through the Identity Toolkit `accounts:lookup`
//! endpoint and reads the phone number they were issued for.
use std::sync::Arc;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::constants::integrations::FIREBASE_LOOKUP_URL;

#[derive(Clone)]
pub struct FirebaseClient {
    inner: Arc<FirebaseClientInner>,
}

struct FirebaseClientInner {
    http: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize, Debug)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<FirebaseUser>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct FirebaseUser {
    #[serde(default)]
    phone_number: Option<String>,
}

impl LookupResponse {
    fn into_phone_number(self) -> Result<String, errors::FirebaseError> {
        let user = self
            .users
            .into_iter()
            .next()
            .ok_or(errors::FirebaseError::InvalidToken)?;
        user.phone_number
            .filter(|phone| !phone.is_empty())
            .ok_or(errors::FirebaseError::MissingPhoneNumber)
    }
}

impl FirebaseClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            inner: Arc::new(FirebaseClientInner { http, api_key }),
        }
    }

    /// Resolve an ID token to the phone number of the account it belongs to.
    #[instrument(skip_all, err)]
    pub async fn verified_phone_number(
        &self,
        id_token: &str,
    ) -> Result<String, errors::FirebaseError> {
        let api_key = self
            .inner
            .api_key
            .as_deref()
            .ok_or(errors::FirebaseError::NotConfigured)?;
        let url = Url::parse_with_params(FIREBASE_LOOKUP_URL, &[("key", api_key)])?;
        let response = self
            .inner
            .http
            .post(url)
            .json(&LookupRequest { id_token })
            .send()
            .await?;
        if response.status() == StatusCode::BAD_REQUEST {
            return Err(errors::FirebaseError::InvalidToken);
        }
        response
            .error_for_status()?
            .json::<LookupResponse>()
            .await?
            .into_phone_number()
    }
}

pub mod errors {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum FirebaseError {
        #[error("FIREBASE_API_KEY is not configured")]
        NotConfigured,
        #[error("The ID token is invalid or expired")]
        InvalidToken,
        #[error("The Firebase account has no phone number")]
        MissingPhoneNumber,
        #[error(transparent)]
        InvalidUrl(#[from] url::ParseError),
        #[error(transparent)]
        Http(#[from] reqwest::Error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_number_is_read_from_first_user() {
        let response: LookupResponse = serde_json::from_str(
            r#"{"kind":"identitytoolkit#GetAccountInfoResponse","users":[{"localId":"abc","phoneNumber":"+919876543210"}]}"#,
        )
        .expect("parses");
        assert_eq!(
            response.into_phone_number().expect("has phone"),
            "+919876543210"
        );
    }

    #[test]
    fn missing_users_or_phone_are_errors() {
        let no_users: LookupResponse = serde_json::from_str("{}").expect("parses");
        assert!(matches!(
            no_users.into_phone_number(),
            Err(errors::FirebaseError::InvalidToken)
        ));
        let no_phone: LookupResponse =
            serde_json::from_str(r#"{"users":[{"localId":"abc"}]}"#).expect("parses");
        assert!(matches!(
            no_phone.into_phone_number(),
            Err(errors::FirebaseError::MissingPhoneNumber)
        ));
    }
}
