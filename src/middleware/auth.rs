//! Middleware used for checking user authentication/authorisation. Sessions
//! are identified by an `Authorization: Bearer <token>` header.
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::{
    services::sessions::{GenericAuthenticatedSession, SessionTrait},
    state::AppState,
    utils::httperror::HttpError,
};

/// Extract the token from a bearer `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve the bearer token into a session of type `T` and attach it to the
/// request. A valid session which is not a `T` (a customer on an admin
/// route) is forbidden rather than unauthorized.
pub async fn session_middleware<T: SessionTrait>(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| HttpError::message(StatusCode::UNAUTHORIZED, "No token provided"))?
        .to_owned();
    let mut session_store = state.session_store.clone();
    let Some(session) = T::get(&token, &mut session_store).await? else {
        return if GenericAuthenticatedSession::get(&token, &mut session_store)
            .await?
            .is_some()
        {
            tracing::warn!(path = %req.uri().path(), "Non-admin session on an admin route");
            Err(HttpError::message(StatusCode::FORBIDDEN, "Admin access required"))
        } else {
            tracing::debug!("Invalid or expired session token");
            Err(HttpError::message(StatusCode::UNAUTHORIZED, "Invalid or expired token"))
        };
    };
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).expect("valid header"));
        headers
    }

    #[test]
    fn parses_bearer_tokens() {
        assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers("bearer  abc123 ")), Some("abc123"));
    }

    #[test]
    fn rejects_other_schemes_and_blanks() {
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer   ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
