//! Session cookie handling and the session endpoints.
//!
//! This is the only place that reads, writes or clears the session cookie.

use super::relay::AuthRelay;
use crate::{Error, api::handlers::error::ErrorResponse, identity::Account};
use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, InvalidHeaderValue, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, warn};

pub const SESSION_COOKIE_NAME: &str = "session-secret";

/// Cookie carrying the provider session secret.
///
/// # Errors
/// Returns an error if the secret contains bytes not allowed in a header.
pub fn session_cookie(secret: &SecretString) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Strict; Secure",
        secret.expose_secret()
    ))
}

#[must_use]
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "session-secret=; Path=/; HttpOnly; SameSite=Strict; Secure; Max-Age=0",
    )
}

/// Read the session secret from the `Cookie` header, if any.
#[must_use]
pub fn extract_session_secret(headers: &HeaderMap) -> Option<SecretString> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((key, val)) = pair.trim().split_once('=') else {
                continue;
            };
            let val = val.trim();
            if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
                return Some(SecretString::from(val.to_string()));
            }
        }
    }
    None
}

/// Headers that set the session cookie, or an error response.
pub(crate) fn set_cookie_headers(secret: &SecretString) -> Result<HeaderMap, Response> {
    let mut headers = HeaderMap::new();
    match session_cookie(secret) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
            Ok(headers)
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

/// Revoke the session at the provider and return headers clearing the cookie.
///
/// The cookie is cleared even when the provider call fails.
pub(crate) async fn end_session(headers: &HeaderMap, relay: &AuthRelay) -> HeaderMap {
    let secret = extract_session_secret(headers);
    if let Err(err) = relay.logout(secret.as_ref()).await {
        warn!("Failed to delete provider session: {err}");
    }
    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, clear_session_cookie());
    response_headers
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, relay: Extension<AuthRelay>) -> impl IntoResponse {
    let response_headers = end_session(&headers, &relay).await;
    (StatusCode::NO_CONTENT, response_headers)
}

#[utoipa::path(
    get,
    path = "/v1/auth/user",
    responses(
        (status = 200, description = "Session is active", body = Account),
        (status = 204, description = "No active session"),
        (status = 503, description = "Identity provider unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn user(headers: HeaderMap, relay: Extension<AuthRelay>) -> Response {
    let secret = extract_session_secret(&headers);
    match relay.logged_in_user(secret.as_ref()).await {
        Ok(Some(account)) => (StatusCode::OK, Json(account)).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Resolve the session cookie into an account or fail with [`Error::NoSession`].
///
/// # Errors
/// [`Error::NoSession`] without a live session, provider errors otherwise.
pub async fn require_user(headers: &HeaderMap, relay: &AuthRelay) -> Result<Account, Error> {
    let secret = extract_session_secret(headers);
    relay
        .logged_in_user(secret.as_ref())
        .await?
        .ok_or(Error::NoSession)
}
