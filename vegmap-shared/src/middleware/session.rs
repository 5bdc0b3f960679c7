use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session_id";
pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;
/// Matches the width of the `session_id` columns.
pub const SESSION_ID_MAX_LEN: usize = 64;

/// Anonymous browser session, backed by a long-lived `session_id` cookie.
///
/// When the request carries no usable cookie a fresh token is minted; the handler
/// must then send it back with [`SessionToken::apply`] so later requests
/// from the same browser correlate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub id: String,
    pub minted: bool,
}

impl SessionToken {
    pub fn mint() -> Self {
        Self { id: Uuid::new_v4().to_string(), minted: true }
    }

    pub fn existing(id: impl Into<String>) -> Self {
        Self { id: id.into(), minted: false }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        read_cookie(headers, SESSION_COOKIE)
            .filter(|id| is_valid_session_id(id))
            .map(Self::existing)
            .unwrap_or_else(Self::mint)
    }

    pub fn set_cookie_value(&self, secure: bool) -> Option<HeaderValue> {
        let mut cookie = format!(
            "{SESSION_COOKIE}={}; Path=/; Max-Age={SESSION_MAX_AGE_SECS}; HttpOnly; SameSite=Lax",
            self.id
        );
        if secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).ok()
    }

    /// Appends `Set-Cookie` when the token was minted for this request.
    pub fn apply(&self, headers: &mut HeaderMap, secure: bool) {
        if !self.minted {
            return;
        }
        if let Some(value) = self.set_cookie_value(secure) {
            headers.append(SET_COOKIE, value);
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Up to 64 ASCII letters, digits, `-` or `_`.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= SESSION_ID_MAX_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
