//! Axum extractors for caller identity and client credentials.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::Engine;
use gatehouse_common::jwt::{verify_hs256, SessionClaims};
use percent_encoding::percent_decode_str;

use crate::error::ServerError;
use crate::routes::AppState;

/// Extractor for the authenticated end user.
///
/// The caller presents `Authorization: Bearer <session JWT>`, signed HS256
/// with the server's session secret. Returns 401 `login_required` if no
/// valid session is provided.
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub i64);

/// Client credentials taken from an `Authorization: Basic` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Client identifier.
    pub client_id: Option<String>,
    /// Client secret.
    pub client_secret: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Verifies a session token and returns the user id it names.
///
/// # Errors
/// Returns `LoginRequired` if the token is invalid, expired or does not
/// name a numeric user.
pub fn verify_session(token: &str, secret: &[u8]) -> Result<i64, ServerError> {
    let claims: SessionClaims = verify_hs256(token, secret)
        .map_err(|e| ServerError::LoginRequired(format!("invalid session token: {e}")))?;

    claims
        .sub
        .parse()
        .map_err(|_| ServerError::LoginRequired("session subject is not a user id".into()))
}

/// Reverses the `application/x-www-form-urlencoded` encoding that
/// RFC 6749 §2.3.1 applies to each half of the Basic credentials.
fn form_urldecode(value: &str) -> Option<String> {
    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Parses an `Authorization: Basic` header into client credentials.
///
/// A missing header, another scheme or a malformed value yields no
/// credentials; the token endpoint then falls back to form fields.
#[must_use]
pub fn basic_credentials(header: Option<&str>) -> BasicCredentials {
    let Some(encoded) = header.and_then(|h| h.strip_prefix("Basic ")) else {
        return BasicCredentials::default();
    };

    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded.trim()) else {
        return BasicCredentials::default();
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return BasicCredentials::default();
    };

    let Some((id, secret)) = decoded.split_once(':') else {
        return BasicCredentials::default();
    };

    match (form_urldecode(id), form_urldecode(secret)) {
        (Some(client_id), Some(client_secret)) => BasicCredentials {
            client_id: Some(client_id),
            client_secret: Some(client_secret),
        },
        _ => BasicCredentials::default(),
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);

        let token = bearer_token(parts)
            .ok_or_else(|| ServerError::LoginRequired("missing session token".into()))?;

        Ok(Self(verify_session(token, &app_state.session_secret)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_common::jwt::sign_hs256;

    const SECRET: &[u8] = b"session-secret-for-tests";

    #[test]
    fn test_verify_session() {
        let token = sign_hs256(&SessionClaims::new("gatehouse", "42", 60), SECRET).unwrap();
        assert_eq!(verify_session(&token, SECRET).unwrap(), 42);

        assert!(verify_session(&token, b"other-secret").is_err());
        assert!(verify_session("garbage", SECRET).is_err());
    }

    #[test]
    fn test_session_subject_must_be_numeric() {
        let token = sign_hs256(&SessionClaims::new("gatehouse", "alice", 60), SECRET).unwrap();
        assert!(matches!(
            verify_session(&token, SECRET),
            Err(ServerError::LoginRequired(_))
        ));
    }

    #[test]
    fn test_basic_credentials() {
        // "svc:s3cr:et" -- the secret may itself contain colons
        let header = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode("svc:s3cr:et")
        );
        let creds = basic_credentials(Some(&header));

        assert_eq!(creds.client_id.as_deref(), Some("svc"));
        assert_eq!(creds.client_secret.as_deref(), Some("s3cr:et"));
    }

    #[test]
    fn test_basic_credentials_are_form_urldecoded() {
        let header = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode("my+app:p%40ss%3Aw%2Bord")
        );
        let creds = basic_credentials(Some(&header));

        assert_eq!(creds.client_id.as_deref(), Some("my app"));
        assert_eq!(creds.client_secret.as_deref(), Some("p@ss:w+ord"));

        // invalid UTF-8 after decoding
        let header = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode("svc:%FF")
        );
        assert_eq!(basic_credentials(Some(&header)), BasicCredentials::default());
    }

    #[test]
    fn test_basic_credentials_ignores_other_input() {
        assert_eq!(basic_credentials(None), BasicCredentials::default());
        assert_eq!(
            basic_credentials(Some("Bearer abc")),
            BasicCredentials::default()
        );
        assert_eq!(
            basic_credentials(Some("Basic !!!")),
            BasicCredentials::default()
        );
    }
}
