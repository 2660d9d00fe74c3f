//! JWT utilities.
//!
//! Issued tokens and caller session tokens are both HS256 (HMAC-SHA256).

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::Error;

/// Claims carried by a caller session token.
///
/// A session token proves that the caller has already logged in; its
/// subject is the numeric user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Issuer.
    pub iss: String,
    /// Subject (user id).
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: u64,
    /// Issued at time (Unix timestamp).
    pub iat: u64,
}

impl SessionClaims {
    /// Creates session claims for a user, valid for `exp_seconds`.
    #[must_use]
    pub fn new(iss: impl Into<String>, sub: impl Into<String>, exp_seconds: u64) -> Self {
        let now = crate::current_timestamp();

        Self {
            iss: iss.into(),
            sub: sub.into(),
            exp: now + exp_seconds,
            iat: now,
        }
    }
}

/// Signs a JWT with HS256 (HMAC-SHA256).
///
/// # Errors
/// Returns an error if signing fails.
pub fn sign_hs256<T: Serialize>(claims: &T, secret: &[u8]) -> Result<String, Error> {
    let header = Header::new(Algorithm::HS256);
    let encoding_key = EncodingKey::from_secret(secret);

    jsonwebtoken::encode(&header, claims, &encoding_key)
        .map_err(|e| Error::Jwt(format!("signing failed: {e}")))
}

/// Verifies a JWT with HS256 (HMAC-SHA256).
///
/// Tokens carrying an `aud` claim must be checked with
/// [`verify_hs256_for_audience`] instead.
///
/// # Errors
/// Returns an error if verification fails.
pub fn verify_hs256<T: DeserializeOwned>(token: &str, secret: &[u8]) -> Result<T, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_aud = false;

    decode(token, secret, &validation)
}

/// Verifies an HS256 JWT and requires its `aud` claim to match `audience`.
///
/// # Errors
/// Returns an error if verification fails or the audience differs.
pub fn verify_hs256_for_audience<T: DeserializeOwned>(
    token: &str,
    secret: &[u8],
    audience: &str,
) -> Result<T, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_audience(&[audience]);

    decode(token, secret, &validation)
}

fn decode<T: DeserializeOwned>(
    token: &str,
    secret: &[u8],
    validation: &Validation,
) -> Result<T, Error> {
    let decoding_key = DecodingKey::from_secret(secret);

    let token_data = jsonwebtoken::decode::<T>(token, &decoding_key, validation)
        .map_err(|e| Error::Jwt(format!("verification failed: {e}")))?;

    Ok(token_data.claims)
}
