//! PKCE (Proof Key for Code Exchange) implementation.
//!
//! Implements RFC 7636 with the `plain` and `S256` methods.

use gatehouse_common::crypto;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::{OAuthError, Result};
use crate::protocol::CodeChallengeMethod;

/// A code challenge captured at the authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceChallenge {
    /// The challenge value.
    pub challenge: String,
    /// How the verifier is transformed before comparison.
    pub method: CodeChallengeMethod,
}

/// Parses the PKCE parameters of an authorization request.
///
/// No challenge and no method means the request does not use PKCE, which
/// is only allowed for clients that do not require it. The method defaults
/// to `plain`.
///
/// # Errors
/// Returns `invalid_request` for an unknown method, a method without a
/// challenge, or a missing challenge when the client requires PKCE.
pub fn parse_challenge(
    client: &Client,
    code_challenge: Option<&str>,
    code_challenge_method: Option<&str>,
) -> Result<Option<PkceChallenge>> {
    let challenge = code_challenge.filter(|c| !c.is_empty());
    let method = code_challenge_method.filter(|m| !m.is_empty());

    match (challenge, method) {
        (Some(challenge), method) => {
            let method = match method {
                Some(m) => m.parse()?,
                None => CodeChallengeMethod::default(),
            };
            Ok(Some(PkceChallenge {
                challenge: challenge.to_string(),
                method,
            }))
        }
        (None, Some(_)) => Err(OAuthError::InvalidRequest(
            "code_challenge_method given without code_challenge".into(),
        )),
        (None, None) if client.require_pkce => Err(OAuthError::InvalidRequest(
            "code_challenge is required for this client".into(),
        )),
        (None, None) => Ok(None),
    }
}

/// Verifies a code verifier against a stored challenge.
///
/// # Errors
/// Returns `invalid_grant` if the verifier does not match.
pub fn verify_challenge(code_verifier: &str, challenge: &PkceChallenge) -> Result<()> {
    let expected = match challenge.method {
        CodeChallengeMethod::Plain => code_verifier.to_string(),
        CodeChallengeMethod::S256 => compute_s256_challenge(code_verifier),
    };

    if crypto::constant_time_eq(expected.as_bytes(), challenge.challenge.as_bytes()) {
        Ok(())
    } else {
        Err(OAuthError::InvalidGrant("code_verifier mismatch".into()))
    }
}

/// Computes the S256 code challenge from a code verifier.
///
/// S256: BASE64URL(SHA256(code_verifier))
#[must_use]
pub fn compute_s256_challenge(code_verifier: &str) -> String {
    crypto::base64url_encode(&crypto::sha256(code_verifier.as_bytes()))
}
