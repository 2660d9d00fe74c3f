//! Protocol enumerations: grant types, response types and PKCE methods.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OAuthError;

/// Token endpoint grant types (RFC 6749 §4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization code exchange.
    AuthorizationCode,
    /// Refresh token rotation.
    RefreshToken,
    /// Machine-to-machine client credentials.
    ClientCredentials,
}

impl GrantType {
    /// Returns the wire name of the grant type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

impl FromStr for GrantType {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "refresh_token" => Ok(Self::RefreshToken),
            "client_credentials" => Ok(Self::ClientCredentials),
            "" => Err(OAuthError::InvalidRequest("grant_type is required".into())),
            _ => Err(OAuthError::UnsupportedGrantType(format!(
                "unsupported grant_type: {s}"
            ))),
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization endpoint response types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Authorization code flow.
    Code,
}

impl FromStr for ResponseType {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "" => Err(OAuthError::InvalidRequest("response_type is required".into())),
            _ => Err(OAuthError::UnsupportedResponseType(
                "only 'code' is supported".into(),
            )),
        }
    }
}

/// PKCE code challenge methods (RFC 7636 §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CodeChallengeMethod {
    /// The challenge is the verifier itself.
    #[default]
    #[serde(rename = "plain")]
    Plain,
    /// The challenge is `BASE64URL(SHA256(verifier))`.
    S256,
}

impl CodeChallengeMethod {
    /// Returns the wire name of the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
        }
    }
}

impl FromStr for CodeChallengeMethod {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("plain") {
            Ok(Self::Plain)
        } else if s.eq_ignore_ascii_case("S256") {
            Ok(Self::S256)
        } else {
            Err(OAuthError::InvalidRequest(format!(
                "unsupported code_challenge_method: {s}"
            )))
        }
    }
}
