//! OAuth error types.
//!
//! Every rejection carries its RFC 6749 error code as a variant; the
//! description is for humans only and is never parsed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for OAuth operations.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// OAuth error codes (RFC 6749 §4.1.2.1 and §5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is missing a parameter or is otherwise malformed.
    InvalidRequest,
    /// Client authentication failed.
    InvalidClient,
    /// The client is not allowed to use this flow.
    UnauthorizedClient,
    /// The code or refresh token is invalid, expired, revoked or mis-bound.
    InvalidGrant,
    /// The grant type is not supported.
    UnsupportedGrantType,
    /// The response type is not supported.
    UnsupportedResponseType,
    /// A requested scope is unknown or not allowed.
    InvalidScope,
    /// Internal failure.
    ServerError,
}

impl ErrorCode {
    /// Returns the wire representation of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth-specific errors.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Invalid request parameters.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    /// Client authentication failed.
    #[error("invalid_client: {0}")]
    InvalidClient(String),

    /// Unauthorized client for this operation.
    #[error("unauthorized_client: {0}")]
    UnauthorizedClient(String),

    /// Invalid authorization code or refresh token.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    /// Unsupported grant type.
    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),

    /// Unsupported response type.
    #[error("unsupported_response_type: {0}")]
    UnsupportedResponseType(String),

    /// Invalid scope requested.
    #[error("invalid_scope: {0}")]
    InvalidScope(String),

    /// Server error during processing.
    #[error("server_error: {0}")]
    ServerError(String),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Token signing failed.
    #[error("signing error: {0}")]
    Signing(String),
}

impl OAuthError {
    /// Returns the OAuth error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::InvalidClient(_) => ErrorCode::InvalidClient,
            Self::UnauthorizedClient(_) => ErrorCode::UnauthorizedClient,
            Self::InvalidGrant(_) => ErrorCode::InvalidGrant,
            Self::UnsupportedGrantType(_) => ErrorCode::UnsupportedGrantType,
            Self::UnsupportedResponseType(_) => ErrorCode::UnsupportedResponseType,
            Self::InvalidScope(_) => ErrorCode::InvalidScope,
            Self::ServerError(_) | Self::Storage(_) | Self::Signing(_) => ErrorCode::ServerError,
        }
    }

    /// Returns the description sent to the client.
    ///
    /// Internal failures are reported generically; their detail only goes
    /// to the log.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::InvalidRequest(msg)
            | Self::InvalidClient(msg)
            | Self::UnauthorizedClient(msg)
            | Self::InvalidGrant(msg)
            | Self::UnsupportedGrantType(msg)
            | Self::UnsupportedResponseType(msg)
            | Self::InvalidScope(msg) => msg,
            Self::ServerError(_) | Self::Storage(_) | Self::Signing(_) => {
                "an internal server error occurred"
            }
        }
    }
}

impl From<gatehouse_common::Error> for OAuthError {
    fn from(err: gatehouse_common::Error) -> Self {
        Self::ServerError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_first_class() {
        assert_eq!(
            OAuthError::InvalidGrant("code expired".into()).code(),
            ErrorCode::InvalidGrant
        );
        assert_eq!(
            OAuthError::Storage("disk full".into()).code(),
            ErrorCode::ServerError
        );
        assert_eq!(
            OAuthError::Signing("bad key".into()).code().as_str(),
            "server_error"
        );
    }

    #[test]
    fn test_description_hides_internal_detail() {
        let err = OAuthError::Storage("table oauth_codes is locked".into());
        assert!(!err.description().contains("oauth_codes"));

        let err = OAuthError::InvalidScope("unknown scopes: admin".into());
        assert_eq!(err.description(), "unknown scopes: admin");
    }

    #[test]
    fn test_error_code_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCode::UnsupportedResponseType).unwrap();
        assert_eq!(json, "\"unsupported_response_type\"");
    }
}
