//! Server error types and their HTTP mapping.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gatehouse_oauth::{ErrorCode, OAuthError};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Realm advertised on `invalid_client` responses.
pub const AUTH_REALM: &str = "Basic realm=\"gatehouse\"";

/// Server-specific errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// OAuth protocol error.
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// The caller has no valid session.
    #[error("login required: {0}")]
    LoginRequired(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for ServerError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// OAuth error body (RFC 6749 §5.2).
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Error code.
    pub error: String,
    /// Human-readable description.
    pub error_description: String,
    /// Echoed client state, on authorization errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl ErrorBody {
    /// Builds the body for an OAuth error.
    #[must_use]
    pub fn from_oauth(err: &OAuthError, state: Option<String>) -> Self {
        Self {
            error: err.code().as_str().to_string(),
            error_description: err.description().to_string(),
            state,
        }
    }
}

/// HTTP status for an OAuth error code.
#[must_use]
pub const fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidClient => StatusCode::UNAUTHORIZED,
        ErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// Renders an OAuth error as a JSON response.
///
/// `invalid_client` carries a `WWW-Authenticate` challenge.
#[must_use]
pub fn oauth_error_response(err: &OAuthError, state: Option<String>) -> Response {
    let code = err.code();
    let mut response = (status_for(code), Json(ErrorBody::from_oauth(err, state))).into_response();

    if code == ErrorCode::InvalidClient {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(AUTH_REALM));
    }

    response
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            Self::OAuth(err) => oauth_error_response(&err, None),
            Self::LoginRequired(msg) => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody {
                    error: "login_required".to_string(),
                    error_description: msg,
                    state: None,
                }),
            )
                .into_response(),
            Self::Database(_) => {
                tracing::error!(error = %self, "internal error");
                oauth_error_response(&OAuthError::ServerError(self.to_string()), None)
            }
        }
    }
}
