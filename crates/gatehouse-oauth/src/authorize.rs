//! Authorization endpoint types.
//!
//! The request processor itself lives on
//! [`OAuthProvider::authorize`](crate::provider::OAuthProvider::authorize).

use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

use crate::error::OAuthError;

/// Authorization request parameters (RFC 6749 §4.1.1).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationRequest {
    /// Must be `code`.
    #[serde(default)]
    pub response_type: String,
    /// Client identifier.
    #[serde(default)]
    pub client_id: String,
    /// Redirect URI, matched exactly against the registered ones.
    #[serde(default)]
    pub redirect_uri: String,
    /// Space-separated requested scopes.
    #[serde(default)]
    pub scope: String,
    /// Opaque client state, echoed back unchanged.
    pub state: Option<String>,
    /// PKCE challenge.
    pub code_challenge: Option<String>,
    /// PKCE method, `plain` when absent.
    pub code_challenge_method: Option<String>,
}

/// Successful result of an authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AuthorizeOutcome {
    /// Consent was already on file; a code was issued.
    Redirect {
        /// Registered redirect URI carrying `code` and `state`.
        redirect_uri: String,
    },
    /// The user must approve the listed scopes first.
    Consent {
        /// Client display name.
        client_name: String,
        /// Canonical scopes awaiting approval.
        scopes: Vec<String>,
        /// Echoed client state.
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
}

/// A failed authorization request.
///
/// `redirect_uri` is set only once the URI has been matched against the
/// client's registrations; before that the error must not be sent there.
#[derive(Debug)]
pub struct AuthorizeRejection {
    /// What went wrong.
    pub error: OAuthError,
    /// Validated redirect URI, if validation got that far.
    pub redirect_uri: Option<String>,
    /// Echoed client state.
    pub state: Option<String>,
}

impl AuthorizeRejection {
    /// A rejection that cannot be delivered to the client's redirect URI.
    #[must_use]
    pub fn direct(error: OAuthError, state: Option<String>) -> Self {
        Self {
            error,
            redirect_uri: None,
            state,
        }
    }

    /// A rejection that may be delivered to a validated redirect URI.
    #[must_use]
    pub fn redirectable(error: OAuthError, redirect_uri: &str, state: Option<String>) -> Self {
        Self {
            error,
            redirect_uri: Some(redirect_uri.to_string()),
            state,
        }
    }

    /// Builds the error redirect, if this rejection may be redirected.
    ///
    /// Only absolute `http`/`https` URIs receive errors; anything else is
    /// reported directly.
    #[must_use]
    pub fn redirect_location(&self) -> Option<String> {
        let redirect_uri = self.redirect_uri.as_deref()?;
        let url = Url::parse(redirect_uri).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        let mut pairs = vec![
            ("error", self.error.code().as_str()),
            ("error_description", self.error.description()),
        ];
        if let Some(state) = &self.state {
            pairs.push(("state", state));
        }

        Some(append_query(redirect_uri, &pairs))
    }
}

/// Appends the issued code and the echoed state to a redirect URI.
///
/// The registered URI is kept byte-for-byte; only the encoded parameters are
/// added.
#[must_use]
pub fn code_redirect(redirect_uri: &str, code: &str, state: Option<&str>) -> String {
    let mut pairs = vec![("code", code)];
    if let Some(state) = state {
        pairs.push(("state", state));
    }
    append_query(redirect_uri, &pairs)
}

/// Adds form-encoded `pairs` to the query of `uri`, before any fragment.
fn append_query(uri: &str, pairs: &[(&str, &str)]) -> String {
    let (base, fragment) = match uri.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (uri, None),
    };

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();

    let separator = match base.find('?') {
        None => "?",
        Some(_) if base.ends_with('?') || base.ends_with('&') => "",
        Some(_) => "&",
    };

    let mut location = format!("{base}{separator}{encoded}");
    if let Some(fragment) = fragment {
        location.push('#');
        location.push_str(fragment);
    }
    location
}
