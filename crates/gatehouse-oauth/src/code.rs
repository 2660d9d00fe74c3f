//! Authorization code issuance.

use gatehouse_common::{crypto, current_timestamp};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pkce::PkceChallenge;
use crate::scope::join_scopes;
use crate::storage::OAuthStorage;

/// Authorization code lifetime in seconds (10 minutes).
pub const AUTH_CODE_LIFETIME_SECS: u64 = 600;

/// Authorization code data stored server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The opaque code value.
    pub code: String,
    /// User who approved the request.
    pub user_id: i64,
    /// Client the code was issued to.
    pub client_id: String,
    /// Redirect URI used in the authorization request.
    pub redirect_uri: String,
    /// Granted scopes, space-separated.
    pub scope: String,
    /// PKCE challenge, if the request carried one.
    pub pkce: Option<PkceChallenge>,
    /// When the code was issued (Unix timestamp).
    pub created_at: u64,
    /// When the code expires (Unix timestamp).
    pub expires_at: u64,
    /// Set once the code has been redeemed.
    pub used: bool,
}

impl AuthorizationCode {
    /// Creates a fresh, unused code valid for [`AUTH_CODE_LIFETIME_SECS`].
    #[must_use]
    pub fn new(
        user_id: i64,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        scopes: &[String],
        pkce: Option<PkceChallenge>,
    ) -> Self {
        let now = current_timestamp();

        Self {
            code: crypto::generate_token(),
            user_id,
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scope: join_scopes(scopes),
            pkce,
            created_at: now,
            expires_at: now + AUTH_CODE_LIFETIME_SECS,
            used: false,
        }
    }

    /// Checks if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at < current_timestamp()
    }
}

/// Issues and persists a new authorization code.
///
/// # Errors
/// Returns an error if the code cannot be saved.
pub async fn issue_code<S>(
    storage: &S,
    user_id: i64,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[String],
    pkce: Option<PkceChallenge>,
) -> Result<AuthorizationCode>
where
    S: OAuthStorage + ?Sized,
{
    let code = AuthorizationCode::new(user_id, client_id, redirect_uri, scopes, pkce);
    storage.save_auth_code(code.clone()).await?;

    tracing::debug!(client_id, user_id, "issued authorization code");

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;

    #[test]
    fn test_new_code_is_fresh() {
        let scopes = vec!["openid".to_string(), "profile".to_string()];
        let code = AuthorizationCode::new(1, "webapp", "https://app/cb", &scopes, None);

        assert_eq!(code.scope, "openid profile");
        assert!(!code.used);
        assert!(!code.is_expired());
        assert_eq!(code.expires_at - code.created_at, AUTH_CODE_LIFETIME_SECS);
        assert_eq!(code.code.len(), 43);
    }

    #[test]
    fn test_codes_are_unique() {
        let a = AuthorizationCode::new(1, "webapp", "https://app/cb", &[], None);
        let b = AuthorizationCode::new(1, "webapp", "https://app/cb", &[], None);
        assert_ne!(a.code, b.code);
    }

    #[tokio::test]
    async fn test_issue_code_persists() {
        let storage = MemoryStorage::new();
        let scopes = vec!["openid".to_string()];

        let issued = issue_code(&storage, 3, "webapp", "https://app/cb", &scopes, None)
            .await
            .unwrap();
        let stored = storage.get_auth_code(&issued.code).await.unwrap().unwrap();

        assert_eq!(stored, issued);
    }
}
