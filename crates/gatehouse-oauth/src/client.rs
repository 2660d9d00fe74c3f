//! Registered clients and client validation.

use gatehouse_common::crypto;
use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, Result};
use crate::protocol::GrantType;
use crate::storage::OAuthStorage;

/// A registered OAuth client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Public client identifier.
    pub client_id: String,
    /// Human-readable name shown on the consent screen.
    pub client_name: String,
    /// SHA-256 hex digest of the client secret, if one was issued.
    pub secret_hash: Option<String>,
    /// Whether token requests must present the secret.
    pub require_client_secret: bool,
    /// Grant types this client may use.
    pub allowed_grant_types: Vec<GrantType>,
    /// Registered redirect URIs, matched exactly.
    pub redirect_uris: Vec<String>,
    /// Disabled clients are rejected everywhere.
    pub enabled: bool,
    /// Whether authorization requests must carry a PKCE challenge.
    pub require_pkce: bool,
}

impl Client {
    /// Checks if `grant` is among the client's allowed grant types.
    #[must_use]
    pub fn allows_grant(&self, grant: GrantType) -> bool {
        self.allowed_grant_types.contains(&grant)
    }

    /// Checks if `redirect_uri` is registered for this client.
    ///
    /// The comparison is ordinal: no normalisation, no prefix matching.
    #[must_use]
    pub fn has_redirect_uri(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.iter().any(|uri| uri == redirect_uri)
    }
}

/// Resolves the client named by an authorization request.
///
/// Missing, deleted and disabled clients are all `unauthorized_client`,
/// as is a client that may not use the authorization code grant. A
/// redirect URI that is not registered is `invalid_request`.
///
/// # Errors
/// Returns an error if the client may not start an authorization here.
pub async fn validate_authorize_client<S>(
    storage: &S,
    client_id: &str,
    redirect_uri: &str,
) -> Result<Client>
where
    S: OAuthStorage + ?Sized,
{
    let client = storage
        .get_client(client_id)
        .await?
        .filter(|c| c.enabled)
        .ok_or_else(|| OAuthError::UnauthorizedClient("unknown or disabled client".into()))?;

    if !client.has_redirect_uri(redirect_uri) {
        return Err(OAuthError::InvalidRequest("invalid redirect_uri".into()));
    }

    ensure_grant_allowed(&client, GrantType::AuthorizationCode)?;

    Ok(client)
}

/// Authenticates the client presenting a token request.
///
/// Every failure is `invalid_client`: a missing or unknown id, a disabled
/// client, or a missing or wrong secret when the client requires one.
///
/// # Errors
/// Returns an error if authentication fails.
pub async fn authenticate_client<S>(
    storage: &S,
    client_id: Option<&str>,
    client_secret: Option<&str>,
) -> Result<Client>
where
    S: OAuthStorage + ?Sized,
{
    let client_id = client_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| OAuthError::InvalidClient("client_id is required".into()))?;

    let client = storage
        .get_client(client_id)
        .await?
        .filter(|c| c.enabled)
        .ok_or_else(|| OAuthError::InvalidClient("unknown or disabled client".into()))?;

    if client.require_client_secret {
        let presented = client_secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| OAuthError::InvalidClient("client_secret is required".into()))?;

        let valid = client
            .secret_hash
            .as_deref()
            .is_some_and(|hash| crypto::verify_client_secret(presented, hash));

        if !valid {
            return Err(OAuthError::InvalidClient("invalid client credentials".into()));
        }
    }

    Ok(client)
}

/// Checks that a client may use `grant`.
///
/// # Errors
/// Returns `unauthorized_client` if the grant is not allowed.
pub fn ensure_grant_allowed(client: &Client, grant: GrantType) -> Result<()> {
    if client.allows_grant(grant) {
        Ok(())
    } else {
        Err(OAuthError::UnauthorizedClient(format!(
            "client is not allowed to use the {grant} grant"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::memory::MemoryStorage;

    fn webapp() -> Client {
        Client {
            client_id: "webapp".to_string(),
            client_name: "Web App".to_string(),
            secret_hash: Some(crypto::hash_client_secret("webapp_secret")),
            require_client_secret: true,
            allowed_grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            redirect_uris: vec!["https://localhost:5001/callback".to_string()],
            enabled: true,
            require_pkce: false,
        }
    }

    fn storage_with(client: Client) -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.insert_client(client);
        storage
    }

    #[test]
    fn test_redirect_uri_is_ordinal() {
        let client = webapp();

        assert!(client.has_redirect_uri("https://localhost:5001/callback"));
        assert!(!client.has_redirect_uri("https://localhost:5001/callback/"));
        assert!(!client.has_redirect_uri("https://LOCALHOST:5001/callback"));
        assert!(!client.has_redirect_uri("https://localhost:5001/callback?x=1"));
    }

    #[tokio::test]
    async fn test_authorize_client_checks() {
        let storage = storage_with(webapp());

        let ok = validate_authorize_client(&storage, "webapp", "https://localhost:5001/callback")
            .await
            .unwrap();
        assert_eq!(ok.client_name, "Web App");

        let err = validate_authorize_client(&storage, "nobody", "https://localhost:5001/callback")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnauthorizedClient);

        let err = validate_authorize_client(&storage, "webapp", "https://evil.example/callback")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn test_disabled_client_rejected() {
        let mut client = webapp();
        client.enabled = false;
        let storage = storage_with(client);

        let err = validate_authorize_client(&storage, "webapp", "https://localhost:5001/callback")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnauthorizedClient);

        let err = authenticate_client(&storage, Some("webapp"), Some("webapp_secret"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidClient);
    }

    #[tokio::test]
    async fn test_authorize_requires_code_grant() {
        let mut client = webapp();
        client.allowed_grant_types = vec![GrantType::ClientCredentials];
        let storage = storage_with(client);

        let err = validate_authorize_client(&storage, "webapp", "https://localhost:5001/callback")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnauthorizedClient);
    }

    #[tokio::test]
    async fn test_authenticate_client_secret() {
        let storage = storage_with(webapp());

        assert!(authenticate_client(&storage, Some("webapp"), Some("webapp_secret"))
            .await
            .is_ok());

        for (id, secret) in [
            (Some("webapp"), Some("wrong")),
            (Some("webapp"), None),
            (Some("webapp"), Some("")),
            (None, Some("webapp_secret")),
            (Some("unknown"), Some("webapp_secret")),
        ] {
            let err = authenticate_client(&storage, id, secret).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidClient);
        }
    }

    #[tokio::test]
    async fn test_public_client_needs_no_secret() {
        let mut client = webapp();
        client.secret_hash = None;
        client.require_client_secret = false;
        let storage = storage_with(client);

        assert!(authenticate_client(&storage, Some("webapp"), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_required_secret_without_stored_hash_fails() {
        let mut client = webapp();
        client.secret_hash = None;
        let storage = storage_with(client);

        let err = authenticate_client(&storage, Some("webapp"), Some("anything"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidClient);
    }

    #[test]
    fn test_ensure_grant_allowed() {
        let client = webapp();

        assert!(ensure_grant_allowed(&client, GrantType::RefreshToken).is_ok());
        let err = ensure_grant_allowed(&client, GrantType::ClientCredentials).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnauthorizedClient);
    }
}
