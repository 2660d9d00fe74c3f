//! Token issuance.
//!
//! Access tokens (and ID tokens) are HS256 JWTs; refresh tokens are opaque
//! random strings stored server-side.

use std::sync::Arc;

use gatehouse_common::{crypto, current_timestamp, jwt};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::{OAuthError, Result};
use crate::scope::join_scopes;
use crate::storage::User;

/// Default access token lifetime in seconds (30 minutes).
pub const ACCESS_TOKEN_LIFETIME_SECS: u64 = 30 * 60;

/// Default refresh token lifetime in seconds (30 days).
pub const REFRESH_TOKEN_LIFETIME_SECS: u64 = 30 * 24 * 3600;

/// Token issuance settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// `iss` claim of issued tokens.
    pub issuer: String,
    /// `aud` claim of issued tokens.
    pub audience: String,
    /// Access token lifetime in seconds.
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds.
    pub refresh_token_lifetime_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: "gatehouse".to_string(),
            audience: "gatehouse-api".to_string(),
            access_token_lifetime_secs: ACCESS_TOKEN_LIFETIME_SECS,
            refresh_token_lifetime_secs: REFRESH_TOKEN_LIFETIME_SECS,
        }
    }
}

/// Claims carried by access and ID tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the user id, or the client id for client tokens.
    pub sub: String,
    /// Username, or the client id for client tokens.
    pub name: String,
    /// User email, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Granted scopes.
    pub scope: Vec<String>,
    /// Client the token was issued to.
    pub client_id: String,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued at time (Unix timestamp).
    pub iat: u64,
    /// Expiration time (Unix timestamp).
    pub exp: u64,
    /// Unique token id.
    pub jti: String,
}

/// Signs token claims.
pub trait TokenSigner: Send + Sync {
    /// Produces a compact JWS for `claims`.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    fn sign(&self, claims: &AccessClaims) -> Result<String>;
}

/// HMAC-SHA256 signer over a shared secret.
pub struct Hs256Signer {
    secret: Vec<u8>,
}

impl Hs256Signer {
    /// Creates a signer from the raw secret bytes.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl TokenSigner for Hs256Signer {
    fn sign(&self, claims: &AccessClaims) -> Result<String> {
        jwt::sign_hs256(claims, &self.secret).map_err(|e| OAuthError::Signing(e.to_string()))
    }
}

/// Refresh token record stored server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// The opaque token value.
    pub token: String,
    /// User the token belongs to.
    pub user_id: i64,
    /// Client the token was issued to.
    pub client_id: String,
    /// Granted scopes, space-separated.
    pub scope: String,
    /// When the token was issued (Unix timestamp).
    pub created_at: u64,
    /// When the token expires (Unix timestamp).
    pub expires_at: u64,
    /// Set once the token has been rotated or revoked.
    pub revoked: bool,
}

impl RefreshTokenRecord {
    /// Checks if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at < current_timestamp()
    }
}

/// Who a token is issued to.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// A user, via the code or refresh grants.
    User(&'a User),
    /// The client itself, via the client credentials grant.
    Client(&'a Client),
}

/// A freshly minted token set, not yet committed.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    /// Signed access token.
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Refresh token to persist, for user tokens.
    pub refresh_token: Option<RefreshTokenRecord>,
    /// ID token, for user grants.
    pub id_token: Option<String>,
    /// Granted scopes.
    pub scopes: Vec<String>,
}

/// Mints access, refresh and ID tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    config: TokenConfig,
    signer: Arc<dyn TokenSigner>,
}

impl TokenIssuer {
    /// Creates an issuer.
    #[must_use]
    pub fn new(config: TokenConfig, signer: Arc<dyn TokenSigner>) -> Self {
        Self { config, signer }
    }

    /// Returns the issuance settings.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Mints a token set for `subject`.
    ///
    /// Users get a refresh token and an ID token carrying the same claims as
    /// the access token. Clients get an access token only. Nothing is
    /// persisted.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn issue(
        &self,
        subject: Subject<'_>,
        client_id: &str,
        scopes: &[String],
    ) -> Result<IssuedTokens> {
        let now = current_timestamp();

        let access_token = self.signer.sign(&self.claims(subject, client_id, scopes, now))?;

        let (refresh_token, id_token) = match subject {
            Subject::User(user) => {
                let refresh = RefreshTokenRecord {
                    token: crypto::generate_token(),
                    user_id: user.id,
                    client_id: client_id.to_string(),
                    scope: join_scopes(scopes),
                    created_at: now,
                    expires_at: now + self.config.refresh_token_lifetime_secs,
                    revoked: false,
                };

                let id_token = self.signer.sign(&self.claims(subject, client_id, scopes, now))?;

                (Some(refresh), Some(id_token))
            }
            Subject::Client(_) => (None, None),
        };

        Ok(IssuedTokens {
            access_token,
            expires_in: self.config.access_token_lifetime_secs,
            refresh_token,
            id_token,
            scopes: scopes.to_vec(),
        })
    }

    fn claims(
        &self,
        subject: Subject<'_>,
        client_id: &str,
        scopes: &[String],
        now: u64,
    ) -> AccessClaims {
        let (sub, name, email) = match subject {
            Subject::User(user) => (user.id.to_string(), user.username.clone(), user.email.clone()),
            Subject::Client(client) => (client.client_id.clone(), client.client_id.clone(), None),
        };

        AccessClaims {
            sub,
            name,
            email,
            scope: scopes.to_vec(),
            client_id: client_id.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now,
            exp: now + self.config.access_token_lifetime_secs,
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Token endpoint success body (RFC 6749 §5.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// The refresh token, for user grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Granted scopes, space-separated, when non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// ID token, for user grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl From<IssuedTokens> for TokenResponse {
    fn from(tokens: IssuedTokens) -> Self {
        let scope = (!tokens.scopes.is_empty()).then(|| join_scopes(&tokens.scopes));

        Self {
            access_token: tokens.access_token,
            token_type: "Bearer".to_string(),
            expires_in: tokens.expires_in,
            refresh_token: tokens.refresh_token.map(|r| r.token),
            scope,
            id_token: tokens.id_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::GrantType;

    const SECRET: &[u8] = b"test-signing-key-with-enough-bytes";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(TokenConfig::default(), Arc::new(Hs256Signer::new(SECRET)))
    }

    fn alice() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            active: true,
        }
    }

    fn scopes(s: &str) -> Vec<String> {
        crate::scope::parse_scopes(s)
    }

    #[test]
    fn test_user_tokens_carry_claims() {
        let user = alice();
        let issued = issuer()
            .issue(Subject::User(&user), "webapp", &scopes("openid profile"))
            .unwrap();

        let claims: AccessClaims =
            jwt::verify_hs256_for_audience(&issued.access_token, SECRET, "gatehouse-api").unwrap();

        assert_eq!(claims.sub, "1");
        assert_eq!(claims.name, "alice");
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert_eq!(claims.scope, vec!["openid", "profile"]);
        assert_eq!(claims.client_id, "webapp");
        assert_eq!(claims.iss, "gatehouse");
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_LIFETIME_SECS);

        let refresh = issued.refresh_token.unwrap();
        assert_eq!(refresh.user_id, 1);
        assert_eq!(refresh.scope, "openid profile");
        assert!(!refresh.revoked);
        assert_eq!(refresh.expires_at - refresh.created_at, REFRESH_TOKEN_LIFETIME_SECS);

        assert!(issued.id_token.is_some());
    }

    #[test]
    fn test_id_token_for_every_user_grant() {
        let user = alice();
        let issued = issuer()
            .issue(Subject::User(&user), "webapp", &scopes("profile email"))
            .unwrap();

        let id_token = issued.id_token.unwrap();
        let claims: AccessClaims =
            jwt::verify_hs256_for_audience(&id_token, SECRET, "gatehouse-api").unwrap();
        assert_eq!(claims.sub, "1");
        assert_eq!(claims.scope, vec!["profile", "email"]);
        assert!(issued.refresh_token.is_some());
    }

    #[test]
    fn test_client_tokens_have_no_refresh() {
        let client = Client {
            client_id: "svc".to_string(),
            client_name: "Service".to_string(),
            secret_hash: None,
            require_client_secret: true,
            allowed_grant_types: vec![GrantType::ClientCredentials],
            redirect_uris: Vec::new(),
            enabled: true,
            require_pkce: false,
        };

        let issued = issuer()
            .issue(Subject::Client(&client), "svc", &scopes("openid"))
            .unwrap();

        let claims: AccessClaims =
            jwt::verify_hs256_for_audience(&issued.access_token, SECRET, "gatehouse-api").unwrap();
        assert_eq!(claims.sub, "svc");
        assert_eq!(claims.name, "svc");
        assert!(claims.email.is_none());

        assert!(issued.refresh_token.is_none());
        assert!(issued.id_token.is_none());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let user = alice();
        let issued = issuer()
            .issue(Subject::User(&user), "webapp", &scopes("profile"))
            .unwrap();

        let result: std::result::Result<AccessClaims, _> =
            jwt::verify_hs256_for_audience(&issued.access_token, SECRET, "someone-else");
        assert!(result.is_err());
    }

    #[test]
    fn test_token_response_shape() {
        let user = alice();
        let issued = issuer()
            .issue(Subject::User(&user), "webapp", &scopes("openid email"))
            .unwrap();

        let response = TokenResponse::from(issued);
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, ACCESS_TOKEN_LIFETIME_SECS);
        assert_eq!(response.scope.as_deref(), Some("openid email"));

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("refresh_token").is_some());
        assert!(json.get("id_token").is_some());
    }

    #[test]
    fn test_empty_scope_omitted() {
        let user = alice();
        let issued = issuer().issue(Subject::User(&user), "webapp", &[]).unwrap();

        let json = serde_json::to_value(TokenResponse::from(issued)).unwrap();
        assert!(json.get("scope").is_none());
        assert!(json.get("id_token").is_some());
    }
}
