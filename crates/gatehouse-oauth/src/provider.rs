//! OAuth 2.0 provider implementation.

use std::sync::Arc;

use crate::authorize::{code_redirect, AuthorizationRequest, AuthorizeOutcome, AuthorizeRejection};
use crate::client::{self, Client};
use crate::code;
use crate::consent;
use crate::error::{ErrorCode, OAuthError, Result};
use crate::exchange::{self, TokenRequest};
use crate::pkce;
use crate::protocol::{GrantType, ResponseType};
use crate::scope::{parse_scopes, validate_scopes};
use crate::storage::OAuthStorage;
use crate::tokens::{TokenConfig, TokenIssuer, TokenResponse, TokenSigner};

/// OAuth 2.0 authorization server.
pub struct OAuthProvider<S: OAuthStorage> {
    storage: S,
    issuer: TokenIssuer,
}

impl<S: OAuthStorage> OAuthProvider<S> {
    /// Creates a new OAuth provider.
    #[must_use]
    pub fn new(storage: S, config: TokenConfig, signer: Arc<dyn TokenSigner>) -> Self {
        Self {
            storage,
            issuer: TokenIssuer::new(config, signer),
        }
    }

    /// Returns the underlying storage.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the token issuance settings.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        self.issuer.config()
    }

    /// Processes an authorization request for an authenticated user.
    ///
    /// Gates run in order: response type, client and redirect URI, PKCE
    /// parameters, scopes, then consent. A code is issued only when consent
    /// already covers the validated scopes.
    ///
    /// # Errors
    /// Returns a rejection carrying the OAuth error. Once the redirect URI
    /// has been validated the rejection also carries it, except for
    /// `server_error`, which is always reported directly.
    pub async fn authorize(
        &self,
        request: &AuthorizationRequest,
        user_id: i64,
    ) -> std::result::Result<AuthorizeOutcome, AuthorizeRejection> {
        let state = request.state.clone().filter(|s| !s.is_empty());

        let client = self
            .authorize_client(request)
            .await
            .map_err(|e| reject(AuthorizeRejection::direct(e, state.clone()), &request.client_id))?;

        let result = self
            .authorize_for_client(request, &client, user_id, state.clone())
            .await;

        result.map_err(|e| {
            // internal failures never travel to the client
            let rejection = if e.code() == ErrorCode::ServerError {
                AuthorizeRejection::direct(e, state)
            } else {
                AuthorizeRejection::redirectable(e, &request.redirect_uri, state)
            };
            reject(rejection, &request.client_id)
        })
    }

    async fn authorize_client(&self, request: &AuthorizationRequest) -> Result<Client> {
        request.response_type.parse::<ResponseType>()?;

        if request.client_id.is_empty() {
            return Err(OAuthError::InvalidRequest("client_id is required".into()));
        }
        if request.redirect_uri.is_empty() {
            return Err(OAuthError::InvalidRequest("redirect_uri is required".into()));
        }

        client::validate_authorize_client(&self.storage, &request.client_id, &request.redirect_uri)
            .await
    }

    async fn authorize_for_client(
        &self,
        request: &AuthorizationRequest,
        client: &Client,
        user_id: i64,
        state: Option<String>,
    ) -> Result<AuthorizeOutcome> {
        let challenge = pkce::parse_challenge(
            client,
            request.code_challenge.as_deref(),
            request.code_challenge_method.as_deref(),
        )?;

        let requested = parse_scopes(&request.scope);
        if requested.is_empty() {
            return Err(OAuthError::InvalidScope("scope is required".into()));
        }
        let scopes = validate_scopes(&self.storage, &client.client_id, &requested).await?;

        if !consent::has_consent(&self.storage, user_id, &client.client_id, &scopes).await? {
            tracing::debug!(client_id = %client.client_id, user_id, "consent required");
            return Ok(AuthorizeOutcome::Consent {
                client_name: client.client_name.clone(),
                scopes,
                state,
            });
        }

        let code = code::issue_code(
            &self.storage,
            user_id,
            &client.client_id,
            &request.redirect_uri,
            &scopes,
            challenge,
        )
        .await?;

        Ok(AuthorizeOutcome::Redirect {
            redirect_uri: code_redirect(&request.redirect_uri, &code.code, state.as_deref()),
        })
    }

    /// Records a user's approval of `scope` for a client.
    ///
    /// The client must be enabled and allowed the authorization code grant,
    /// and every scope must be legal for it. Returns the canonical scopes
    /// that were recorded.
    ///
    /// # Errors
    /// Returns an error if the client or scopes are rejected.
    pub async fn grant_consent(
        &self,
        user_id: i64,
        client_id: &str,
        scope: &str,
    ) -> Result<Vec<String>> {
        let client = self
            .storage
            .get_client(client_id)
            .await?
            .filter(|c| c.enabled)
            .ok_or_else(|| OAuthError::UnauthorizedClient("unknown or disabled client".into()))?;
        client::ensure_grant_allowed(&client, GrantType::AuthorizationCode)?;

        let requested = parse_scopes(scope);
        if requested.is_empty() {
            return Err(OAuthError::InvalidScope("scope is required".into()));
        }
        let scopes = validate_scopes(&self.storage, &client.client_id, &requested).await?;

        consent::grant_consent(&self.storage, user_id, &client.client_id, &scopes).await?;
        Ok(scopes)
    }

    /// Processes a token request.
    ///
    /// The client is authenticated before the grant type is even looked at.
    ///
    /// # Errors
    /// Returns the OAuth error for any rejected request.
    pub async fn token(&self, request: &TokenRequest) -> Result<TokenResponse> {
        let result = self.token_inner(request).await;

        if let Err(e) = &result {
            let client_id = request.client_id.as_deref().unwrap_or_default();
            if e.code() == ErrorCode::ServerError {
                tracing::error!(client_id, grant_type = %request.grant_type, error = %e, "token request failed");
            } else {
                tracing::warn!(client_id, grant_type = %request.grant_type, error = %e, "token request rejected");
            }
        }

        result
    }

    async fn token_inner(&self, request: &TokenRequest) -> Result<TokenResponse> {
        let client = client::authenticate_client(
            &self.storage,
            request.client_id.as_deref(),
            request.client_secret.as_deref(),
        )
        .await?;

        let grant: GrantType = request.grant_type.parse()?;
        client::ensure_grant_allowed(&client, grant)?;

        let issued = match grant {
            GrantType::AuthorizationCode => {
                exchange::authorization_code(&self.storage, &self.issuer, &client, request).await?
            }
            GrantType::RefreshToken => {
                exchange::refresh_token(&self.storage, &self.issuer, &client, request).await?
            }
            GrantType::ClientCredentials => {
                exchange::client_credentials(&self.storage, &self.issuer, &client, request).await?
            }
        };

        Ok(TokenResponse::from(issued))
    }
}

fn reject(rejection: AuthorizeRejection, client_id: &str) -> AuthorizeRejection {
    if rejection.error.code() == ErrorCode::ServerError {
        tracing::error!(client_id, error = %rejection.error, "authorization request failed");
    } else {
        tracing::warn!(client_id, error = %rejection.error, "authorization request rejected");
    }
    rejection
}
