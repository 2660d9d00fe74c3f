//! Token endpoint grants.
//!
//! Each grant validates its inputs, mints tokens without persisting them,
//! then commits through a single atomic storage call. If that commit loses
//! a race the minted tokens are dropped and the request fails.

use serde::Deserialize;

use crate::client::Client;
use crate::error::{OAuthError, Result};
use crate::pkce;
use crate::scope::{parse_scopes, validate_scopes};
use crate::storage::{OAuthStorage, User};
use crate::tokens::{IssuedTokens, Subject, TokenIssuer};

/// Token request parameters (RFC 6749 §4.1.3, §4.4.2, §6).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// Requested grant type.
    #[serde(default)]
    pub grant_type: String,
    /// Client identifier.
    pub client_id: Option<String>,
    /// Client secret.
    pub client_secret: Option<String>,
    /// Authorization code, for `authorization_code`.
    pub code: Option<String>,
    /// Redirect URI the code was issued for.
    pub redirect_uri: Option<String>,
    /// PKCE verifier.
    pub code_verifier: Option<String>,
    /// Refresh token, for `refresh_token`.
    pub refresh_token: Option<String>,
    /// Requested scopes, for `client_credentials`.
    pub scope: Option<String>,
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OAuthError::InvalidRequest(format!("{name} is required")))
}

async fn active_user<S>(storage: &S, user_id: i64) -> Result<User>
where
    S: OAuthStorage + ?Sized,
{
    storage
        .get_user(user_id)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| OAuthError::InvalidGrant("user not found or inactive".into()))
}

/// Redeems an authorization code.
pub(crate) async fn authorization_code<S>(
    storage: &S,
    issuer: &TokenIssuer,
    client: &Client,
    request: &TokenRequest,
) -> Result<IssuedTokens>
where
    S: OAuthStorage + ?Sized,
{
    let code_value = required(request.code.as_deref(), "code")?;
    let redirect_uri = required(request.redirect_uri.as_deref(), "redirect_uri")?;

    let code = storage
        .get_auth_code(code_value)
        .await?
        .ok_or_else(|| OAuthError::InvalidGrant("invalid authorization code".into()))?;

    if code.used {
        tracing::warn!(client_id = %client.client_id, "authorization code replayed");
        return Err(OAuthError::InvalidGrant(
            "authorization code has already been used".into(),
        ));
    }

    if code.is_expired() {
        return Err(OAuthError::InvalidGrant("authorization code expired".into()));
    }

    if code.client_id != client.client_id {
        return Err(OAuthError::InvalidGrant(
            "authorization code was issued to another client".into(),
        ));
    }

    if code.redirect_uri != redirect_uri {
        return Err(OAuthError::InvalidGrant("redirect_uri mismatch".into()));
    }

    if let Some(challenge) = &code.pkce {
        let verifier = request
            .code_verifier
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| OAuthError::InvalidGrant("code_verifier is required".into()))?;
        pkce::verify_challenge(verifier, challenge)?;
    }

    let user = active_user(storage, code.user_id).await?;
    let scopes = parse_scopes(&code.scope);

    let issued = issuer.issue(Subject::User(&user), &client.client_id, &scopes)?;

    if !storage
        .redeem_auth_code(&code.code, issued.refresh_token.clone())
        .await?
    {
        tracing::warn!(client_id = %client.client_id, "authorization code redeemed concurrently");
        return Err(OAuthError::InvalidGrant(
            "authorization code has already been used".into(),
        ));
    }

    tracing::info!(client_id = %client.client_id, user_id = user.id, "authorization code redeemed");
    Ok(issued)
}

/// Rotates a refresh token.
pub(crate) async fn refresh_token<S>(
    storage: &S,
    issuer: &TokenIssuer,
    client: &Client,
    request: &TokenRequest,
) -> Result<IssuedTokens>
where
    S: OAuthStorage + ?Sized,
{
    let token_value = required(request.refresh_token.as_deref(), "refresh_token")?;

    let record = storage
        .get_refresh_token(token_value)
        .await?
        .ok_or_else(|| OAuthError::InvalidGrant("invalid refresh token".into()))?;

    if record.is_expired() {
        return Err(OAuthError::InvalidGrant("refresh token expired".into()));
    }

    if record.client_id != client.client_id {
        return Err(OAuthError::InvalidGrant(
            "refresh token was issued to another client".into(),
        ));
    }

    let user = active_user(storage, record.user_id).await?;
    let scopes = parse_scopes(&record.scope);

    let issued = issuer.issue(Subject::User(&user), &client.client_id, &scopes)?;

    if !storage
        .rotate_refresh_token(&record.token, issued.refresh_token.clone())
        .await?
    {
        tracing::warn!(client_id = %client.client_id, "refresh token rotated concurrently");
        return Err(OAuthError::InvalidGrant("invalid refresh token".into()));
    }

    tracing::info!(client_id = %client.client_id, user_id = user.id, "refresh token rotated");
    Ok(issued)
}

/// Issues a client token.
pub(crate) async fn client_credentials<S>(
    storage: &S,
    issuer: &TokenIssuer,
    client: &Client,
    request: &TokenRequest,
) -> Result<IssuedTokens>
where
    S: OAuthStorage + ?Sized,
{
    let requested = parse_scopes(request.scope.as_deref().unwrap_or_default());
    let scopes = validate_scopes(storage, &client.client_id, &requested).await?;

    let issued = issuer.issue(Subject::Client(client), &client.client_id, &scopes)?;

    tracing::info!(client_id = %client.client_id, "client credentials token issued");
    Ok(issued)
}
