//! OAuth storage trait and data types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::code::AuthorizationCode;
use crate::consent::UserConsent;
use crate::error::Result;
use crate::scope::Scope;
use crate::tokens::RefreshTokenRecord;

/// A resource owner, as far as the protocol engine needs to know it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Numeric user id.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Email address, if known.
    pub email: Option<String>,
    /// Inactive users cannot redeem codes or refresh tokens.
    pub active: bool,
}

/// Storage trait for OAuth data.
///
/// Implementations must be thread-safe and handle concurrent access. The
/// `redeem_*`/`rotate_*` methods are the only mutations on the token path
/// and must be atomic: of two concurrent calls for the same value, exactly
/// one may return `true`.
#[async_trait]
pub trait OAuthStorage: Send + Sync {
    // Clients and scopes

    /// Retrieves a non-deleted client by its identifier.
    async fn get_client(&self, client_id: &str) -> Result<Option<Client>>;

    /// Retrieves the scopes a client is allowed to request.
    async fn get_client_scopes(&self, client_id: &str) -> Result<Vec<Scope>>;

    /// Retrieves the global scope catalogue.
    async fn list_scopes(&self) -> Result<Vec<Scope>>;

    // Users

    /// Retrieves a user by id.
    async fn get_user(&self, user_id: i64) -> Result<Option<User>>;

    // Authorization codes

    /// Saves a newly issued authorization code.
    async fn save_auth_code(&self, code: AuthorizationCode) -> Result<()>;

    /// Retrieves an authorization code by value, used or not.
    async fn get_auth_code(&self, code: &str) -> Result<Option<AuthorizationCode>>;

    /// Marks a code used and stores the refresh token issued for it, as one
    /// unit of work.
    ///
    /// Returns `false` without writing anything if the code is unknown or
    /// was already used.
    async fn redeem_auth_code(
        &self,
        code: &str,
        refresh_token: Option<RefreshTokenRecord>,
    ) -> Result<bool>;

    // Refresh tokens

    /// Retrieves a refresh token by value. Revoked tokens are never returned.
    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>>;

    /// Revokes a refresh token and stores its replacement, as one unit of
    /// work.
    ///
    /// Returns `false` without writing anything if the token is unknown or
    /// was already revoked.
    async fn rotate_refresh_token(
        &self,
        token: &str,
        replacement: Option<RefreshTokenRecord>,
    ) -> Result<bool>;

    // Consent

    /// Retrieves the consent record for a (user, client) pair.
    async fn get_consent(&self, user_id: i64, client_id: &str) -> Result<Option<UserConsent>>;

    /// Records consent, replacing any earlier record for the same pair.
    async fn save_consent(&self, consent: UserConsent) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_roundtrips_through_json() {
        let user = User {
            id: 7,
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            active: true,
        };

        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();

        assert_eq!(back, user);
    }
}
