//! Development data for a fresh database.

use gatehouse_common::crypto;
use gatehouse_oauth::{Client, GrantType, Scope};

use crate::error::Result;
use crate::storage::SqliteStorage;

/// Identifier of the seeded confidential client.
pub const DEMO_CLIENT_ID: &str = "webapp";
/// Plaintext secret of the seeded client.
pub const DEMO_CLIENT_SECRET: &str = "webapp_secret";
/// Redirect URI registered for the seeded client.
pub const DEMO_REDIRECT_URI: &str = "https://localhost:5001/callback";
/// Username of the seeded resource owner.
pub const DEMO_USERNAME: &str = "demo";

const CATALOGUE: &[(&str, &str, &str)] = &[
    ("openid", "OpenID", "OpenID Connect scope for authentication"),
    ("profile", "User Profile", "Access to user profile information"),
    ("email", "Email Address", "Access to user email address"),
    ("address", "Physical Address", "Access to user physical address"),
    ("phone", "Phone Number", "Access to user phone number"),
    ("offline_access", "Offline Access", "Access to refresh tokens for offline access"),
];

const DEMO_CLIENT_SCOPES: &[&str] = &["openid", "profile", "email"];

/// What [`seed_demo`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Data was written; carries the demo user's id.
    Seeded {
        /// Id of the demo user.
        user_id: i64,
    },
    /// The demo client already existed, nothing was written.
    AlreadySeeded,
}

/// Seeds the scope catalogue, a demo user and the `webapp` client.
///
/// Does nothing if the demo client is already registered, so running it
/// against an initialised database is harmless.
///
/// # Errors
/// Returns an error if any insert fails.
pub fn seed_demo(storage: &SqliteStorage) -> Result<SeedOutcome> {
    if storage.client_exists(DEMO_CLIENT_ID)? {
        tracing::info!("demo data already present, skipping seeding");
        return Ok(SeedOutcome::AlreadySeeded);
    }

    for (name, display_name, description) in CATALOGUE {
        storage.create_scope(&Scope {
            name: (*name).to_string(),
            display_name: (*display_name).to_string(),
            description: Some((*description).to_string()),
        })?;
    }
    tracing::info!(count = CATALOGUE.len(), "seeded scopes");

    let user_id = match storage.find_user_id(DEMO_USERNAME)? {
        Some(id) => id,
        None => storage.create_user(DEMO_USERNAME, Some("demo@example.com"))?,
    };
    tracing::info!(user_id, username = DEMO_USERNAME, "seeded demo user");

    storage.create_client(&Client {
        client_id: DEMO_CLIENT_ID.to_string(),
        client_name: "Test Web Application".to_string(),
        secret_hash: Some(crypto::hash_client_secret(DEMO_CLIENT_SECRET)),
        require_client_secret: true,
        allowed_grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
        redirect_uris: vec![DEMO_REDIRECT_URI.to_string()],
        enabled: true,
        require_pkce: false,
    })?;
    for scope in DEMO_CLIENT_SCOPES {
        storage.allow_client_scope(DEMO_CLIENT_ID, scope)?;
    }
    tracing::info!(
        client_id = DEMO_CLIENT_ID,
        "seeded client (client_secret = {DEMO_CLIENT_SECRET})"
    );

    Ok(SeedOutcome::Seeded { user_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_oauth::OAuthStorage;

    #[tokio::test]
    async fn test_seed_demo() {
        let storage = SqliteStorage::in_memory().unwrap();
        let SeedOutcome::Seeded { user_id } = seed_demo(&storage).unwrap() else {
            panic!("expected a fresh seed");
        };

        assert_eq!(storage.list_scopes().await.unwrap().len(), CATALOGUE.len());

        let client = storage.get_client(DEMO_CLIENT_ID).await.unwrap().unwrap();
        assert!(client.has_redirect_uri(DEMO_REDIRECT_URI));
        assert!(crypto::verify_client_secret(
            DEMO_CLIENT_SECRET,
            client.secret_hash.as_deref().unwrap()
        ));

        let allowed: Vec<String> = storage
            .get_client_scopes(DEMO_CLIENT_ID)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(allowed.len(), 3);
        assert!(!allowed.contains(&"offline_access".to_string()));

        let user = storage.get_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.username, DEMO_USERNAME);
        assert!(user.active);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let storage = SqliteStorage::in_memory().unwrap();
        seed_demo(&storage).unwrap();
        assert_eq!(seed_demo(&storage).unwrap(), SeedOutcome::AlreadySeeded);
    }
}
