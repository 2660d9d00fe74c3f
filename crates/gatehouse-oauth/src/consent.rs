//! Consent ledger.
//!
//! One record per (user, client) pair holding the scopes the user approved.
//! A request is covered only if every requested scope is in that set.

use gatehouse_common::current_timestamp;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scope::{join_scopes, parse_scopes};
use crate::storage::OAuthStorage;

/// A user's standing approval for a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConsent {
    /// User who granted consent.
    pub user_id: i64,
    /// Client the consent applies to.
    pub client_id: String,
    /// Approved scopes, space-separated.
    pub scope: String,
    /// When consent was last granted (Unix timestamp).
    pub granted_at: u64,
}

impl UserConsent {
    /// Approved scopes as a list.
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        parse_scopes(&self.scope)
    }

    /// Checks if every requested scope is covered, by exact name.
    #[must_use]
    pub fn covers(&self, requested: &[String]) -> bool {
        let granted = self.scopes();
        requested.iter().all(|s| granted.contains(s))
    }
}

/// Checks whether a user has already consented to `requested` for a client.
///
/// # Errors
/// Returns an error if the ledger cannot be read.
pub async fn has_consent<S>(
    storage: &S,
    user_id: i64,
    client_id: &str,
    requested: &[String],
) -> Result<bool>
where
    S: OAuthStorage + ?Sized,
{
    Ok(storage
        .get_consent(user_id, client_id)
        .await?
        .is_some_and(|consent| consent.covers(requested)))
}

/// Records consent for a (user, client) pair, replacing any earlier record.
///
/// The new scope set overwrites the old one; it does not merge.
///
/// # Errors
/// Returns an error if the ledger cannot be written.
pub async fn grant_consent<S>(
    storage: &S,
    user_id: i64,
    client_id: &str,
    scopes: &[String],
) -> Result<()>
where
    S: OAuthStorage + ?Sized,
{
    storage
        .save_consent(UserConsent {
            user_id,
            client_id: client_id.to_string(),
            scope: join_scopes(scopes),
            granted_at: current_timestamp(),
        })
        .await?;

    tracing::info!(user_id, client_id, "consent granted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;

    fn scopes(s: &str) -> Vec<String> {
        parse_scopes(s)
    }

    #[tokio::test]
    async fn test_no_record_means_no_consent() {
        let storage = MemoryStorage::new();
        assert!(!has_consent(&storage, 1, "webapp", &scopes("openid"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_subset_is_covered() {
        let storage = MemoryStorage::new();
        grant_consent(&storage, 1, "webapp", &scopes("openid profile email"))
            .await
            .unwrap();

        assert!(has_consent(&storage, 1, "webapp", &scopes("openid profile"))
            .await
            .unwrap());
        assert!(has_consent(&storage, 1, "webapp", &scopes("email"))
            .await
            .unwrap());
        assert!(!has_consent(&storage, 1, "webapp", &scopes("openid phone"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_consent_is_per_user_and_client() {
        let storage = MemoryStorage::new();
        grant_consent(&storage, 1, "webapp", &scopes("openid"))
            .await
            .unwrap();

        assert!(!has_consent(&storage, 2, "webapp", &scopes("openid"))
            .await
            .unwrap());
        assert!(!has_consent(&storage, 1, "other", &scopes("openid"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_regrant_replaces() {
        let storage = MemoryStorage::new();
        grant_consent(&storage, 1, "webapp", &scopes("openid profile"))
            .await
            .unwrap();
        grant_consent(&storage, 1, "webapp", &scopes("email"))
            .await
            .unwrap();

        assert!(has_consent(&storage, 1, "webapp", &scopes("email"))
            .await
            .unwrap());
        assert!(!has_consent(&storage, 1, "webapp", &scopes("openid"))
            .await
            .unwrap());
    }

    #[test]
    fn test_covers_is_case_sensitive() {
        let consent = UserConsent {
            user_id: 1,
            client_id: "webapp".to_string(),
            scope: "openid".to_string(),
            granted_at: 0,
        };

        assert!(consent.covers(&scopes("openid")));
        assert!(!consent.covers(&scopes("OpenID")));
        assert!(consent.covers(&[]));
    }
}
