//! Scope parsing and validation.

use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, Result};
use crate::storage::OAuthStorage;

/// A scope in the global catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Canonical scope name.
    pub name: String,
    /// Name shown on the consent screen.
    pub display_name: String,
    /// Longer description, if any.
    pub description: Option<String>,
}

impl Scope {
    /// Creates a scope with the given name and display name.
    #[must_use]
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: None,
        }
    }
}

/// Splits a space-separated scope string.
///
/// Empty segments are dropped and duplicates removed, keeping the first
/// occurrence in request order.
#[must_use]
pub fn parse_scopes(scope: &str) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();
    for s in scope.split(' ').filter(|s| !s.is_empty()) {
        if !scopes.iter().any(|existing| existing == s) {
            scopes.push(s.to_string());
        }
    }
    scopes
}

/// Joins scopes into their space-separated wire form.
#[must_use]
pub fn join_scopes(scopes: &[String]) -> String {
    scopes.join(" ")
}

/// Validates requested scopes against the catalogue and the client's
/// allowed set.
///
/// Matching is case-insensitive. The result uses the catalogue's spelling,
/// keeps request order and holds each scope once. An empty request yields
/// an empty set; callers decide whether that is acceptable.
///
/// # Errors
/// Returns `invalid_scope` naming every offending scope if any is unknown
/// or not allowed for the client.
pub async fn validate_scopes<S>(
    storage: &S,
    client_id: &str,
    requested: &[String],
) -> Result<Vec<String>>
where
    S: OAuthStorage + ?Sized,
{
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let catalogue = storage.list_scopes().await?;

    let mut canonical: Vec<String> = Vec::with_capacity(requested.len());
    let mut unknown: Vec<&str> = Vec::new();
    for name in requested {
        match catalogue.iter().find(|s| s.name.eq_ignore_ascii_case(name)) {
            Some(scope) => {
                if !canonical.contains(&scope.name) {
                    canonical.push(scope.name.clone());
                }
            }
            None => unknown.push(name),
        }
    }

    if !unknown.is_empty() {
        return Err(OAuthError::InvalidScope(format!(
            "unknown scopes: {}",
            unknown.join(", ")
        )));
    }

    let allowed = storage.get_client_scopes(client_id).await?;
    let not_allowed: Vec<&str> = canonical
        .iter()
        .filter(|name| !allowed.iter().any(|s| s.name.eq_ignore_ascii_case(name)))
        .map(String::as_str)
        .collect();

    if !not_allowed.is_empty() {
        return Err(OAuthError::InvalidScope(format!(
            "client not allowed to request: {}",
            not_allowed.join(", ")
        )));
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::memory::MemoryStorage;

    fn storage() -> MemoryStorage {
        let storage = MemoryStorage::new();
        for name in ["openid", "profile", "email", "phone"] {
            storage.insert_scope(Scope::new(name, name));
        }
        for name in ["openid", "profile", "email"] {
            storage.allow_scope("webapp", name);
        }
        storage
    }

    #[test]
    fn test_parse_scopes_dedupes_in_order() {
        assert_eq!(
            parse_scopes("profile openid  profile email"),
            vec!["profile", "openid", "email"]
        );
        assert!(parse_scopes("").is_empty());
        assert!(parse_scopes("   ").is_empty());
    }

    #[test]
    fn test_join_scopes() {
        let scopes = vec!["openid".to_string(), "email".to_string()];
        assert_eq!(join_scopes(&scopes), "openid email");
        assert_eq!(join_scopes(&[]), "");
    }

    #[tokio::test]
    async fn test_validate_canonicalises_case() {
        let storage = storage();
        let requested = parse_scopes("OpenID Profile openid");

        let scopes = validate_scopes(&storage, "webapp", &requested).await.unwrap();

        assert_eq!(scopes, vec!["openid", "profile"]);
    }

    #[tokio::test]
    async fn test_validate_names_unknown_scopes() {
        let storage = storage();
        let requested = parse_scopes("openid admin root");

        let err = validate_scopes(&storage, "webapp", &requested).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidScope);
        assert!(err.description().contains("admin"));
        assert!(err.description().contains("root"));
        assert!(!err.description().contains("openid"));
    }

    #[tokio::test]
    async fn test_validate_names_disallowed_scopes() {
        let storage = storage();
        let requested = parse_scopes("openid phone");

        let err = validate_scopes(&storage, "webapp", &requested).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidScope);
        assert!(err.description().contains("phone"));
    }

    #[tokio::test]
    async fn test_validate_empty_request() {
        let storage = storage();
        let scopes = validate_scopes(&storage, "webapp", &[]).await.unwrap();
        assert!(scopes.is_empty());
    }
}
