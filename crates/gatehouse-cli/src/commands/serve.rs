//! Authorization server command.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use gatehouse_oauth::{Hs256Signer, OAuthProvider, TokenConfig};
use gatehouse_server::{create_router, AppState, SqliteStorage};

/// Configuration for the authorization server.
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Path to the `SQLite` database.
    pub db_path: String,
    /// Issuer of minted tokens.
    pub issuer: String,
    /// Audience of minted tokens.
    pub audience: String,
    /// HS256 key for access and ID tokens.
    pub signing_key: String,
    /// HS256 key for verifying session tokens.
    pub session_secret: String,
    /// Access token lifetime in seconds.
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds.
    pub refresh_token_lifetime_secs: u64,
}

impl ServerConfig {
    fn token_config(&self) -> TokenConfig {
        TokenConfig {
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            access_token_lifetime_secs: self.access_token_lifetime_secs,
            refresh_token_lifetime_secs: self.refresh_token_lifetime_secs,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.signing_key.is_empty() {
            bail!("signing key is empty; set --signing-key or GATEHOUSE_SIGNING_KEY");
        }
        if self.session_secret.is_empty() {
            bail!("session secret is empty; set --session-secret or GATEHOUSE_SESSION_SECRET");
        }
        Ok(())
    }
}

/// Runs the authorization server.
///
/// # Errors
/// Returns an error if a secret is missing or the server fails to start.
pub async fn run(config: ServerConfig) -> Result<()> {
    config.validate()?;

    let storage = SqliteStorage::open(&config.db_path)?;
    let purged = storage.purge_expired_codes()?;
    if purged > 0 {
        tracing::info!(purged, "removed expired authorization codes");
    }

    let token_config = config.token_config();
    let state = Arc::new(AppState {
        provider: OAuthProvider::new(
            storage,
            token_config,
            Arc::new(Hs256Signer::new(config.signing_key.into_bytes())),
        ),
        session_secret: config.session_secret.into_bytes(),
    });

    // Create router with middleware
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(issuer = %config.issuer, "Gatehouse listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            db_path: ":memory:".to_string(),
            issuer: "https://id.example".to_string(),
            audience: "api".to_string(),
            signing_key: "k".to_string(),
            session_secret: "s".to_string(),
            access_token_lifetime_secs: 60,
            refresh_token_lifetime_secs: 120,
        }
    }

    #[test]
    fn test_validate_requires_secrets() {
        assert!(config().validate().is_ok());

        let mut missing_key = config();
        missing_key.signing_key.clear();
        assert!(missing_key.validate().is_err());

        let mut missing_session = config();
        missing_session.session_secret.clear();
        assert!(missing_session.validate().is_err());
    }

    #[test]
    fn test_token_config() {
        let token_config = config().token_config();
        assert_eq!(token_config.issuer, "https://id.example");
        assert_eq!(token_config.access_token_lifetime_secs, 60);
        assert_eq!(token_config.refresh_token_lifetime_secs, 120);
    }
}
