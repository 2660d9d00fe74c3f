//! `SQLite` storage adapter for the OAuth engine.
//!
//! Implements the [`OAuthStorage`] trait from gatehouse-oauth using `SQLite`,
//! plus the provisioning calls used by `gatehouse init` and the tests.

use async_trait::async_trait;
use gatehouse_common::current_timestamp;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use gatehouse_oauth::code::AuthorizationCode;
use gatehouse_oauth::consent::UserConsent;
use gatehouse_oauth::pkce::PkceChallenge;
use gatehouse_oauth::tokens::RefreshTokenRecord;
use gatehouse_oauth::{Client, GrantType, OAuthError, OAuthStorage, Scope, User};

use crate::error::Result;

/// `SQLite` storage for clients, scopes, users and OAuth grants.
///
/// Uses a `Mutex` to ensure thread-safe access to the connection.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

fn storage_err(err: rusqlite::Error) -> OAuthError {
    OAuthError::Storage(err.to_string())
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn join_grant_types(grants: &[GrantType]) -> String {
    grants
        .iter()
        .map(|g| g.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_grant_types(value: &str) -> gatehouse_oauth::Result<Vec<GrantType>> {
    value
        .split_whitespace()
        .map(|g| {
            g.parse()
                .map_err(|_| OAuthError::Storage(format!("unknown grant type in database: {g}")))
        })
        .collect()
}

struct ClientRow {
    client: Client,
    grant_types: String,
    redirect_uris: String,
}

fn client_from_row(row: &Row<'_>) -> rusqlite::Result<ClientRow> {
    Ok(ClientRow {
        client: Client {
            client_id: row.get(0)?,
            client_name: row.get(1)?,
            secret_hash: row.get(2)?,
            require_client_secret: row.get::<_, i32>(3)? != 0,
            allowed_grant_types: Vec::new(),
            redirect_uris: Vec::new(),
            enabled: row.get::<_, i32>(6)? != 0,
            require_pkce: row.get::<_, i32>(7)? != 0,
        },
        grant_types: row.get(4)?,
        redirect_uris: row.get(5)?,
    })
}

fn scope_from_row(row: &Row<'_>) -> rusqlite::Result<Scope> {
    Ok(Scope {
        name: row.get(0)?,
        display_name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn refresh_from_row(row: &Row<'_>) -> rusqlite::Result<RefreshTokenRecord> {
    Ok(RefreshTokenRecord {
        token: row.get(0)?,
        user_id: row.get(1)?,
        client_id: row.get(2)?,
        scope: row.get(3)?,
        created_at: to_u64(row.get(4)?),
        expires_at: to_u64(row.get(5)?),
        revoked: row.get::<_, i32>(6)? != 0,
    })
}

fn insert_refresh_token(conn: &Connection, record: &RefreshTokenRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO oauth_refresh_tokens
         (token, user_id, client_id, scope, created_at, expires_at, revoked)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            record.token,
            record.user_id,
            record.client_id,
            record.scope,
            to_i64(record.created_at),
            to_i64(record.expires_at),
            i32::from(record.revoked)
        ],
    )?;
    Ok(())
}

#[allow(clippy::significant_drop_tightening)]
impl SqliteStorage {
    /// Creates a new in-memory storage instance.
    ///
    /// # Errors
    /// Returns an error if database initialization fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Creates a new storage instance with a file path.
    ///
    /// # Errors
    /// Returns an error if database initialization fails.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.lock().execute_batch(
            r"
            PRAGMA foreign_keys = ON;

            -- Registered clients (soft-deleted, never removed)
            CREATE TABLE IF NOT EXISTS clients (
                client_id TEXT PRIMARY KEY,
                client_name TEXT NOT NULL,
                secret_hash TEXT,
                require_client_secret INTEGER NOT NULL DEFAULT 1,
                allowed_grant_types TEXT NOT NULL,
                redirect_uris TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                require_pkce INTEGER NOT NULL DEFAULT 0,
                deleted INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );

            -- Global scope catalogue
            CREATE TABLE IF NOT EXISTS scopes (
                name TEXT PRIMARY KEY COLLATE NOCASE,
                display_name TEXT NOT NULL,
                description TEXT,
                deleted INTEGER NOT NULL DEFAULT 0
            );

            -- Scopes each client may request
            CREATE TABLE IF NOT EXISTS client_scopes (
                client_id TEXT NOT NULL REFERENCES clients(client_id),
                scope_name TEXT NOT NULL REFERENCES scopes(name),
                PRIMARY KEY (client_id, scope_name)
            );

            -- Resource owners
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL
            );

            -- Authorization codes (short-lived, one-time use)
            CREATE TABLE IF NOT EXISTS oauth_codes (
                code TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                client_id TEXT NOT NULL,
                redirect_uri TEXT NOT NULL,
                scope TEXT NOT NULL,
                code_challenge TEXT,
                code_challenge_method TEXT,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                used INTEGER NOT NULL DEFAULT 0
            );

            -- Refresh tokens (rotated, revocation is one-way)
            CREATE TABLE IF NOT EXISTS oauth_refresh_tokens (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                client_id TEXT NOT NULL,
                scope TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                revoked INTEGER NOT NULL DEFAULT 0
            );

            -- One consent record per (user, client)
            CREATE TABLE IF NOT EXISTS user_consents (
                user_id INTEGER NOT NULL,
                client_id TEXT NOT NULL,
                scope TEXT NOT NULL,
                granted_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, client_id)
            );

            CREATE INDEX IF NOT EXISTS idx_oauth_codes_expires ON oauth_codes(expires_at);
            CREATE INDEX IF NOT EXISTS idx_oauth_refresh_user ON oauth_refresh_tokens(user_id, client_id);
            ",
        )?;

        Ok(())
    }

    /// Adds a scope to the global catalogue.
    ///
    /// # Errors
    /// Returns an error if a scope with the same name exists.
    pub fn create_scope(&self, scope: &Scope) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO scopes (name, display_name, description) VALUES (?, ?, ?)",
            params![scope.name, scope.display_name, scope.description],
        )?;
        Ok(())
    }

    /// Registers a client.
    ///
    /// # Errors
    /// Returns an error if the client id is taken.
    pub fn create_client(&self, client: &Client) -> Result<()> {
        let redirect_uris = serde_json::to_string(&client.redirect_uris)
            .map_err(|e| crate::error::ServerError::Database(e.to_string()))?;

        self.conn.lock().execute(
            "INSERT INTO clients
             (client_id, client_name, secret_hash, require_client_secret, allowed_grant_types,
              redirect_uris, enabled, require_pkce, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                client.client_id,
                client.client_name,
                client.secret_hash,
                i32::from(client.require_client_secret),
                join_grant_types(&client.allowed_grant_types),
                redirect_uris,
                i32::from(client.enabled),
                i32::from(client.require_pkce),
                to_i64(current_timestamp())
            ],
        )?;
        Ok(())
    }

    /// Returns true if a client with this id was ever registered, including
    /// soft-deleted ones.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn client_exists(&self, client_id: &str) -> Result<bool> {
        let found: Option<i32> = self
            .conn
            .lock()
            .query_row(
                "SELECT 1 FROM clients WHERE client_id = ?",
                params![client_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Enables or disables a client.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn set_client_enabled(&self, client_id: &str, enabled: bool) -> Result<()> {
        self.conn.lock().execute(
            "UPDATE clients SET enabled = ? WHERE client_id = ?",
            params![i32::from(enabled), client_id],
        )?;
        Ok(())
    }

    /// Soft-deletes a client.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn delete_client(&self, client_id: &str) -> Result<()> {
        self.conn.lock().execute(
            "UPDATE clients SET deleted = 1 WHERE client_id = ?",
            params![client_id],
        )?;
        Ok(())
    }

    /// Allows a client to request a catalogue scope.
    ///
    /// # Errors
    /// Returns an error if the client or scope does not exist.
    pub fn allow_client_scope(&self, client_id: &str, scope_name: &str) -> Result<()> {
        self.conn.lock().execute(
            "INSERT OR IGNORE INTO client_scopes (client_id, scope_name)
             SELECT ?, name FROM scopes WHERE name = ?",
            params![client_id, scope_name],
        )?;
        Ok(())
    }

    /// Creates an active user and returns its id.
    ///
    /// # Errors
    /// Returns an error if the username is taken.
    pub fn create_user(&self, username: &str, email: Option<&str>) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (username, email, active, created_at) VALUES (?, ?, 1, ?)",
            params![username, email, to_i64(current_timestamp())],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Activates or deactivates a user.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn set_user_active(&self, user_id: i64, active: bool) -> Result<()> {
        self.conn.lock().execute(
            "UPDATE users SET active = ? WHERE id = ?",
            params![i32::from(active), user_id],
        )?;
        Ok(())
    }

    /// Looks up a user id by username.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_user_id(&self, username: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .lock()
            .query_row(
                "SELECT id FROM users WHERE username = ?",
                params![username],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Deletes expired authorization codes. Returns the number removed.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub fn purge_expired_codes(&self) -> Result<usize> {
        Ok(self.conn.lock().execute(
            "DELETE FROM oauth_codes WHERE expires_at < ?",
            params![to_i64(current_timestamp())],
        )?)
    }
}

#[async_trait]
impl OAuthStorage for SqliteStorage {
    // Clients and scopes

    async fn get_client(&self, client_id: &str) -> gatehouse_oauth::Result<Option<Client>> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT client_id, client_name, secret_hash, require_client_secret,
                        allowed_grant_types, redirect_uris, enabled, require_pkce
                 FROM clients WHERE client_id = ? AND deleted = 0",
                params![client_id],
                client_from_row,
            )
            .optional()
            .map_err(storage_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut client = row.client;
        client.allowed_grant_types = parse_grant_types(&row.grant_types)?;
        client.redirect_uris = serde_json::from_str(&row.redirect_uris)
            .map_err(|e| OAuthError::Storage(format!("invalid redirect_uris: {e}")))?;

        Ok(Some(client))
    }

    async fn get_client_scopes(&self, client_id: &str) -> gatehouse_oauth::Result<Vec<Scope>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT s.name, s.display_name, s.description
                 FROM scopes s JOIN client_scopes cs ON cs.scope_name = s.name
                 WHERE cs.client_id = ? AND s.deleted = 0
                 ORDER BY s.name",
            )
            .map_err(storage_err)?;

        let scopes = stmt
            .query_map(params![client_id], scope_from_row)
            .map_err(storage_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_err)?;

        Ok(scopes)
    }

    async fn list_scopes(&self) -> gatehouse_oauth::Result<Vec<Scope>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT name, display_name, description FROM scopes WHERE deleted = 0 ORDER BY name")
            .map_err(storage_err)?;

        let scopes = stmt
            .query_map([], scope_from_row)
            .map_err(storage_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_err)?;

        Ok(scopes)
    }

    // Users

    async fn get_user(&self, user_id: i64) -> gatehouse_oauth::Result<Option<User>> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, username, email, active FROM users WHERE id = ?",
                params![user_id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        active: row.get::<_, i32>(3)? != 0,
                    })
                },
            )
            .optional()
            .map_err(storage_err)
    }

    // Authorization codes

    async fn save_auth_code(&self, code: AuthorizationCode) -> gatehouse_oauth::Result<()> {
        let (challenge, method) = match &code.pkce {
            Some(pkce) => (Some(pkce.challenge.as_str()), Some(pkce.method.as_str())),
            None => (None, None),
        };

        self.conn
            .lock()
            .execute(
                "INSERT INTO oauth_codes
                 (code, user_id, client_id, redirect_uri, scope, code_challenge,
                  code_challenge_method, created_at, expires_at, used)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    code.code,
                    code.user_id,
                    code.client_id,
                    code.redirect_uri,
                    code.scope,
                    challenge,
                    method,
                    to_i64(code.created_at),
                    to_i64(code.expires_at),
                    i32::from(code.used)
                ],
            )
            .map_err(storage_err)?;
        Ok(())
    }

    async fn get_auth_code(&self, code: &str) -> gatehouse_oauth::Result<Option<AuthorizationCode>> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT code, user_id, client_id, redirect_uri, scope, code_challenge,
                        code_challenge_method, created_at, expires_at, used
                 FROM oauth_codes WHERE code = ?",
                params![code],
                |row| {
                    Ok((
                        AuthorizationCode {
                            code: row.get(0)?,
                            user_id: row.get(1)?,
                            client_id: row.get(2)?,
                            redirect_uri: row.get(3)?,
                            scope: row.get(4)?,
                            pkce: None,
                            created_at: to_u64(row.get(7)?),
                            expires_at: to_u64(row.get(8)?),
                            used: row.get::<_, i32>(9)? != 0,
                        },
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .optional()
            .map_err(storage_err)?;

        let Some((mut code, challenge, method)) = row else {
            return Ok(None);
        };

        if let Some(challenge) = challenge {
            let method = match method {
                Some(m) => m.parse()?,
                None => gatehouse_oauth::CodeChallengeMethod::default(),
            };
            code.pkce = Some(PkceChallenge { challenge, method });
        }

        Ok(Some(code))
    }

    async fn redeem_auth_code(
        &self,
        code: &str,
        refresh_token: Option<RefreshTokenRecord>,
    ) -> gatehouse_oauth::Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(storage_err)?;

        let updated = tx
            .execute(
                "UPDATE oauth_codes SET used = 1 WHERE code = ? AND used = 0",
                params![code],
            )
            .map_err(storage_err)?;

        if updated == 0 {
            return Ok(false);
        }

        if let Some(record) = &refresh_token {
            insert_refresh_token(&tx, record).map_err(storage_err)?;
        }

        tx.commit().map_err(storage_err)?;
        Ok(true)
    }

    // Refresh tokens

    async fn get_refresh_token(
        &self,
        token: &str,
    ) -> gatehouse_oauth::Result<Option<RefreshTokenRecord>> {
        self.conn
            .lock()
            .query_row(
                "SELECT token, user_id, client_id, scope, created_at, expires_at, revoked
                 FROM oauth_refresh_tokens WHERE token = ? AND revoked = 0",
                params![token],
                refresh_from_row,
            )
            .optional()
            .map_err(storage_err)
    }

    async fn rotate_refresh_token(
        &self,
        token: &str,
        replacement: Option<RefreshTokenRecord>,
    ) -> gatehouse_oauth::Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(storage_err)?;

        let updated = tx
            .execute(
                "UPDATE oauth_refresh_tokens SET revoked = 1 WHERE token = ? AND revoked = 0",
                params![token],
            )
            .map_err(storage_err)?;

        if updated == 0 {
            return Ok(false);
        }

        if let Some(record) = &replacement {
            insert_refresh_token(&tx, record).map_err(storage_err)?;
        }

        tx.commit().map_err(storage_err)?;
        Ok(true)
    }

    // Consent

    async fn get_consent(
        &self,
        user_id: i64,
        client_id: &str,
    ) -> gatehouse_oauth::Result<Option<UserConsent>> {
        self.conn
            .lock()
            .query_row(
                "SELECT user_id, client_id, scope, granted_at
                 FROM user_consents WHERE user_id = ? AND client_id = ?",
                params![user_id, client_id],
                |row| {
                    Ok(UserConsent {
                        user_id: row.get(0)?,
                        client_id: row.get(1)?,
                        scope: row.get(2)?,
                        granted_at: to_u64(row.get(3)?),
                    })
                },
            )
            .optional()
            .map_err(storage_err)
    }

    async fn save_consent(&self, consent: UserConsent) -> gatehouse_oauth::Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO user_consents (user_id, client_id, scope, granted_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT (user_id, client_id)
                 DO UPDATE SET scope = excluded.scope, granted_at = excluded.granted_at",
                params![
                    consent.user_id,
                    consent.client_id,
                    consent.scope,
                    to_i64(consent.granted_at)
                ],
            )
            .map_err(storage_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_common::crypto;

    fn storage() -> SqliteStorage {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.create_scope(&Scope::new("openid", "OpenID")).unwrap();
        storage.create_scope(&Scope::new("email", "Email")).unwrap();
        storage
            .create_client(&Client {
                client_id: "webapp".to_string(),
                client_name: "Web App".to_string(),
                secret_hash: Some(crypto::hash_client_secret("webapp_secret")),
                require_client_secret: true,
                allowed_grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
                redirect_uris: vec!["https://localhost:5001/callback".to_string()],
                enabled: true,
                require_pkce: false,
            })
            .unwrap();
        storage.allow_client_scope("webapp", "openid").unwrap();
        storage
    }

    fn record(token: &str, user_id: i64) -> RefreshTokenRecord {
        RefreshTokenRecord {
            token: token.to_string(),
            user_id,
            client_id: "webapp".to_string(),
            scope: "openid".to_string(),
            created_at: 0,
            expires_at: u64::MAX,
            revoked: false,
        }
    }

    #[tokio::test]
    async fn test_client_roundtrip() {
        let storage = storage();

        let client = storage.get_client("webapp").await.unwrap().unwrap();
        assert_eq!(
            client.allowed_grant_types,
            vec![GrantType::AuthorizationCode, GrantType::RefreshToken]
        );
        assert_eq!(client.redirect_uris, vec!["https://localhost:5001/callback"]);
        assert!(client.require_client_secret);

        storage.delete_client("webapp").unwrap();
        assert!(storage.get_client("webapp").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_client_scopes() {
        let storage = storage();

        let allowed = storage.get_client_scopes("webapp").await.unwrap();
        assert_eq!(allowed.len(), 1);
        assert_eq!(allowed[0].name, "openid");

        assert_eq!(storage.list_scopes().await.unwrap().len(), 2);

        // unknown scope names are not linked
        storage.allow_client_scope("webapp", "admin").unwrap();
        assert_eq!(storage.get_client_scopes("webapp").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_users() {
        let storage = storage();
        let id = storage.create_user("alice", Some("alice@example.com")).unwrap();

        let user = storage.get_user(id).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.active);
        assert_eq!(storage.find_user_id("alice").unwrap(), Some(id));

        storage.set_user_active(id, false).unwrap();
        assert!(!storage.get_user(id).await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn test_auth_code_with_pkce_roundtrip() {
        let storage = storage();
        let code = AuthorizationCode::new(
            1,
            "webapp",
            "https://localhost:5001/callback",
            &["openid".to_string()],
            Some(PkceChallenge {
                challenge: "abc".to_string(),
                method: gatehouse_oauth::CodeChallengeMethod::S256,
            }),
        );
        storage.save_auth_code(code.clone()).await.unwrap();

        let loaded = storage.get_auth_code(&code.code).await.unwrap().unwrap();
        assert_eq!(loaded, code);
    }

    #[tokio::test]
    async fn test_redeem_is_compare_and_swap() {
        let storage = storage();
        let code = AuthorizationCode::new(1, "webapp", "https://localhost:5001/callback", &[], None);
        storage.save_auth_code(code.clone()).await.unwrap();

        assert!(storage
            .redeem_auth_code(&code.code, Some(record("rt-1", 1)))
            .await
            .unwrap());
        assert!(!storage
            .redeem_auth_code(&code.code, Some(record("rt-2", 1)))
            .await
            .unwrap());

        assert!(storage.get_refresh_token("rt-1").await.unwrap().is_some());
        assert!(storage.get_refresh_token("rt-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rotate_refresh_token() {
        let storage = storage();
        let code = AuthorizationCode::new(1, "webapp", "https://localhost:5001/callback", &[], None);
        storage.save_auth_code(code.clone()).await.unwrap();
        storage
            .redeem_auth_code(&code.code, Some(record("old", 1)))
            .await
            .unwrap();

        assert!(storage
            .rotate_refresh_token("old", Some(record("new", 1)))
            .await
            .unwrap());
        assert!(!storage.rotate_refresh_token("old", None).await.unwrap());

        assert!(storage.get_refresh_token("old").await.unwrap().is_none());
        assert!(storage.get_refresh_token("new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_consent_upsert() {
        let storage = storage();
        let consent = |scope: &str| UserConsent {
            user_id: 1,
            client_id: "webapp".to_string(),
            scope: scope.to_string(),
            granted_at: 10,
        };

        storage.save_consent(consent("openid")).await.unwrap();
        storage.save_consent(consent("openid email")).await.unwrap();

        let loaded = storage.get_consent(1, "webapp").await.unwrap().unwrap();
        assert_eq!(loaded.scope, "openid email");
        assert!(storage.get_consent(2, "webapp").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_expired_codes() {
        let storage = storage();
        let mut code = AuthorizationCode::new(1, "webapp", "https://localhost:5001/callback", &[], None);
        code.expires_at = 1;
        storage.save_auth_code(code).await.unwrap();

        assert_eq!(storage.purge_expired_codes().unwrap(), 1);
    }
}
