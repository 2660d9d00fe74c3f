//! In-memory [`OAuthStorage`] implementation.
//!
//! All state sits behind one mutex, so every trait call is a single atomic
//! step. Used by tests and by embedders that do not need persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::Client;
use crate::code::AuthorizationCode;
use crate::consent::UserConsent;
use crate::error::Result;
use crate::scope::Scope;
use crate::storage::{OAuthStorage, User};
use crate::tokens::RefreshTokenRecord;

#[derive(Default)]
struct Inner {
    clients: HashMap<String, Client>,
    scopes: Vec<Scope>,
    client_scopes: HashMap<String, Vec<String>>,
    users: HashMap<i64, User>,
    codes: HashMap<String, AuthorizationCode>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
    consents: HashMap<(i64, String), UserConsent>,
}

/// In-memory OAuth storage.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a client.
    pub fn insert_client(&self, client: Client) {
        self.inner
            .lock()
            .clients
            .insert(client.client_id.clone(), client);
    }

    /// Removes a client, as a soft delete would.
    pub fn remove_client(&self, client_id: &str) {
        self.inner.lock().clients.remove(client_id);
    }

    /// Adds a scope to the global catalogue.
    pub fn insert_scope(&self, scope: Scope) {
        self.inner.lock().scopes.push(scope);
    }

    /// Allows a client to request a catalogue scope.
    pub fn allow_scope(&self, client_id: &str, scope_name: &str) {
        self.inner
            .lock()
            .client_scopes
            .entry(client_id.to_string())
            .or_default()
            .push(scope_name.to_string());
    }

    /// Registers or replaces a user.
    pub fn insert_user(&self, user: User) {
        self.inner.lock().users.insert(user.id, user);
    }

    /// Stores a refresh token directly, bypassing issuance.
    pub fn insert_refresh_token(&self, record: RefreshTokenRecord) {
        self.inner
            .lock()
            .refresh_tokens
            .insert(record.token.clone(), record);
    }

    /// Looks up a refresh token, revoked or not.
    #[must_use]
    pub fn refresh_token_record(&self, token: &str) -> Option<RefreshTokenRecord> {
        self.inner.lock().refresh_tokens.get(token).cloned()
    }
}

#[async_trait]
impl OAuthStorage for MemoryStorage {
    async fn get_client(&self, client_id: &str) -> Result<Option<Client>> {
        Ok(self.inner.lock().clients.get(client_id).cloned())
    }

    async fn get_client_scopes(&self, client_id: &str) -> Result<Vec<Scope>> {
        let inner = self.inner.lock();
        let Some(names) = inner.client_scopes.get(client_id) else {
            return Ok(Vec::new());
        };

        Ok(inner
            .scopes
            .iter()
            .filter(|s| names.contains(&s.name))
            .cloned()
            .collect())
    }

    async fn list_scopes(&self) -> Result<Vec<Scope>> {
        Ok(self.inner.lock().scopes.clone())
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.inner.lock().users.get(&user_id).cloned())
    }

    async fn save_auth_code(&self, code: AuthorizationCode) -> Result<()> {
        self.inner.lock().codes.insert(code.code.clone(), code);
        Ok(())
    }

    async fn get_auth_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        Ok(self.inner.lock().codes.get(code).cloned())
    }

    async fn redeem_auth_code(
        &self,
        code: &str,
        refresh_token: Option<RefreshTokenRecord>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock();

        match inner.codes.get_mut(code) {
            Some(stored) if !stored.used => stored.used = true,
            _ => return Ok(false),
        }

        if let Some(record) = refresh_token {
            inner.refresh_tokens.insert(record.token.clone(), record);
        }

        Ok(true)
    }

    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        Ok(self
            .inner
            .lock()
            .refresh_tokens
            .get(token)
            .filter(|r| !r.revoked)
            .cloned())
    }

    async fn rotate_refresh_token(
        &self,
        token: &str,
        replacement: Option<RefreshTokenRecord>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock();

        match inner.refresh_tokens.get_mut(token) {
            Some(stored) if !stored.revoked => stored.revoked = true,
            _ => return Ok(false),
        }

        if let Some(record) = replacement {
            inner.refresh_tokens.insert(record.token.clone(), record);
        }

        Ok(true)
    }

    async fn get_consent(&self, user_id: i64, client_id: &str) -> Result<Option<UserConsent>> {
        Ok(self
            .inner
            .lock()
            .consents
            .get(&(user_id, client_id.to_string()))
            .cloned())
    }

    async fn save_consent(&self, consent: UserConsent) -> Result<()> {
        self.inner
            .lock()
            .consents
            .insert((consent.user_id, consent.client_id.clone()), consent);
        Ok(())
    }
}
