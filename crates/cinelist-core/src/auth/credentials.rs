use std::sync::{Mutex, RwLock};

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};

const SERVICE_NAME: &str = "cinelist";

/// Storage key for the short-lived bearer credential
pub const ACCESS_TOKEN_KEY: &str = "access-token";

/// Storage key for the credential used to obtain new access tokens
pub const REFRESH_TOKEN_KEY: &str = "refresh-token";

/// The access/refresh credential pair issued at login.
///
/// Holding an access token says nothing about whether it is still valid;
/// only a successful API response proves that.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "access-token")]
    pub access_token: String,
    #[serde(rename = "refresh-token")]
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens must never end up in logs.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Durable holder of the credential pair.
///
/// Written only by login, refresh and logout; read by every outbound request.
/// Implementations replace the pair atomically.
pub trait CredentialStore: Send + Sync {
    /// Current pair, if a session exists
    fn tokens(&self) -> Result<Option<TokenPair>>;

    /// Replace the whole pair
    fn store(&self, pair: &TokenPair) -> Result<()>;

    /// Swap in a refreshed access token, and a rotated refresh token when the
    /// server issued one. Fails if no session is stored.
    fn update_access_token(&self, access_token: &str, rotated_refresh: Option<&str>) -> Result<()>;

    /// Remove both tokens. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;

    fn access_token(&self) -> Result<Option<String>> {
        Ok(self.tokens()?.map(|pair| pair.access_token))
    }

    fn refresh_token(&self) -> Result<Option<String>> {
        Ok(self.tokens()?.map(|pair| pair.refresh_token))
    }
}

pub(crate) fn apply_refresh(pair: &mut TokenPair, access_token: &str, rotated_refresh: Option<&str>) {
    pair.access_token = access_token.to_string();
    if let Some(refresh) = rotated_refresh {
        pair.refresh_token = refresh.to_string();
    }
}

/// Session-only store kept in process memory.
#[derive(Default)]
pub struct MemoryCredentialStore {
    pair: RwLock<Option<TokenPair>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(pair: TokenPair) -> Self {
        Self {
            pair: RwLock::new(Some(pair)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn tokens(&self) -> Result<Option<TokenPair>> {
        let guard = self
            .pair
            .read()
            .map_err(|_| anyhow::anyhow!("Credential lock poisoned"))?;
        Ok(guard.clone())
    }

    fn store(&self, pair: &TokenPair) -> Result<()> {
        let mut guard = self
            .pair
            .write()
            .map_err(|_| anyhow::anyhow!("Credential lock poisoned"))?;
        *guard = Some(pair.clone());
        Ok(())
    }

    fn update_access_token(&self, access_token: &str, rotated_refresh: Option<&str>) -> Result<()> {
        let mut guard = self
            .pair
            .write()
            .map_err(|_| anyhow::anyhow!("Credential lock poisoned"))?;
        let pair = guard
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No session to refresh"))?;
        apply_refresh(pair, access_token, rotated_refresh);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .pair
            .write()
            .map_err(|_| anyhow::anyhow!("Credential lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

/// Store backed by the OS keychain: one entry per token under the
/// `access-token` and `refresh-token` account names.
pub struct KeyringCredentialStore {
    service: String,
    // Two keychain entries cannot be written atomically, so every access in
    // this process goes through one lock.
    lock: Mutex<()>,
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            lock: Mutex::new(()),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {} from keychain", key)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .with_context(|| format!("Failed to store {} in keychain", key))
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {} from keychain", key)),
        }
    }

    fn read_pair(&self) -> Result<Option<TokenPair>> {
        let access = self.read(ACCESS_TOKEN_KEY)?;
        let refresh = self.read(REFRESH_TOKEN_KEY)?;
        Ok(match (access, refresh) {
            (Some(access), Some(refresh)) => Some(TokenPair::new(access, refresh)),
            _ => None,
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Credential lock poisoned"))
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn tokens(&self) -> Result<Option<TokenPair>> {
        let _guard = self.lock()?;
        self.read_pair()
    }

    fn store(&self, pair: &TokenPair) -> Result<()> {
        let _guard = self.lock()?;
        self.write(ACCESS_TOKEN_KEY, &pair.access_token)?;
        self.write(REFRESH_TOKEN_KEY, &pair.refresh_token)
    }

    fn update_access_token(&self, access_token: &str, rotated_refresh: Option<&str>) -> Result<()> {
        let _guard = self.lock()?;
        if self.read(REFRESH_TOKEN_KEY)?.is_none() {
            return Err(anyhow::anyhow!("No session to refresh"));
        }
        self.write(ACCESS_TOKEN_KEY, access_token)?;
        if let Some(refresh) = rotated_refresh {
            self.write(REFRESH_TOKEN_KEY, refresh)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock()?;
        // Attempt both deletions before reporting a failure
        let access = self.delete(ACCESS_TOKEN_KEY);
        let refresh = self.delete(REFRESH_TOKEN_KEY);
        access.and(refresh)
    }
}
