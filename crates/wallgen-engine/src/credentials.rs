use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;

use crate::config::non_empty_env;

const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Raised when a batch starts without any API key available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingCredential;

impl fmt::Display for MissingCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} not set", API_KEY_ENV_VARS.join(" or "))
    }
}

impl std::error::Error for MissingCredential {}

/// Process-wide API key, read fresh at the start of every batch.
///
/// A key handed to [`CredentialStore::connect`] wins; otherwise the store
/// falls back to the environment unless it was built detached.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    connected: Arc<RwLock<Option<String>>>,
    env_fallback: bool,
}

impl CredentialStore {
    pub fn from_env() -> Self {
        Self {
            connected: Arc::new(RwLock::new(None)),
            env_fallback: true,
        }
    }

    pub fn detached(key: Option<String>) -> Self {
        Self {
            connected: Arc::new(RwLock::new(normalize_key(key))),
            env_fallback: false,
        }
    }

    pub fn connect(&self, key: impl Into<String>) {
        let mut slot = self
            .connected
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = normalize_key(Some(key.into()));
    }

    pub fn current(&self) -> Option<String> {
        let connected = self
            .connected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if connected.is_some() || !self.env_fallback {
            return connected;
        }
        API_KEY_ENV_VARS.iter().find_map(|key| non_empty_env(key))
    }

    pub fn is_present(&self) -> bool {
        self.current().is_some()
    }
}

fn normalize_key(key: Option<String>) -> Option<String> {
    key.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Host capability that owns the credential-selection flow.
pub trait CredentialHost: Send + Sync {
    fn has_active_credential(&self) -> bool;

    /// Starts the connection flow. Success is not reported back; callers
    /// learn whether it worked from the next batch.
    fn prompt_for_credential(&self) -> Result<()>;
}

/// Host backed by a [`CredentialStore`] and a key prompt, such as a
/// terminal read.
pub struct StoreCredentialHost<F> {
    store: CredentialStore,
    prompt: F,
}

impl<F> StoreCredentialHost<F>
where
    F: Fn() -> Result<Option<String>> + Send + Sync,
{
    pub fn new(store: CredentialStore, prompt: F) -> Self {
        Self { store, prompt }
    }
}

impl<F> CredentialHost for StoreCredentialHost<F>
where
    F: Fn() -> Result<Option<String>> + Send + Sync,
{
    fn has_active_credential(&self) -> bool {
        self.store.is_present()
    }

    fn prompt_for_credential(&self) -> Result<()> {
        if let Some(key) = (self.prompt)()? {
            self.store.connect(key);
        }
        Ok(())
    }
}
