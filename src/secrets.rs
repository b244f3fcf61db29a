//! Secret-value lookup for the completion API key
//!
//! A secret is a JSON object string; the API key lives under `API_KEY`.
//! Stores are consulted in order and the first one holding the secret wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::Config;
use crate::{Error, Result};

/// Field of the secret JSON object holding the API key
pub const API_KEY_FIELD: &str = "API_KEY";

/// A store of named secret strings
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the raw secret string, `None` if the store does not hold it
    ///
    /// # Errors
    ///
    /// Returns error if the store exists but cannot be read
    async fn get(&self, name: &str) -> Result<Option<String>>;
}

/// Reads secrets from environment variables named after the secret
#[derive(Debug, Default)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(std::env::var(name).ok().filter(|v| !v.is_empty()))
    }
}

/// Reads secrets from a JSON file mapping secret names to secret strings
///
/// ```json
/// { "MALIK_SECRETS": "{\"API_KEY\": \"sk-...\"}" }
/// ```
///
/// Object values are accepted as well and re-serialized.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let secrets: HashMap<String, serde_json::Value> = serde_json::from_str(&content)
            .map_err(|e| Error::Secret(format!("invalid secrets file {}: {e}", self.path.display())))?;

        Ok(secrets.get(name).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }
}

/// Consults a list of stores in order
#[derive(Default)]
pub struct ChainSecretStore {
    stores: Vec<Box<dyn SecretStore>>,
}

impl ChainSecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a store to the chain
    #[must_use]
    pub fn with(mut self, store: impl SecretStore + 'static) -> Self {
        self.stores.push(Box::new(store));
        self
    }

    /// Standard chain: environment first, then the configured secrets file
    #[must_use]
    pub fn standard(secrets_file: &Path) -> Self {
        Self::new()
            .with(EnvSecretStore)
            .with(FileSecretStore::new(secrets_file))
    }
}

#[async_trait]
impl SecretStore for ChainSecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        for store in &self.stores {
            if let Some(value) = store.get(name).await? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

/// Extract the API key from a secret's JSON object string
///
/// # Errors
///
/// Returns error if the value is not a JSON object with a string `API_KEY`
pub fn parse_api_key(secret: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(secret)
        .map_err(|e| Error::Secret(format!("secret is not valid JSON: {e}")))?;

    value
        .get(API_KEY_FIELD)
        .and_then(serde_json::Value::as_str)
        .filter(|k| !k.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| Error::Secret(format!("secret has no {API_KEY_FIELD} field")))
}

/// Look up a named secret and extract its API key
///
/// # Errors
///
/// Returns error if the store fails or the secret is malformed
pub async fn resolve_api_key(store: &dyn SecretStore, name: &str) -> Result<Option<String>> {
    match store.get(name).await? {
        Some(secret) => parse_api_key(&secret).map(Some),
        None => Ok(None),
    }
}

/// Resolve the completion API key: a plain configured key wins, then the
/// secret store. Failures are logged and yield `None`.
pub async fn completion_api_key(config: &Config) -> Option<String> {
    if let Some(key) = config.api_keys.openai.as_ref().filter(|k| !k.is_empty()) {
        return Some(key.clone());
    }

    let store = ChainSecretStore::standard(&config.llm.secrets_file);
    match resolve_api_key(&store, &config.llm.secret_name).await {
        Ok(Some(key)) => {
            tracing::info!(secret = %config.llm.secret_name, "loaded API key from secret store");
            Some(key)
        }
        Ok(None) => {
            tracing::warn!(secret = %config.llm.secret_name, "no API key configured");
            None
        }
        Err(e) => {
            tracing::error!(secret = %config.llm.secret_name, error = %e, "failed to read API key");
            None
        }
    }
}
