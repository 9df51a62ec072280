//! Per-provider API keys and settings, persisted on this device.
//!
//! Only the providers in [`CONFIGURABLE_PROVIDERS`] accept writes. Backend
//! failures are logged and read as "absent": a missing key just means the
//! provider is simulated.

use crate::error::{Error, Result};
use crate::llm::Provider;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, error};

pub const CONFIGURABLE_PROVIDERS: [Provider; 3] =
    [Provider::ChatGpt, Provider::Copilot, Provider::Perplexity];

/// Setting name holding the Perplexity model override.
pub const PERPLEXITY_MODEL_SETTING: &str = "modelName";

pub fn api_key_name(provider: Provider) -> String {
    format!(
        "llm_comparator_api_key_{}",
        provider.to_string().to_uppercase()
    )
}

pub fn setting_key_name(provider: Provider, setting: &str) -> String {
    format!(
        "llm_comparator_setting_{}_{setting}",
        provider.to_string().to_uppercase()
    )
}

/// Flat string key/value persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// A JSON object on disk, re-read on every access.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                Error::parse(format!("credential file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::parse(format!("serialize credentials: {e}")))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// Process-local store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::config("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| Error::config("memory store lock poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| Error::config("memory store lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

pub struct CredentialStore {
    backend: Box<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn configurable_providers() -> &'static [Provider] {
        &CONFIGURABLE_PROVIDERS
    }

    pub fn is_configurable(provider: Provider) -> bool {
        CONFIGURABLE_PROVIDERS.contains(&provider)
    }

    /// Store `secret`; an empty string removes the saved key.
    pub fn save(&self, provider: Provider, secret: &str) {
        if !Self::is_configurable(provider) {
            debug!(%provider, "ignoring key for non-configurable provider");
            return;
        }
        self.write(&api_key_name(provider), secret);
    }

    pub fn get(&self, provider: Provider) -> Option<String> {
        if !Self::is_configurable(provider) {
            return None;
        }
        self.read(&api_key_name(provider))
    }

    pub fn has_credential(&self, provider: Provider) -> bool {
        self.get(provider).is_some_and(|k| !k.is_empty())
    }

    /// Store a named setting; an empty value removes it.
    pub fn save_setting(&self, provider: Provider, name: &str, value: &str) {
        if !Self::is_configurable(provider) {
            debug!(%provider, setting = name, "ignoring setting for non-configurable provider");
            return;
        }
        self.write(&setting_key_name(provider, name), value);
    }

    pub fn get_setting(&self, provider: Provider, name: &str) -> Option<String> {
        if !Self::is_configurable(provider) {
            return None;
        }
        self.read(&setting_key_name(provider, name))
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                error!(key, error = %e, "failed to read from credential store");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        let result = if value.is_empty() {
            self.backend.remove(key)
        } else {
            self.backend.set(key, value)
        };
        if let Err(e) = result {
            error!(key, error = %e, "failed to write to credential store");
        }
    }
}
