use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub primary: PrimaryConfig,
    #[serde(default)]
    pub chatgpt: ChatGptConfig,
    #[serde(default)]
    pub perplexity: PerplexityConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// The primary provider: answers, simulates, and judges.
#[derive(Debug, Deserialize)]
pub struct PrimaryConfig {
    #[serde(default = "default_primary_model")]
    pub model: String,
    /// Environment variable holding the primary credential, read once at startup.
    #[serde(default = "default_primary_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_primary_base_url")]
    pub base_url: String,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            model: default_primary_model(),
            api_key_env: default_primary_key_env(),
            base_url: default_primary_base_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatGptConfig {
    #[serde(default = "default_chatgpt_model")]
    pub model: String,
    #[serde(default = "default_chatgpt_base_url")]
    pub base_url: String,
}

impl Default for ChatGptConfig {
    fn default() -> Self {
        Self {
            model: default_chatgpt_model(),
            base_url: default_chatgpt_base_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PerplexityConfig {
    /// Used unless the device has a stored `modelName` setting.
    #[serde(default = "default_perplexity_model")]
    pub model: String,
    #[serde(default = "default_perplexity_base_url")]
    pub base_url: String,
}

impl Default for PerplexityConfig {
    fn default() -> Self {
        Self {
            model: default_perplexity_model(),
            base_url: default_perplexity_base_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound on each provider call and on the synthesis call.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_min_selection")]
    pub min_selection: usize,
    #[serde(default = "default_max_selection")]
    pub max_selection: usize,
}

impl OrchestratorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout_secs(),
            min_selection: default_min_selection(),
            max_selection: default_max_selection(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct CredentialsConfig {
    pub path: Option<PathBuf>,
}

impl CredentialsConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_credentials_path)
    }
}

// Defaults
fn default_primary_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_primary_key_env() -> String {
    "API_KEY".into()
}
fn default_primary_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_chatgpt_model() -> String {
    "gpt-4o-mini".into()
}
fn default_chatgpt_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_perplexity_model() -> String {
    "llama-3-sonar-small-32k-online".into()
}
fn default_perplexity_base_url() -> String {
    "https://api.perplexity.ai".into()
}
fn default_timeout_secs() -> u64 {
    45
}
fn default_min_selection() -> usize {
    2
}
fn default_max_selection() -> usize {
    4
}
fn default_credentials_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("llm-comparator")
        .join("credentials.json")
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| Error::config(format!("Failed to parse config: {e}")))
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.orchestrator.request_timeout_secs == 0 {
            return Err(Error::config("orchestrator.request_timeout_secs must be positive"));
        }
        let o = &self.orchestrator;
        if o.min_selection == 0 || o.min_selection > o.max_selection {
            return Err(Error::config(format!(
                "invalid selection bounds: min {} / max {}",
                o.min_selection, o.max_selection
            )));
        }
        Ok(())
    }
}
