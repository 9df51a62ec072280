pub mod chat_completion;
pub mod copilot;
pub mod gemini;
pub mod simulation;

use crate::config::Config;
use crate::credentials::{CredentialStore, PERPLEXITY_MODEL_SETTING};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use chat_completion::ChatCompletionClient;
pub use copilot::CopilotClient;
pub use gemini::GeminiClient;

/// The closed set of model providers a comparison can ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    Gemini,
    #[serde(rename = "ChatGPT")]
    ChatGpt,
    Copilot,
    Perplexity,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Self::Gemini,
        Self::ChatGpt,
        Self::Copilot,
        Self::Perplexity,
    ];

    /// Label used for the upstream API in error messages.
    pub fn platform(&self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::ChatGpt => "OpenAI",
            Self::Copilot => "Copilot",
            Self::Perplexity => "Perplexity",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "Gemini"),
            Self::ChatGpt => write!(f, "ChatGPT"),
            Self::Copilot => write!(f, "Copilot"),
            Self::Perplexity => write!(f, "Perplexity"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "chatgpt" | "gpt" | "openai" => Ok(Self::ChatGpt),
            "copilot" => Ok(Self::Copilot),
            "perplexity" => Ok(Self::Perplexity),
            other => Err(Error::selection(format!("unknown provider '{other}'"))),
        }
    }
}

/// One successful first-stage answer, fed to the judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub provider: Provider,
    pub content: String,
}

/// A search citation attached by the primary provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: Option<String>,
}

/// Raw judge output plus the citations grounding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub summary_text: String,
    pub sources: Vec<GroundingSource>,
}

/// A provider that can answer a single prompt.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate_response(&self, prompt: &str) -> Result<String>;
}

/// The provider that answers directly, stands in for uncredentialed
/// providers, and judges the final comparison.
#[async_trait]
pub trait PrimaryModel: Send + Sync {
    async fn generate(&self, prompt: &str, system_instruction: Option<&str>) -> Result<String>;

    async fn generate_synthesis(
        &self,
        original_prompt: &str,
        responses: &[ProviderResponse],
    ) -> Result<Synthesis>;
}

/// Exposes the primary model as an ordinary comparison participant.
pub struct PrimaryAsClient(pub Arc<dyn PrimaryModel>);

#[async_trait]
impl ModelClient for PrimaryAsClient {
    async fn generate_response(&self, prompt: &str) -> Result<String> {
        self.0.generate(prompt, None).await
    }
}

/// Build the client for `provider`, reading its credential right now.
pub fn build_client(
    provider: Provider,
    config: &Config,
    credentials: &CredentialStore,
    primary: Arc<dyn PrimaryModel>,
) -> Result<Arc<dyn ModelClient>> {
    let timeout = config.orchestrator.request_timeout();
    let api_key = credentials.get(provider);

    let client: Arc<dyn ModelClient> = match provider {
        Provider::Gemini => Arc::new(PrimaryAsClient(primary)),
        Provider::ChatGpt => Arc::new(ChatCompletionClient::new(
            Provider::ChatGpt,
            api_key,
            config.chatgpt.model.clone(),
            &config.chatgpt.base_url,
            timeout,
            primary,
        )?),
        Provider::Perplexity => {
            let model = credentials
                .get_setting(provider, PERPLEXITY_MODEL_SETTING)
                .unwrap_or_else(|| config.perplexity.model.clone());
            Arc::new(ChatCompletionClient::new(
                Provider::Perplexity,
                api_key,
                model,
                &config.perplexity.base_url,
                timeout,
                primary,
            )?)
        }
        Provider::Copilot => Arc::new(CopilotClient::new(api_key, primary)),
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_aliases() {
        assert_eq!("ChatGPT".parse::<Provider>().unwrap(), Provider::ChatGpt);
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::ChatGpt);
        assert_eq!(" perplexity ".parse::<Provider>().unwrap(), Provider::Perplexity);
        assert!("claude".parse::<Provider>().is_err());
    }

    #[test]
    fn provider_serializes_as_display_name() {
        let json = serde_json::to_string(&Provider::ChatGpt).unwrap();
        assert_eq!(json, "\"ChatGPT\"");
        for p in Provider::ALL {
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{p}\""));
        }
    }
}
