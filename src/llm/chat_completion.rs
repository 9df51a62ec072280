use super::simulation;
use super::{ModelClient, PrimaryModel, Provider};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

// -- OpenAI-compatible format --

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for providers speaking the `/chat/completions` protocol
/// (ChatGPT, Perplexity).
///
/// Without a credential it answers through the primary model's persona
/// simulation instead of touching the network.
pub struct ChatCompletionClient {
    provider: Provider,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    http: HttpClient,
    primary: Arc<dyn PrimaryModel>,
}

impl ChatCompletionClient {
    pub fn new(
        provider: Provider,
        api_key: Option<String>,
        model: String,
        base_url: &str,
        timeout: Duration,
        primary: Arc<dyn PrimaryModel>,
    ) -> Result<Self> {
        let http = HttpClient::new(provider.platform(), timeout)?;
        Ok(Self {
            provider,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            http,
            primary,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String> {
        debug!(provider = %self.provider, model = %self.model, "sending chat completion");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };
        let response_text = self
            .http
            .post_json_bearer(&self.endpoint, api_key, &request)
            .await?;

        parse_chat_response(self.http.platform(), &response_text)
    }
}

#[async_trait]
impl ModelClient for ChatCompletionClient {
    async fn generate_response(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return simulation::simulate(self.primary.as_ref(), self.provider, prompt).await;
        };

        self.complete(api_key, prompt).await.map_err(|e| {
            error!(provider = %self.provider, error = %e, "chat completion failed");
            e
        })
    }
}

/// First choice with non-empty content, or a malformed-response error.
fn parse_chat_response(platform: &str, body: &str) -> Result<String> {
    let resp: ChatResponse = serde_json::from_str(body)
        .map_err(|e| Error::malformed(platform, format!("undecodable body: {e}")))?;

    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| Error::malformed(platform, "no choice with message content"))
}
