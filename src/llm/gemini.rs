use super::{GroundingSource, PrimaryModel, Provider, ProviderResponse, Synthesis};
use crate::config::PrimaryConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const SYNTHESIS_INSTRUCTION: &str = r#"You are an expert fact-checker and a definitive judge of AI responses. Your primary role is to critically analyze and verify the information provided by different AI models using Google Search.
Your output MUST be a single, valid JSON object and nothing else. Do not include any extra text, explanations, or markdown formatting (like ```json) outside of the JSON object itself.
The JSON object must conform to the following structure:
{
  "analysis": [
    {
      "modelName": "The name of the model being analyzed (e.g., 'Gemini', 'ChatGPT')",
      "score": "A numerical score of the response from 1 to 100, where 100 is best. Do not assign the same score to different models.",
      "verdict": "A brief, one-sentence verdict on its factual accuracy and quality."
    }
  ]
}"#;

// -- generateContent format --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

/// The primary provider.
///
/// The credential is captured once at construction; without it every call
/// fails before any network traffic.
pub struct GeminiClient {
    api_key: Option<String>,
    model: String,
    base_url: String,
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        model: String,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            error!(
                "Gemini API key not set. Real Gemini calls and fallbacks for other models will fail."
            );
        }
        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: HttpClient::new(Provider::Gemini.platform(), timeout)?,
        })
    }

    /// Build from config, reading the API key from the configured env var.
    pub fn from_config(config: &PrimaryConfig, timeout: Duration) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::new(api_key, config.model.clone(), &config.base_url, timeout)
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate_content(
        &self,
        api_key: &str,
        prompt: &str,
        system_instruction: Option<&str>,
        search: bool,
    ) -> Result<GenerateResponse> {
        debug!(model = %self.model, search, "sending Gemini request");

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: system_instruction.map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            tools: if search {
                vec![Tool {
                    google_search: GoogleSearch {},
                }]
            } else {
                Vec::new()
            },
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| Error::parse(format!("serialize request: {e}")))?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response_text = self
            .http
            .post_json_raw(&url, &body, &[("x-goog-api-key", api_key)])
            .await?;

        serde_json::from_str(&response_text)
            .map_err(|e| Error::malformed(self.http.platform(), format!("undecodable body: {e}")))
    }
}

#[async_trait]
impl PrimaryModel for GeminiClient {
    async fn generate(&self, prompt: &str, system_instruction: Option<&str>) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Error::MissingCredential {
                provider: Provider::Gemini,
            });
        };

        let response = self
            .generate_content(api_key, prompt, system_instruction, false)
            .await
            .map_err(|e| {
                let e = Error::transport(self.http.platform(), e);
                error!(error = %e, "Gemini generation failed");
                e
            })?;
        response_text(&response)
            .ok_or_else(|| Error::malformed(self.http.platform(), "no candidate text"))
    }

    async fn generate_synthesis(
        &self,
        original_prompt: &str,
        responses: &[ProviderResponse],
    ) -> Result<Synthesis> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Error::SynthesisUnavailable);
        };

        info!(responses = responses.len(), "requesting grounded synthesis");
        let prompt = assemble_synthesis_prompt(original_prompt, responses);

        let response = self
            .generate_content(api_key, &prompt, Some(SYNTHESIS_INSTRUCTION), true)
            .await
            .map_err(|e| {
                let e = Error::transport(self.http.platform(), e);
                error!(error = %e, "Gemini synthesis failed");
                Error::synthesis(e)
            })?;

        let summary_text = response_text(&response)
            .ok_or_else(|| Error::synthesis("response carried no text"))?;
        let sources = grounding_sources(&response);
        info!(sources = sources.len(), "synthesis received");

        Ok(Synthesis {
            summary_text,
            sources,
        })
    }
}

/// The judge prompt: the original question followed by each labeled answer.
pub fn assemble_synthesis_prompt(original_prompt: &str, responses: &[ProviderResponse]) -> String {
    let labeled = responses
        .iter()
        .map(|r| format!("--- Response from {} ---\n{}", r.provider, r.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "The user's original prompt was: \"{original_prompt}\"\n\n\
         Here are the responses from various AI models:\n\n{labeled}\n\n\
         Please analyze these responses and provide a synthesized answer based on the instructions."
    )
}

fn response_text(response: &GenerateResponse) -> Option<String> {
    let parts = &response.candidates.first()?.content.as_ref()?.parts;
    let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
    if text.is_empty() { None } else { Some(text) }
}

fn grounding_sources(response: &GenerateResponse) -> Vec<GroundingSource> {
    response
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
        .map(|m| {
            m.grounding_chunks
                .iter()
                .filter_map(|chunk| chunk.web.as_ref())
                .filter_map(|web| {
                    let uri = web.uri.clone().filter(|u| !u.is_empty())?;
                    Some(GroundingSource {
                        uri,
                        title: web.title.clone(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
