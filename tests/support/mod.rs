#![allow(dead_code)]

use async_trait::async_trait;
use llm_comparator::error::{Error, Result};
use llm_comparator::llm::{ModelClient, PrimaryModel, Provider, ProviderResponse, Synthesis};
use serde_json::json;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Stand-in for the primary model that records every call.
#[derive(Default)]
pub struct FakePrimary {
    pub fail_generate: bool,
    pub fail_synthesis: bool,
    pub generate_calls: Mutex<Vec<(String, Option<String>)>>,
    pub synthesis_calls: Mutex<Vec<Vec<ProviderResponse>>>,
    pub synthesis_prompts: Mutex<Vec<String>>,
}

impl FakePrimary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_generate: true,
            fail_synthesis: true,
            ..Self::default()
        }
    }

    pub fn synthesis_count(&self) -> usize {
        self.synthesis_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PrimaryModel for FakePrimary {
    async fn generate(&self, prompt: &str, system_instruction: Option<&str>) -> Result<String> {
        self.generate_calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), system_instruction.map(String::from)));
        if self.fail_generate {
            return Err(Error::MissingCredential {
                provider: Provider::Gemini,
            });
        }
        Ok(match system_instruction {
            Some(_) => "persona text".to_string(),
            None => "gemini answer".to_string(),
        })
    }

    async fn generate_synthesis(
        &self,
        original_prompt: &str,
        responses: &[ProviderResponse],
    ) -> Result<Synthesis> {
        self.synthesis_prompts
            .lock()
            .unwrap()
            .push(original_prompt.to_string());
        self.synthesis_calls.lock().unwrap().push(responses.to_vec());
        if self.fail_synthesis {
            return Err(Error::synthesis("upstream exploded"));
        }
        let analysis: Vec<_> = responses
            .iter()
            .enumerate()
            .map(|(i, r)| {
                json!({
                    "modelName": r.provider.to_string(),
                    "score": 95 - (i as i64) * 10,
                    "verdict": "Checks out.",
                })
            })
            .collect();
        Ok(Synthesis {
            summary_text: format!("```json\n{}\n```", json!({ "analysis": analysis })),
            sources: vec![],
        })
    }
}

/// A client with a canned outcome and an optional delay.
pub struct FakeClient {
    pub provider: Provider,
    pub reply: std::result::Result<String, String>,
    pub delay: Duration,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeClient {
    pub fn ok(provider: Provider, text: &str) -> Self {
        Self {
            provider,
            reply: Ok(text.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(provider: Provider, detail: &str) -> Self {
        Self {
            provider,
            reply: Err(detail.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ModelClient for FakeClient {
    async fn generate_response(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply
            .clone()
            .map_err(|detail| Error::api(self.provider.platform(), detail, 500))
    }
}
