//! Persona fallback for providers without a configured credential.
//!
//! The primary model answers in the provider's voice and the reply is
//! prefixed with [`SIMULATION_MARKER`] so consumers can badge it.

use super::{PrimaryModel, Provider};
use crate::error::{Error, Result};
use tracing::warn;

/// Prefix on every simulated answer. Consumers match on this literal.
pub const SIMULATION_MARKER: &str = "[Simulated via Gemini]";

const CHATGPT_PERSONA: &str = "You are simulating ChatGPT. Provide a detailed, conversational answer. \
Excel at creative writing, complex problem-solving, and generating human-like text across a wide variety of topics. \
Your strength lies in understanding context and nuance.";

const COPILOT_PERSONA: &str = "You are simulating Microsoft Copilot. You specialize in code generation, completion, and explanation. \
If the prompt is about code, provide clear code examples. \
For general topics, answer concisely and efficiently, focusing on technical accuracy and clarity.";

const PERPLEXITY_PERSONA: &str = "You are simulating Perplexity AI. You are a conversational answer engine. \
Provide answers that are accurate and well-sourced. Be concise and, when possible, list web sources. \
Your responses should be grounded in verifiable facts.";

/// System instruction describing the provider's claimed strengths.
/// The primary provider never needs one.
pub fn persona_instruction(provider: Provider) -> Option<&'static str> {
    match provider {
        Provider::Gemini => None,
        Provider::ChatGpt => Some(CHATGPT_PERSONA),
        Provider::Copilot => Some(COPILOT_PERSONA),
        Provider::Perplexity => Some(PERPLEXITY_PERSONA),
    }
}

/// Answer `prompt` as `provider` through the primary model.
pub async fn simulate(primary: &dyn PrimaryModel, provider: Provider, prompt: &str) -> Result<String> {
    warn!(%provider, "API key not provided, falling back to Gemini simulation");

    let persona = persona_instruction(provider);
    match primary.generate(prompt, persona).await {
        Ok(text) => Ok(format!("{SIMULATION_MARKER} {text}")),
        Err(e) => {
            warn!(%provider, error = %e, "simulation fallback failed");
            Err(Error::FallbackExhausted { provider })
        }
    }
}
