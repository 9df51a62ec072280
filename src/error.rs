use crate::llm::Provider;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{provider} API key is not configured")]
    MissingCredential { provider: Provider },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{platform} API Error: {detail}")]
    Transport { platform: String, detail: String },

    #[error("{platform} API Error: {status_code} {message}")]
    Api {
        platform: String,
        message: String,
        status_code: u16,
    },

    #[error("Invalid response structure from {platform} API: {detail}")]
    MalformedResponse { platform: String, detail: String },

    #[error(
        "{provider} API key is missing and the Gemini fallback failed. Ensure API_KEY is set."
    )]
    FallbackExhausted { provider: Provider },

    #[error("Gemini API Key is not configured. Cannot generate summary.")]
    SynthesisUnavailable,

    #[error("Primary Summary Error: {0}")]
    Synthesis(String),

    #[error(
        "A {provider} API Key was provided, but a real API endpoint for {provider} is not implemented in this application yet. This response is a placeholder."
    )]
    NotImplemented { provider: Provider },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{provider} did not answer within {secs}s")]
    Timeout { provider: Provider, secs: u64 },

    #[error("a comparison is already running")]
    Busy,

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    pub fn api(platform: impl Into<String>, message: impl Into<String>, status_code: u16) -> Self {
        Self::Api {
            platform: platform.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Re-label a transport failure with the platform that was being called.
    pub fn transport(platform: impl Into<String>, err: Self) -> Self {
        match err {
            Self::Http(detail) => Self::Transport {
                platform: platform.into(),
                detail,
            },
            other => other,
        }
    }

    pub fn malformed(platform: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            platform: platform.into(),
            detail: detail.into(),
        }
    }

    pub fn synthesis(detail: impl std::fmt::Display) -> Self {
        Self::Synthesis(detail.to_string())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn selection(msg: impl Into<String>) -> Self {
        Self::InvalidSelection(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
