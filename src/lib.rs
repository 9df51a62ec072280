pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod llm;
pub mod orchestrator;
pub mod output;
pub mod summary;
