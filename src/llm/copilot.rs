use super::simulation;
use super::{ModelClient, PrimaryModel, Provider};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

/// Copilot has no public chat endpoint. Uncredentialed requests are
/// simulated; credentialed ones always fail with [`Error::NotImplemented`].
pub struct CopilotClient {
    api_key: Option<String>,
    primary: Arc<dyn PrimaryModel>,
}

impl CopilotClient {
    pub fn new(api_key: Option<String>, primary: Arc<dyn PrimaryModel>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            primary,
        }
    }
}

#[async_trait]
impl ModelClient for CopilotClient {
    async fn generate_response(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_none() {
            return simulation::simulate(self.primary.as_ref(), Provider::Copilot, prompt).await;
        }

        let err = Error::NotImplemented {
            provider: Provider::Copilot,
        };
        error!(error = %err, "copilot endpoint unavailable");
        Err(err)
    }
}
