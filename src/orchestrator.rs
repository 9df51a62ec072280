//! One comparison run: fan the prompt out to every selected provider, wait
//! for all of them to settle, then have the primary model judge the answers
//! that succeeded.
//!
//! Run lifecycle:
//! idle → dispatched → collected → (synthesizing → synthesized | no-synthesis) → idle

use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::llm::{
    self, GroundingSource, ModelClient, PrimaryModel, Provider, ProviderResponse, Synthesis,
};
use crate::summary;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

/// Shown on a failed provider card; details go to the log.
pub const GENERIC_RESPONSE_ERROR: &str = "An error occurred. Please check the logs.";
/// Shown on a failed synthesis card.
pub const GENERIC_SUMMARY_ERROR: &str = "An error occurred while generating the summary.";
pub const SUMMARY_ID: &str = "summary-card";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResponseStatus {
    Loading,
    Success { content: String },
    Error { message: String },
}

/// One provider's card in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub id: String,
    pub provider: Provider,
    #[serde(flatten)]
    pub status: ResponseStatus,
}

impl GenerationResult {
    pub fn loading(provider: Provider) -> Self {
        Self {
            id: format!("{provider}-{}", Utc::now().timestamp_millis()),
            provider,
            status: ResponseStatus::Loading,
        }
    }

    /// Move out of `Loading` exactly once. Returns false if already settled.
    pub fn settle(&mut self, outcome: Result<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = match outcome {
            Ok(content) => ResponseStatus::Success { content },
            Err(_) => ResponseStatus::Error {
                message: GENERIC_RESPONSE_ERROR.into(),
            },
        };
        true
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, ResponseStatus::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ResponseStatus::Success { .. })
    }

    pub fn content(&self) -> Option<&str> {
        match &self.status {
            ResponseStatus::Success { content } => Some(content),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SummaryStatus {
    Loading,
    Success {
        summary_text: String,
        sources: Vec<GroundingSource>,
    },
    Error {
        message: String,
    },
}

/// The synthesis card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResult {
    pub id: String,
    #[serde(flatten)]
    pub status: SummaryStatus,
}

impl SummaryResult {
    pub fn loading() -> Self {
        Self {
            id: SUMMARY_ID.into(),
            status: SummaryStatus::Loading,
        }
    }

    /// Move out of `Loading` exactly once. Returns false if already settled.
    pub fn settle(&mut self, outcome: Result<Synthesis>) -> bool {
        if !matches!(self.status, SummaryStatus::Loading) {
            return false;
        }
        self.status = match outcome {
            Ok(Synthesis {
                summary_text,
                sources,
            }) => SummaryStatus::Success {
                summary_text,
                sources,
            },
            Err(_) => SummaryStatus::Error {
                message: GENERIC_SUMMARY_ERROR.into(),
            },
        };
        true
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, SummaryStatus::Success { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRun {
    pub prompt: String,
    pub responses: Vec<GenerationResult>,
    /// Unset when no provider succeeded.
    pub summary: Option<SummaryResult>,
}

impl ComparisonRun {
    /// Successful answers in selection order.
    pub fn successful_responses(&self) -> Vec<ProviderResponse> {
        self.responses
            .iter()
            .filter_map(|r| {
                r.content().map(|content| ProviderResponse {
                    provider: r.provider,
                    content: content.to_string(),
                })
            })
            .collect()
    }

    pub fn response(&self, provider: Provider) -> Option<&GenerationResult> {
        self.responses.iter().find(|r| r.provider == provider)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Dispatched,
    Collected,
    Synthesizing,
    Synthesized,
    NoSynthesis,
}

/// Progress hooks for a presentation layer. All default to no-ops.
pub trait RunObserver {
    fn phase_changed(&self, _phase: RunPhase) {}
    fn responses_changed(&self, _responses: &[GenerationResult]) {}
    fn summary_changed(&self, _summary: &SummaryResult) {}
}

struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Releases the in-flight flag however the run ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Orchestrator {
    config: Config,
    credentials: Arc<CredentialStore>,
    primary: Arc<dyn PrimaryModel>,
    overrides: HashMap<Provider, Arc<dyn ModelClient>>,
    in_flight: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        credentials: Arc<CredentialStore>,
        primary: Arc<dyn PrimaryModel>,
    ) -> Self {
        Self {
            config,
            credentials,
            primary,
            overrides: HashMap::new(),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Use `client` for `provider` instead of building one from config.
    pub fn with_client(mut self, provider: Provider, client: Arc<dyn ModelClient>) -> Self {
        self.overrides.insert(provider, client);
        self
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn run(&self, prompt: &str, providers: &[Provider]) -> Result<ComparisonRun> {
        self.run_with_observer(prompt, providers, &NoopObserver).await
    }

    /// Run one comparison. Fails only when the run is rejected up front
    /// (already busy, empty prompt, bad selection); provider and synthesis
    /// failures are reported inside the returned [`ComparisonRun`].
    pub async fn run_with_observer(
        &self,
        prompt: &str,
        providers: &[Provider],
        observer: &dyn RunObserver,
    ) -> Result<ComparisonRun> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            warn!("comparison already in flight, dropping submission");
            return Err(Error::Busy);
        };

        if prompt.trim().is_empty() {
            return Err(Error::selection("prompt is empty"));
        }
        let selection = self.normalize_selection(providers)?;

        // dispatched
        let mut responses: Vec<GenerationResult> =
            selection.iter().map(|&p| GenerationResult::loading(p)).collect();
        info!(providers = ?selection, "dispatching prompt");
        observer.phase_changed(RunPhase::Dispatched);
        observer.responses_changed(&responses);

        let calls = selection.iter().map(|&p| self.call_provider(p, prompt));
        let outcomes = join_all(calls).await;

        // collected
        for (result, outcome) in responses.iter_mut().zip(outcomes) {
            if let Err(e) = &outcome {
                error!(provider = %result.provider, error = %e, "provider call failed");
            }
            result.settle(outcome);
        }
        let succeeded = responses.iter().filter(|r| r.is_success()).count();
        info!(succeeded, failed = responses.len() - succeeded, "responses collected");
        observer.phase_changed(RunPhase::Collected);
        observer.responses_changed(&responses);

        let mut run = ComparisonRun {
            prompt: prompt.to_string(),
            responses,
            summary: None,
        };

        let successful = run.successful_responses();
        if successful.is_empty() {
            info!("no successful responses, skipping synthesis");
            observer.phase_changed(RunPhase::NoSynthesis);
            observer.phase_changed(RunPhase::Idle);
            return Ok(run);
        }

        let mut summary = SummaryResult::loading();
        observer.phase_changed(RunPhase::Synthesizing);
        observer.summary_changed(&summary);

        let outcome = self.call_synthesis(prompt, &successful).await;
        match &outcome {
            Ok(synthesis) => log_analysis_quality(&synthesis.summary_text, successful.len()),
            Err(e) => error!(error = %e, "synthesis failed"),
        }
        summary.settle(outcome);

        observer.phase_changed(RunPhase::Synthesized);
        observer.summary_changed(&summary);
        run.summary = Some(summary);

        observer.phase_changed(RunPhase::Idle);
        Ok(run)
    }

    /// Drop duplicates (first wins) and enforce the selection bounds.
    fn normalize_selection(&self, providers: &[Provider]) -> Result<Vec<Provider>> {
        let mut selection: Vec<Provider> = Vec::with_capacity(providers.len());
        for &p in providers {
            if !selection.contains(&p) {
                selection.push(p);
            }
        }

        let bounds = &self.config.orchestrator;
        if selection.len() < bounds.min_selection || selection.len() > bounds.max_selection {
            return Err(Error::selection(format!(
                "select between {} and {} providers (got {})",
                bounds.min_selection,
                bounds.max_selection,
                selection.len()
            )));
        }
        Ok(selection)
    }

    fn client_for(&self, provider: Provider) -> Result<Arc<dyn ModelClient>> {
        if let Some(client) = self.overrides.get(&provider) {
            return Ok(Arc::clone(client));
        }
        llm::build_client(
            provider,
            &self.config,
            &self.credentials,
            Arc::clone(&self.primary),
        )
    }

    async fn call_provider(&self, provider: Provider, prompt: &str) -> Result<String> {
        let client = self.client_for(provider)?;
        let timeout = self.config.orchestrator.request_timeout();
        match tokio::time::timeout(timeout, client.generate_response(prompt)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Timeout {
                provider,
                secs: timeout.as_secs(),
            }),
        }
    }

    async fn call_synthesis(
        &self,
        prompt: &str,
        responses: &[ProviderResponse],
    ) -> Result<Synthesis> {
        let timeout = self.config.orchestrator.request_timeout();
        match tokio::time::timeout(timeout, self.primary.generate_synthesis(prompt, responses))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::synthesis(format!(
                "no answer within {}s",
                timeout.as_secs()
            ))),
        }
    }
}

/// The judge's output is passed through untouched; this only logs problems.
fn log_analysis_quality(summary_text: &str, judged: usize) {
    match summary::parse_analysis(summary_text) {
        Ok(analysis) => {
            if analysis.analysis.len() != judged {
                warn!(
                    expected = judged,
                    got = analysis.analysis.len(),
                    "judge returned a different number of verdicts"
                );
            }
            let duplicates = analysis.duplicate_scores();
            if !duplicates.is_empty() {
                warn!(?duplicates, "judge repeated scores across providers");
            }
        }
        Err(e) => warn!(error = %e, "synthesis text is not valid analysis JSON"),
    }
}
