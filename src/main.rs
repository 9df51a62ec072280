use anyhow::{Context, Result, bail};
use clap::Parser;
use llm_comparator::config::Config;
use llm_comparator::credentials::{CredentialStore, FileStore, PERPLEXITY_MODEL_SETTING};
use llm_comparator::llm::{GeminiClient, PrimaryModel, Provider};
use llm_comparator::orchestrator::{
    GenerationResult, Orchestrator, RunObserver, RunPhase, SummaryResult,
};
use llm_comparator::output;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "llm-comparator",
    about = "Ask several LLMs the same question and get a fact-checked, scored comparison"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value = "comparator.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Send one prompt to the selected providers and judge the answers
    Compare {
        prompt: String,

        /// Providers to ask: gemini, chatgpt, copilot, perplexity
        #[arg(short, long, value_delimiter = ',', default_value = "gemini,chatgpt")]
        models: Vec<Provider>,

        /// Print the run as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Save a provider API key; omit the key to remove it
    Key {
        provider: Provider,
        secret: Option<String>,
    },

    /// Save a provider setting (e.g. perplexity modelName); omit the value to remove it
    Setting {
        provider: Provider,
        name: String,
        value: Option<String>,
    },

    /// Show which providers are configured
    Status,
}

struct Progress;

impl RunObserver for Progress {
    fn phase_changed(&self, phase: RunPhase) {
        match phase {
            RunPhase::Dispatched => eprintln!("Asking providers..."),
            RunPhase::Synthesizing => eprintln!("Judging answers..."),
            RunPhase::NoSynthesis => eprintln!("No provider answered; skipping the summary."),
            _ => {}
        }
    }

    fn responses_changed(&self, responses: &[GenerationResult]) {
        let done = responses.iter().filter(|r| r.is_terminal()).count();
        eprintln!("  {done}/{} answered", responses.len());
    }

    fn summary_changed(&self, summary: &SummaryResult) {
        if summary.is_success() {
            eprintln!("  summary ready");
        }
    }
}

fn open_credentials(config: &Config) -> CredentialStore {
    CredentialStore::new(FileStore::new(config.credentials.resolved_path()))
}

fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path)?;
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "llm_comparator=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Command::Compare {
            prompt,
            models,
            json,
        } => {
            let credentials = Arc::new(open_credentials(&config));
            let primary: Arc<dyn PrimaryModel> = Arc::new(GeminiClient::from_config(
                &config.primary,
                config.orchestrator.request_timeout(),
            )?);
            let orchestrator = Orchestrator::new(config, credentials, primary);

            let run = orchestrator
                .run_with_observer(&prompt, &models, &Progress)
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&run)?);
            } else {
                print!("{}", output::render_text(&run));
            }
            Ok(())
        }
        Command::Key { provider, secret } => {
            if !CredentialStore::is_configurable(provider) {
                bail!("{provider} is configured through the {} environment variable", config.primary.api_key_env);
            }
            let credentials = open_credentials(&config);
            let secret = secret.unwrap_or_default();
            credentials.save(provider, &secret);
            if secret.is_empty() {
                println!("Removed {provider} API key");
            } else {
                println!("Saved {provider} API key");
            }
            Ok(())
        }
        Command::Setting {
            provider,
            name,
            value,
        } => {
            if !CredentialStore::is_configurable(provider) {
                bail!("{provider} has no configurable settings");
            }
            let credentials = open_credentials(&config);
            credentials.save_setting(provider, &name, value.as_deref().unwrap_or_default());
            println!("Updated {provider} setting '{name}'");
            Ok(())
        }
        Command::Status => {
            let credentials = open_credentials(&config);
            let primary_ready = std::env::var(&config.primary.api_key_env)
                .is_ok_and(|k| !k.trim().is_empty());
            println!(
                "Gemini      {} ({})",
                if primary_ready { "configured" } else { "NOT configured" },
                config.primary.api_key_env
            );
            for &provider in CredentialStore::configurable_providers() {
                let state = if credentials.has_credential(provider) {
                    "API key saved"
                } else {
                    "simulated via Gemini"
                };
                println!("{:<11} {state}", provider.to_string());
            }
            let model = credentials
                .get_setting(Provider::Perplexity, PERPLEXITY_MODEL_SETTING)
                .unwrap_or_else(|| config.perplexity.model.clone());
            println!("Perplexity model: {model}");
            println!("Credentials: {}", config.credentials.resolved_path().display());
            Ok(())
        }
    }
}
