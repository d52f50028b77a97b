use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use ticket_triage::{
    assistant::{Assistant, GeminiClient, LanguageModel},
    config::Config,
    ml::{models::ModelMetrics, train_and_save, ModelStore, TicketClassifier},
};

#[derive(Parser)]
#[command(name = "ticket-triage-cli")]
#[command(about = "Ticket triage CLI", long_about = None)]
struct Cli {
    /// Server address for remote commands
    #[arg(short, long, default_value = "http://localhost:8000")]
    endpoint: String,

    /// Model directory (overrides configuration)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train both classifiers and save the artifacts
    Train {
        /// Training CSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Fall back to the bundled sample table when no CSV is found
        #[arg(long)]
        allow_sample_data: bool,

        /// Fold labels onto the standard department/urgency sets
        #[arg(long)]
        canonicalize_labels: bool,
    },

    /// Classify a ticket with locally saved models
    Predict {
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Get troubleshooting guidance for a ticket
    Assist {
        #[arg(value_name = "TEXT")]
        text: String,

        /// Department; classified with local models when omitted
        #[arg(short, long)]
        ticket_type: Option<String>,
    },

    /// Classify a ticket on a running server
    Classify {
        #[arg(short, long)]
        message: String,

        #[arg(short, long)]
        title: Option<String>,

        /// Shared secret sent as x-classifier-key
        #[arg(short, long, env = "CLASSIFIER_KEY")]
        key: Option<String>,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticket_triage=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(dir) = cli.model_dir {
        config.classifier.model_dir = dir;
    }
    let store = ModelStore::new(config.classifier.model_dir.clone());

    match cli.command {
        Commands::Train {
            data,
            allow_sample_data,
            canonicalize_labels,
        } => {
            let mut settings = config.classifier.clone();
            settings.canonicalize_labels |= canonicalize_labels;
            settings.allow_sample_data |= allow_sample_data;
            let explicit = data.or_else(|| settings.training_data.clone());

            let (_, report) = tokio::task::spawn_blocking(move || {
                train_and_save(&settings, &store, explicit.as_deref())
            })
            .await
            .context("Training task panicked")??;

            println!("{}", serde_json::to_string_pretty(&json!({
                "model_dir": config.classifier.model_dir,
                "data_source": report.data_source,
                "split_strategy": report.split_strategy,
                "training_samples": report.training_samples,
                "test_samples": report.test_samples,
                "evaluation_meaningful": report.evaluation_meaningful,
                "vocab_size": report.vocab_size,
                "type_metrics": metrics_summary(&report.type_metrics),
                "urgency_metrics": metrics_summary(&report.urgency_metrics),
                "duration_ms": report.duration_ms,
            }))?);
        }

        Commands::Predict { text } => {
            let classifier = TicketClassifier::load(config.classifier.pipeline_config(), &store)
                .with_context(|| format!("No usable models in {}", store.dir().display()))?;
            let prediction = classifier.predict(&text)?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }

        Commands::Assist { text, ticket_type } => {
            let ticket_type = match ticket_type {
                Some(t) => t,
                None => {
                    let classifier =
                        TicketClassifier::load(config.classifier.pipeline_config(), &store)
                            .context("Pass --ticket-type or train models first")?;
                    classifier.predict(&text)?.ticket_type
                }
            };

            let backend = GeminiClient::from_config(&config.assistant)?
                .map(|c| Arc::new(c) as Arc<dyn LanguageModel>);
            let assistance = Assistant::new(backend)
                .get_assistance(&text, &ticket_type)
                .await;
            println!("{}", serde_json::to_string_pretty(&assistance)?);
        }

        Commands::Classify {
            message,
            title,
            key,
        } => {
            let client = Client::new();
            let mut request = client
                .post(format!("{}/classify", cli.endpoint))
                .json(&json!({
                    "title": title,
                    "message": message,
                }));
            if let Some(key) = key {
                request = request.header("x-classifier-key", key);
            }

            let response = request.send().await?;
            let status = response.status();
            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            if !status.is_success() {
                anyhow::bail!("Server returned {}", status);
            }
        }

        Commands::Health => {
            let client = Client::new();
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

/// Accuracy, macro averages and the per-class breakdown
fn metrics_summary(metrics: &ModelMetrics) -> serde_json::Value {
    json!({
        "accuracy": metrics.accuracy,
        "precision": metrics.precision,
        "recall": metrics.recall,
        "f1_score": metrics.f1_score,
        "per_class": metrics.per_class_metrics,
    })
}
