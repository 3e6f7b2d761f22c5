use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use triage_api::{build_app, ApiConfig};
use triage_core::{Category, EmailInput, RuleSet, TriageEngine};
use triage_observability::{init_tracing, AppMetrics};
use triage_service::{FeedbackInput, TriageService};
use triage_storage::{Store, DEFAULT_FEEDBACK_FILE};

#[derive(Debug, Parser)]
#[command(name = "triage")]
#[command(about = "Rule-based email triage")]
struct Cli {
    /// JSON rule set replacing the built-in keyword and routing tables.
    #[arg(long, env = "TRIAGE_RULES", global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify a single email. The body is read from stdin when omitted.
    Classify {
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long)]
        body: Option<String>,
    },
    /// Classify a JSON-lines file of `{"subject", "body"}` objects ("-" for stdin).
    Bulk { file: PathBuf },
    /// List the categories in tie-break order.
    Labels,
    /// Record a label correction.
    Feedback {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        predicted: String,
        #[arg(long)]
        correct: String,
        #[arg(long, env = "FEEDBACK_FILE", default_value = DEFAULT_FEEDBACK_FILE)]
        feedback_file: PathBuf,
        #[arg(long, env = "TRIAGE_DATABASE_URL")]
        database_url: Option<String>,
    },
    /// Start the HTTP API using TRIAGE_* environment settings.
    Serve {
        #[arg(long, env = "TRIAGE_BIND")]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("triage_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Classify { subject, body } => {
            let body = match body {
                Some(body) => body,
                None => {
                    let mut buffer = String::new();
                    io::stdin()
                        .read_to_string(&mut buffer)
                        .context("failed reading body from stdin")?;
                    buffer
                }
            };
            let service = build_service(cli.rules.as_deref(), Store::memory())?;
            let result = service.classify(&EmailInput::new(subject, body));
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Bulk { file } => {
            let raw = if file.as_os_str() == "-" {
                let mut buffer = String::new();
                io::stdin().read_to_string(&mut buffer)?;
                buffer
            } else {
                std::fs::read_to_string(&file)
                    .with_context(|| format!("failed reading {}", file.display()))?
            };
            let emails = parse_jsonl_emails(&raw)?;
            let service = build_service(cli.rules.as_deref(), Store::memory())?;
            let bulk = service.bulk_classify(&emails);
            println!("{}", serde_json::to_string_pretty(&bulk)?);
        }
        Command::Labels => {
            let labels = Category::ALL
                .iter()
                .map(|category| category.as_str())
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&labels)?);
        }
        Command::Feedback {
            subject,
            body,
            predicted,
            correct,
            feedback_file,
            database_url,
        } => {
            let predicted = parse_label(&predicted)?;
            let correct = parse_label(&correct)?;
            let store = match database_url {
                Some(url) => Store::sqlite(&url).await?,
                None => Store::jsonl(feedback_file),
            };
            let service = build_service(cli.rules.as_deref(), store)?;
            let record = service
                .record_feedback(FeedbackInput {
                    subject,
                    body,
                    predicted,
                    correct,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Serve { bind } => {
            let mut config = ApiConfig::from_env();
            if let Some(bind) = bind {
                config.bind = bind;
            }
            config.rules_path = cli.rules;
            let bind = config.bind.clone();

            let app = build_app(config).await?;
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("failed binding {bind}"))?;
            tracing::info!(bind = %bind, "mail triage api started");
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

fn build_service(rules: Option<&Path>, store: Store) -> Result<TriageService<Store>> {
    let rules = match rules {
        Some(path) => RuleSet::from_json_file(path)
            .with_context(|| format!("failed loading rule set from {}", path.display()))?,
        None => RuleSet::default(),
    };

    Ok(TriageService::new(
        Arc::new(TriageEngine::new(rules)),
        Arc::new(store),
        AppMetrics::shared(),
    ))
}

fn parse_label(value: &str) -> Result<Category> {
    match Category::parse(value) {
        Some(category) => Ok(category),
        None => bail!(
            "unknown label {value:?}; expected one of: {}",
            Category::ALL.map(Category::as_str).join(", ")
        ),
    }
}

fn parse_jsonl_emails(raw: &str) -> Result<Vec<EmailInput>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<EmailInput>(line)
                .with_context(|| format!("invalid email on line {}", index + 1))
        })
        .collect()
}
