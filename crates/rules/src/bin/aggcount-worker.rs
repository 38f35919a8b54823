//! aggcount-worker: evaluates every loaded event definition once.
//!
//! Definitions come from a directory of YAML files, messages from a
//! JSON-lines fixture served by the in-memory backend. Each emitted event is
//! printed to stdout as one JSON object, together with its re-fetched
//! source messages.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::json;
use tracing::{error, info, warn};

use aggcount_core::{Config, TimeRange};
use aggcount_rules::audit_log::AuditLog;
use aggcount_rules::loader::{DefinitionLoader, LoadStatus};
use aggcount_rules::memory::MemoryBackend;
use aggcount_rules::processor::{
    AggregationCountProcessor, InMemoryStateStore, ProcessorError, ProcessorParameters,
    ProcessorServices,
};
use aggcount_rules::Backends;

// ── CLI ─────────────────────────────────────────────────────────────

/// Run aggregation-count definitions against a message fixture.
#[derive(Parser, Debug)]
#[command(name = "aggcount-worker", version, about)]
struct Cli {
    /// Directory of event definition YAML files.
    #[arg(long, env = "DEFINITIONS_DIR")]
    definitions_dir: Option<PathBuf>,

    /// JSON-lines file with one stored message per line.
    #[arg(long, env = "MESSAGES_FILE")]
    messages: Option<PathBuf>,

    /// Start of the evaluated range (RFC 3339). Requires --to.
    #[arg(long, requires = "to")]
    from: Option<DateTime<Utc>>,

    /// End of the evaluated range (RFC 3339). Requires --from.
    #[arg(long, requires = "from")]
    to: Option<DateTime<Utc>>,

    /// Window ending now, used when no explicit range is given.
    #[arg(long)]
    window_seconds: Option<u32>,

    /// Source messages re-fetched per emitted event; 0 disables.
    #[arg(long)]
    evidence_limit: Option<u32>,
}

impl Cli {
    fn parameters(&self, config: &Config) -> anyhow::Result<ProcessorParameters> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => ProcessorParameters::with_timerange(from, to)
                .context("invalid --from/--to range"),
            _ => {
                let seconds = self.window_seconds.unwrap_or(config.evaluation.window_seconds);
                let range = TimeRange::last_seconds(seconds).context("invalid window")?;
                Ok(ProcessorParameters::new(range))
            }
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aggcount_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    let definitions_dir = cli
        .definitions_dir
        .clone()
        .unwrap_or_else(|| config.definitions.dir.clone());
    let loader = DefinitionLoader::new(definitions_dir.clone());
    let results = loader
        .load_all()
        .with_context(|| format!("scanning {}", definitions_dir.display()))?;
    let failed = results
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
        .count();
    info!(loaded = loader.len(), failed, dir = %definitions_dir.display(), "definitions loaded");

    let backend = match cli.messages.as_ref().or(config.fixtures.messages_file.as_ref()) {
        Some(path) => MemoryBackend::from_json_lines_file(path)
            .with_context(|| format!("loading messages from {}", path.display()))?,
        None => {
            warn!("no messages file configured, evaluating against an empty store");
            MemoryBackend::default()
        }
    };
    let backend = Arc::new(backend);

    let services = ProcessorServices {
        backends: Backends::from_single(backend.clone()),
        dependency_check: backend,
        state_store: Arc::new(InMemoryStateStore::new()),
        audit_log: AuditLog::new(),
    };

    let parameters = cli.parameters(&config)?;
    let evidence_limit = cli.evidence_limit.unwrap_or(config.evaluation.evidence_limit);
    info!(timerange = %parameters.timerange(), "evaluating definitions");

    let mut emitted = 0usize;
    for definition in loader.definitions() {
        let id = definition.id().to_string();
        let processor = AggregationCountProcessor::new(definition, services.clone());

        let events = match processor.create_events(&parameters).await {
            Ok(events) => events,
            Err(e @ ProcessorError::Precondition { .. }) => {
                warn!(definition_id = %id, error = %e, "skipping definition");
                continue;
            }
            Err(e) => {
                error!(definition_id = %id, error = %e, "evaluation failed");
                continue;
            }
        };

        for event in events {
            let sources = processor
                .source_messages_for_event(&event.event, i64::from(evidence_limit))
                .await
                .unwrap_or_else(|e| {
                    warn!(definition_id = %id, error = %e, "failed to fetch source messages");
                    Vec::new()
                });
            let line = json!({
                "event": event.event,
                "context": event.context,
                "source_messages": sources,
            });
            println!("{}", serde_json::to_string(&line)?);
            emitted += 1;
        }
    }

    info!(events = emitted, "aggcount-worker finished");
    Ok(())
}
