//! Reconciler replay binary
//!
//! Reads newline-delimited JSON transfer events from a file (or stdin),
//! reconciles them, and prints the transfer listing as JSON on stdout.
//!
//! ```text
//! reconciler [--config reconciler.toml] [events.jsonl]
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use transfer_reconciler::{
    config::LoggingConfig, parse_event, spawn_reconciler, Config, FileStorage, IngestResponse,
    Metrics, Storage, TransferLedger,
};

/// Replay transfer events and print the reconciled listing
#[derive(Debug, Parser)]
#[command(name = "reconciler", version, about, long_about = None)]
struct Args {
    /// TOML config file (defaults to environment variables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Newline-delimited JSON events; `-` or omitted reads stdin
    input: Option<PathBuf>,
}

impl Args {
    /// Input file, or `None` for stdin
    fn input_path(&self) -> Option<&Path> {
        self.input.as_deref().filter(|path| *path != Path::new("-"))
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    // stdout carries the listing, logs go to stderr
    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::from_env()?,
    };

    init_tracing(&config.logging);
    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        "Starting transfer reconciler"
    );

    let metrics = Metrics::new()?;
    let ledger = Arc::new(TransferLedger::new().with_metrics(metrics.clone()));

    let storage = config.storage.snapshot_path.clone().map(FileStorage::new);
    if let Some(storage) = &storage {
        ledger.restore(storage.load()?);
    }

    let (handle, tasks) = spawn_reconciler(
        ledger.clone(),
        config.ingest.partitions,
        config.ingest.mailbox_capacity,
    );

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match args.input_path() {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut lines = reader.lines();
    let mut line_no = 0usize;
    let mut rejected = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let event = match parse_event(&line) {
            Ok(event) => event,
            Err(e) => {
                rejected += 1;
                tracing::warn!(line = line_no, error = %e, "Event rejected");
                continue;
            }
        };

        match IngestResponse::from(handle.apply(event).await?) {
            IngestResponse::Duplicate { transfer_id, .. } => {
                tracing::info!(line = line_no, transfer_id = %transfer_id, "Event already processed");
            }
            IngestResponse::Processed {
                transfer_id,
                warnings,
            } => {
                tracing::info!(
                    line = line_no,
                    transfer_id = %transfer_id,
                    warnings = warnings.len(),
                    "Event processed"
                );
            }
        }
    }

    handle.shutdown().await?;
    for task in tasks {
        task.await?;
    }

    println!("{}", serde_json::to_string_pretty(&handle.list_all())?);

    if let Some(storage) = &storage {
        storage.save(&ledger.snapshot())?;
    }

    tracing::info!(
        lines = line_no,
        rejected,
        applied = metrics.events_applied.get(),
        duplicates = metrics.events_duplicate.get(),
        transfers = handle.count(),
        "Replay finished"
    );

    Ok(())
}
