//! Irminsul — wiki-to-store entity synchronizer.
//! Entry point for the `irminsul` binary.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use irminsul_common::{EntityKind, GuardedClient};
use irminsul_config::Config;
use irminsul_ingestion::{
    Catalog, LanceRecordStore, MemoryRecordStore, RecordStore, RunProgress, ScrapeOrchestrator,
    CATALOG_VERSION,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Keeps a local entity store in sync with the wiki", long_about = None)]
struct Cli {
    /// Path to irminsul.toml
    #[arg(long, global = true, env = "IRMINSUL_CONFIG", value_name = "PATH")]
    config: Option<String>,

    /// Log line format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch, extract and reconcile one entity kind; prints the run report as JSON
    Sync {
        /// character | weapon | artifact_set | monster
        kind: EntityKind,

        /// Natural keys to sync; the default catalog when omitted
        keys: Vec<String>,

        /// Reconcile against an empty in-memory store instead of the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the effective catalog for a kind
    Catalog { kind: EntityKind },
    /// Print one persisted record as JSON
    Show { kind: EntityKind, key: String },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("irminsul=debug,info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = Config::load_or_default(cli.config.as_deref()).context("loading configuration")?;
    debug!(db = %config.database.path, base_url = %config.source.base_url, "Configuration loaded");

    match cli.command {
        Command::Sync { kind, keys, dry_run } => sync(&config, kind, keys, dry_run).await,
        Command::Catalog { kind } => catalog(&config, kind),
        Command::Show { kind, key } => show(&config, kind, &key).await,
    }
}

async fn sync(config: &Config, kind: EntityKind, keys: Vec<String>, dry_run: bool) -> anyhow::Result<()> {
    let client = GuardedClient::new(
        &config.source.allowed_hosts,
        config.scraper.timeout(),
        config.scraper.max_connections_per_host,
    )?;
    if !client.is_allowed(&config.source.base_url) {
        warn!(base_url = %config.source.base_url, "source.base_url host is not in source.allowed_hosts; every fetch will be refused");
    }

    let store: Arc<dyn RecordStore> = if dry_run {
        info!("Dry run: writes go to an in-memory store");
        Arc::new(MemoryRecordStore::new())
    } else {
        info!(path = %config.database.path, "Opening LanceDB");
        Arc::new(LanceRecordStore::open(&config.database.path).await.context("opening record store")?)
    };

    let (progress_tx, progress_rx) = broadcast::channel(256);
    let orchestrator = ScrapeOrchestrator::from_config(config, Arc::new(client), store)?
        .with_progress(progress_tx);
    tokio::spawn(log_progress(progress_rx));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    let keys = (!keys.is_empty()).then_some(keys);
    match orchestrator.run(kind, keys, cancel).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(aborted) => {
            println!("{}", serde_json::to_string_pretty(&aborted.partial)?);
            error!(reason = %aborted.reason, "Run aborted");
            Err(aborted.into())
        }
    }
}

async fn log_progress(mut rx: broadcast::Receiver<RunProgress>) {
    loop {
        match rx.recv().await {
            Ok(p) => info!(
                natural_key = %p.natural_key,
                stage = ?p.stage,
                done = p.outcome_so_far.total(),
                errors = p.outcome_so_far.errors,
                "Target finished"
            ),
            Err(broadcast::error::RecvError::Lagged(n)) => debug!(skipped = n, "Progress log lagging"),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn catalog(config: &Config, kind: EntityKind) -> anyhow::Result<()> {
    let catalog = Catalog::new(&config.source.base_url, config.catalog.clone())?;
    let keys = catalog.keys(kind);
    let out = serde_json::json!({
        "version": CATALOG_VERSION,
        "kind": kind,
        "count": keys.len(),
        "keys": keys,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn show(config: &Config, kind: EntityKind, key: &str) -> anyhow::Result<()> {
    let store = LanceRecordStore::open(&config.database.path).await.context("opening record store")?;
    match store.find_by_natural_key(kind, key).await? {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        None => anyhow::bail!("no {kind} record for {key:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_sync_with_keys() {
        let cli = Cli::try_parse_from(["irminsul", "sync", "weapons", "Alpha", "Beta", "--dry-run"]).unwrap();
        match cli.command {
            Command::Sync { kind, keys, dry_run } => {
                assert_eq!(kind, EntityKind::Weapon);
                assert_eq!(keys, vec!["Alpha", "Beta"]);
                assert!(dry_run);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["irminsul", "catalog", "dragon"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "irminsul", "show", "character", "琴", "--log-format", "json", "--config", "x.toml",
        ])
        .unwrap();
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert_eq!(cli.config.as_deref(), Some("x.toml"));
    }
}
