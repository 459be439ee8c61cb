//! Spindle main entry point
//!
//! This is the command-line interface for the Spindle crawler.

use anyhow::{Context, Result};
use clap::Parser;
use spindle_crawl::config::{load_config_with_hash, validate, Config};
use spindle_crawl::crawler::{CrawlEngine, CrawlEvent, CrawlObserver, CrawlSummary};
use spindle_crawl::{CheckpointStore, FileCheckpointStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Spindle: a concurrent, resumable web crawler
///
/// Spindle follows links outward from a seed URL with a pool of workers and
/// checkpoints its progress, so an interrupted crawl picks up where it left off.
#[derive(Parser, Debug)]
#[command(name = "spindle-crawl")]
#[command(version)]
#[command(about = "A concurrent, resumable web crawler", long_about = None)]
struct Cli {
    /// Start URL (must begin with http:// or https://); ignored when resuming
    #[arg(value_name = "SEED")]
    seed: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Per-fetch timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Newly visited URLs between checkpoints (0 disables periodic checkpoints)
    #[arg(long, value_name = "N")]
    checkpoint_interval: Option<usize>,

    /// Checkpoint file location
    #[arg(long, value_name = "PATH", conflicts_with = "no_checkpoint")]
    checkpoint: Option<PathBuf>,

    /// Neither read nor write checkpoints
    #[arg(long)]
    no_checkpoint: bool,

    /// Delete any existing checkpoint and start from the seed
    #[arg(long, conflicts_with = "no_checkpoint")]
    fresh: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(&cli)?;

    if cli.fresh && config.checkpoint.enabled {
        let store = FileCheckpointStore::new(config.checkpoint.path.clone());
        store
            .clear()
            .with_context(|| format!("Failed to remove {}", store.path().display()))?;
        tracing::info!("Starting fresh crawl (removed previous checkpoint)");
    }

    let engine = CrawlEngine::from_config(&config)?
        .with_observer(Arc::new(ConsoleObserver { quiet: cli.quiet }));

    let stop = engine.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight fetches");
            stop.stop();
        }
    });

    match engine.run(&cli.seed).await {
        Ok(summary) => {
            print_summary(&summary, &config, cli.quiet);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("spindle_crawl=info,warn"),
            1 => EnvFilter::new("spindle_crawl=debug,info"),
            2 => EnvFilter::new("spindle_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, if any, then applies command-line overrides
fn load(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.crawler.fetch_timeout_ms = timeout_ms;
    }
    if let Some(interval) = cli.checkpoint_interval {
        config.crawler.checkpoint_interval = interval;
    }
    if let Some(path) = &cli.checkpoint {
        config.checkpoint.path = path.clone();
    }
    if cli.no_checkpoint {
        config.checkpoint.enabled = false;
    }

    validate(&config)?;
    Ok(config)
}

/// Prints progress events to the terminal
struct ConsoleObserver {
    quiet: bool,
}

impl CrawlObserver for ConsoleObserver {
    fn observe(&self, event: CrawlEvent) {
        if self.quiet {
            return;
        }
        match event {
            CrawlEvent::UrlFetched { url } => println!("Found: {}", url),
            CrawlEvent::Progress { count, total } => {
                tracing::debug!("Progress: {}/{}", count, total)
            }
            CrawlEvent::Completed { drained, .. } => {
                if drained {
                    println!("\n✓ Crawling complete");
                } else {
                    println!("\n✗ Crawling stopped");
                }
            }
        }
    }
}

fn print_summary(summary: &CrawlSummary, config: &Config, quiet: bool) {
    if quiet {
        return;
    }

    println!("  Fetched: {}", summary.fetched);
    println!("  Failed: {}", summary.failed);
    println!("  Visited: {}", summary.visited);
    println!("  Pending: {}", summary.pending);

    if config.checkpoint.enabled {
        println!(
            "  Checkpoints: {} (saved to {})",
            summary.checkpoints,
            config.checkpoint.path.display()
        );
        if !summary.drained {
            println!("\nRun again to resume, or pass --fresh to start over.");
        }
    }
}
