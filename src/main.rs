//! Site-Archiver main entry point
//!
//! This is the command-line interface for the Site-Archiver crawler.

use anyhow::Context;
use clap::Parser;
use site_archiver::config::{load_config_with_hash, Config};
use site_archiver::crawler::{Coordinator, CrawlOptions};
use site_archiver::output::{load_statistics, print_statistics, run_extraction};
use site_archiver::storage::{open_storage, Storage};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Site-Archiver: a resumable single-site crawler
///
/// Site-Archiver crawls one site breadth-first, saves every page it visits
/// and checkpoints its progress so the next run continues where this one
/// stopped.
#[derive(Parser, Debug)]
#[command(name = "site-archiver")]
#[command(version = "1.0.0")]
#[command(about = "A resumable single-site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Read seed URLs from a file (one per line) instead of the config
    #[arg(long, value_name = "PATH")]
    seeds_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore the pending checkpoint and start again from the seeds
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "extract"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "extract"])]
    stats: bool,

    /// Extract page statistics from the archived pages and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    extract: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.seeds_file.as_deref())
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.extract {
        handle_extract(&config)
    } else {
        let options = CrawlOptions {
            fresh: cli.fresh,
            seeds_file: cli.seeds_file,
            config_hash,
        };
        handle_crawl(config, options).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_archiver=info,warn"),
            1 => EnvFilter::new("site_archiver=debug,info"),
            2 => EnvFilter::new("site_archiver=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, seeds_file: Option<&Path>) -> anyhow::Result<()> {
    println!("=== Site-Archiver Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max pages per run: {}", config.crawler.max_pages);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Canonical scheme: {}", config.crawler.canonical_scheme);
    if let Some(secs) = config.crawler.max_duration_secs {
        println!("  Max duration: {}s", secs);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nTracking:");
    println!("  utm_source: {}", config.tracking.utm_source);
    println!("  utm_medium: {}", config.tracking.utm_medium);
    println!(
        "  utm_campaign: {}",
        config
            .tracking
            .utm_campaign
            .as_deref()
            .unwrap_or("(current month)")
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Archive directory: {}", config.output.archive_dir);
    println!("  Text directory: {}", config.output.text_dir);

    let seeds = match seeds_file {
        Some(path) => site_archiver::config::load_seeds_file(path)?,
        None => config.seeds.clone(),
    };
    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    let db_path = Path::new(&config.output.database_path);
    if db_path.exists() {
        let storage = open_storage(db_path)?;
        match storage.load_pending() {
            Ok(Some(pending)) => println!(
                "\nA pending checkpoint with {} URLs would be resumed (use --fresh to use the seeds)",
                pending.len()
            ),
            Ok(None) => println!("\nNo pending checkpoint; the seeds would be used"),
            Err(e) => println!("\nCheckpoint unreadable ({}); the seeds would be used", e),
        }
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --extract mode: mines the archived pages for statistics
fn handle_extract(config: &Config) -> anyhow::Result<()> {
    let mut storage = open_storage(Path::new(&config.output.database_path))?;
    let summary = run_extraction(&mut storage, Path::new(&config.output.text_dir))?;

    println!(
        "Extracted {} pages ({} skipped) into {}",
        summary.processed, summary.skipped, config.output.text_dir
    );

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, options: CrawlOptions) -> anyhow::Result<()> {
    if options.fresh {
        tracing::info!("Starting fresh crawl (ignoring the pending checkpoint)");
    } else {
        tracing::info!("Starting crawl (will resume from the checkpoint if one exists)");
    }

    let coordinator = Coordinator::new(config, options)?;

    // Ctrl-C stops dispatching; in-flight pages finish and the checkpoint is written
    let stop = coordinator.stop_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            stop.trigger();
        }
    });

    match coordinator.run().await {
        Ok(report) => {
            println!("Total visited URLs: {}", report.total_visited);
            println!(
                "Pages archived this run: {} ({})",
                report.pages_visited, report.state
            );
            println!("Checkpoint saved to: {}", report.checkpoint_location);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
