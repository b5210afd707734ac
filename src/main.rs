//! Image Trawler main entry point
//!
//! This is the command-line interface for the Image Trawler same-host image harvester.

use anyhow::Context;
use clap::Parser;
use image_trawler::config::{load_config_with_hash, validate, Config};
use image_trawler::crawler::Coordinator;
use image_trawler::output::print_statistics;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Image Trawler: a same-host image harvester
///
/// Image Trawler crawls a website breadth-first from a seed URL, follows
/// links that stay on the seed's host, and downloads every image it finds
/// into a directory tree mirroring the site, recording each one in a CSV
/// manifest.
#[derive(Parser, Debug)]
#[command(name = "image-trawler")]
#[command(version)]
#[command(about = "A same-host image harvester", long_about = None)]
struct Cli {
    /// Absolute http(s) URL to start crawling from
    #[arg(value_name = "SEED")]
    seed: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory images are stored under (overrides config)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Path of the CSV manifest (overrides config)
    #[arg(short, long, value_name = "FILE")]
    manifest: Option<String>,

    /// Number of concurrent workers (overrides config)
    #[arg(short, long, value_name = "N")]
    workers: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_effective_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&cli.seed, &config)?;
    } else {
        handle_crawl(config, &cli.seed).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("image_trawler=info,warn"),
            1 => EnvFilter::new("image_trawler=debug,info"),
            2 => EnvFilter::new("image_trawler=trace,debug"),
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

/// Loads the config file (if any) and applies command-line overrides
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(dir) = &cli.output_dir {
        config.output.image_dir = dir.clone();
    }
    if let Some(manifest) = &cli.manifest {
        config.output.manifest_path = manifest.clone();
    }
    if let Some(workers) = cli.workers {
        config.crawler.max_workers = workers;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: validates config and seed, shows the effective settings
fn handle_dry_run(seed: &str, config: &Config) -> anyhow::Result<()> {
    let seed = image_trawler::parse_seed(seed).context("Invalid seed URL")?;

    println!("=== Image Trawler Dry Run ===\n");

    println!("Seed: {}", seed);
    println!(
        "  Links followed only on host: {}",
        image_trawler::url::extract_host(&seed).unwrap_or_default()
    );

    println!("\nCrawler Configuration:");
    println!("  Workers: {}", config.crawler.max_workers);
    println!("  User agent: {}", config.crawler.user_agent);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.crawler.request_timeout_secs, config.crawler.connect_timeout_secs
    );

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Backoff: factor {}, capped at {}s",
        config.retry.backoff_factor, config.retry.backoff_max_secs
    );
    println!("  Retry statuses: {:?}", config.retry.retry_statuses);

    println!("\nOutput:");
    println!("  Image directory: {}", config.output.image_dir);
    println!("  Manifest: {}", config.output.manifest_path);

    println!("\nImages:");
    println!(
        "  Excluded extensions: {}",
        config.images.excluded_extensions.join(", ")
    );
    println!(
        "  Disambiguate name collisions: {}",
        config.images.disambiguate_collisions
    );

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, seed: &str) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight work");
            let _ = shutdown_tx.send(true);
        }
    });

    let coordinator = Coordinator::new(config, seed)
        .context("Failed to start crawl")?
        .with_shutdown(shutdown_rx);

    match coordinator.run().await {
        Ok(stats) => {
            tracing::info!("Crawl finished");
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
