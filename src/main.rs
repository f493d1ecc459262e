//! Repo-Harvest main entry point
//!
//! This is the command-line interface for the Repo-Harvest keyword indexer.

use anyhow::Context;
use clap::Parser;
use repo_harvest::config::{load_config_with_hash, Config};
use repo_harvest::crawler::{page_limit, run_crawl};
use repo_harvest::output::{load_statistics, print_run_summary, print_statistics, TOP_KEYWORDS};
use repo_harvest::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Repo-Harvest: a keyword index builder for code search results
///
/// Repo-Harvest finds every repository whose package manifest carries a
/// signature, and indexes each one by keywords extracted from its README
/// and by the names of its source files.
#[derive(Parser, Debug)]
#[command(name = "repo-harvest")]
#[command(version)]
#[command(about = "Builds a keyword index of repositories found by code search", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// GitHub access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Lower bound of the file-size domain (overrides the configuration)
    #[arg(long, value_name = "BYTES")]
    from: Option<i64>,

    /// Upper bound of the file-size domain (overrides the configuration)
    #[arg(long, value_name = "BYTES")]
    to: Option<i64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    fn domain(&self, config: &Config) -> (i64, i64) {
        (
            self.from.unwrap_or(config.search.domain_from),
            self.to.unwrap_or(config.search.domain_to),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&cli, &config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&cli, &config, &config_hash).await?;
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
            0 => EnvFilter::new("repo_harvest=info,warn"),
            1 => EnvFilter::new("repo_harvest=debug,info"),
            2 => EnvFilter::new("repo_harvest=trace,debug"),
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
fn handle_dry_run(cli: &Cli, config: &Config) {
    let (from, to) = cli.domain(config);

    println!("=== Repo-Harvest Dry Run ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  User agent: {}", config.api.user_agent);
    println!("  Retry cooldown: {}s", config.api.cooldown_secs);
    let token_source = if cli.token.is_some() {
        "command line / GITHUB_TOKEN"
    } else if config.api.token.is_some() {
        "configuration file"
    } else {
        "none (unauthenticated)"
    };
    println!("  Token: {}", token_source);

    println!("\nSearch:");
    println!("  Signature: {}", config.search.signature);
    println!("  Filename: {}", config.search.filename);
    println!("  Size domain: {}..{}", from, to);
    println!(
        "  Result cap: {} ({} per page, at most {} pages)",
        config.search.result_cap,
        config.search.per_page,
        page_limit(&config.search)
    );
    println!("  Fallback qualifier: {}", config.search.fallback_qualifier);

    println!("\nCrawler:");
    println!("  Source extension: .{}", config.crawler.source_extension);
    println!(
        "  Stop words: {}",
        config
            .crawler
            .stopwords_path
            .as_deref()
            .unwrap_or("built-in list")
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
    if from < 0 {
        println!("✗ Size domain starts below zero: {}", from);
    } else if from > to {
        println!("✗ Size domain is empty: {} > {}", from, to);
    } else {
        println!("✓ Would search sizes {}..{}", from, to);
    }
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    // Open the database
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open {}", config.output.database_path))?;

    // Load statistics
    let stats = load_statistics(&storage, TOP_KEYWORDS)?;

    // Print statistics
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(cli: &Cli, config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let (from, to) = cli.domain(config);
    tracing::info!(
        "Searching '{}' in {} over sizes {}..{}",
        config.search.signature,
        config.search.filename,
        from,
        to
    );
    if cli.token.is_none() && config.api.token.is_none() {
        tracing::warn!("No access token configured; rate limits will be very low");
    }

    // Run the crawler
    match run_crawl(config, cli.token.as_deref(), config_hash, Some((from, to))).await {
        Ok(summary) => {
            tracing::info!("Crawl completed successfully");
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e).context("Crawl failed")
        }
    }
}
