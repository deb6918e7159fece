//! Catalog-Crawl main entry point
//!
//! This is the command-line interface for the Catalog-Crawl product scraper.

use catalog_crawl::config::{hash_content, load_config_with_hash, validate, Config};
use catalog_crawl::crawler::{crawl, SchedulerSettings};
use catalog_crawl::output::print_summary;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Exit code for configuration and startup failures
const EXIT_STARTUP_FAILURE: u8 = 2;

/// Catalog-Crawl: a polite paginated catalog scraper
///
/// Catalog-Crawl requests the listing pages of one e-commerce site with a small
/// pool of workers, extracts title, price, category and link of every product
/// and writes them in page order to a CSV file.
#[derive(Parser, Debug)]
#[command(name = "catalog-crawl")]
#[command(version = "1.0.0")]
#[command(about = "A polite paginated catalog scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults if omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the pages that would be requested without crawling
    #[arg(long)]
    dry_run: bool,

    /// Override the number of pages to request
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Override the number of concurrent workers
    #[arg(long, value_name = "N")]
    workers: Option<u32>,

    /// Override the first page index (resume an interrupted crawl)
    #[arg(long, value_name = "N")]
    start_page: Option<u32>,

    /// Append to the output file instead of replacing it
    #[arg(long)]
    append: bool,

    /// Override the CSV output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Also write log lines to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(max_pages) = self.max_pages {
            config.crawler.max_pages = max_pages;
        }
        if let Some(workers) = self.workers {
            config.crawler.worker_count = workers;
        }
        if let Some(start_page) = self.start_page {
            config.crawler.start_page = start_page;
        }
        if self.append {
            config.output.append = true;
        }
        if let Some(output) = &self.output {
            config.output.path = output.display().to_string();
        }
        if let Some(log_file) = &self.log_file {
            config.logging.file = Some(log_file.display().to_string());
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load before logging is set up; the config may name the log file
    let loaded = match &cli.config {
        Some(path) => load_config_with_hash(path).map(|(mut config, hash)| {
            cli.apply_overrides(&mut config);
            (config, hash)
        }),
        None => {
            let mut config = Config::default();
            cli.apply_overrides(&mut config);
            Ok((config, hash_content("")))
        }
    };

    let log_file = match &loaded {
        Ok((config, _)) => config.logging.file.as_ref().map(PathBuf::from),
        Err(_) => cli.log_file.clone(),
    };
    if let Err(e) = setup_logging(cli.verbose, cli.quiet, log_file.as_deref()) {
        eprintln!("Failed to open log file: {}", e);
        return ExitCode::from(EXIT_STARTUP_FAILURE);
    }

    let (config, config_hash) = match loaded {
        Ok((config, hash)) => {
            match &cli.config {
                Some(path) => tracing::info!(
                    "Configuration loaded from {} (hash: {})",
                    path.display(),
                    hash
                ),
                None => tracing::info!("No configuration file given, using defaults"),
            }
            (config, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return ExitCode::from(EXIT_STARTUP_FAILURE);
        }
    };

    if let Err(e) = validate(&config) {
        tracing::error!("Invalid configuration: {}", e);
        return ExitCode::from(EXIT_STARTUP_FAILURE);
    }

    if cli.dry_run {
        return match handle_dry_run(&config, &config_hash) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("Dry run failed: {}", e);
                ExitCode::from(EXIT_STARTUP_FAILURE)
            }
        };
    }

    handle_crawl(config, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Console output always goes to stdout; with `log_file`, the same lines are
/// appended to that file without colors.
fn setup_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_crawl=info,warn"),
            1 => EnvFilter::new("catalog_crawl=debug,info"),
            2 => EnvFilter::new("catalog_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false),
        )
        .with(file_layer)
        .init();

    Ok(())
}

/// Handles the --dry-run mode: shows the resolved configuration and planned pages
fn handle_dry_run(config: &Config, config_hash: &str) -> Result<(), Box<dyn std::error::Error>> {
    let settings = SchedulerSettings::from_config(config)?;

    println!("=== Catalog-Crawl Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Page parameter: {}", config.site.page_param);
    println!("  Pagination: {:?}", config.site.pagination);
    println!("  User agent: {}", config.user_agent.value);
    for (name, value) in &config.site.headers {
        println!("  Header: {}: {}", name, value);
    }

    println!("\nCrawler Configuration:");
    println!("  Start page: {}", config.crawler.start_page);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Workers: {}", config.crawler.worker_count);
    println!("  Timeout: {}s", config.crawler.timeout_seconds);
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay_ms);
    println!("  Retry backoff: {}ms", config.crawler.retry_backoff_ms);
    println!(
        "  Max consecutive failures: {}",
        config.crawler.max_consecutive_failures
    );

    println!("\nOutput:");
    println!("  CSV: {}", config.output.path);
    println!("  Append: {}", config.output.append);
    if let Some(summary_path) = &config.output.summary_path {
        println!("  Summary: {}", summary_path);
    }
    if let Some(log_file) = &config.logging.file {
        println!("  Log file: {}", log_file);
    }

    let planned = settings.planned_urls();
    println!("\nPages ({}):", planned.len());
    for (page_index, url) in &planned {
        println!("  {:>4}  {}", page_index, url);
    }

    println!("\n✓ Configuration is valid (hash: {})", config_hash);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> ExitCode {
    match crawl(config, config_hash).await {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::from(summary.exit_code())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            ExitCode::from(EXIT_STARTUP_FAILURE)
        }
    }
}
