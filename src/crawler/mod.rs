//! Crawler module for catalog page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with transient/permanent error classification
//! - Product extraction from listing pages
//! - Page dispatch over a bounded worker pool
//! - Overall run control

mod controller;
mod extractor;
mod fetcher;
mod scheduler;

pub use controller::RunController;
pub use extractor::{
    extract_page, CatalogExtractor, ExtractionError, PageExtraction, PageExtractor,
    ProductRecord, UNKNOWN_CATEGORY,
};
pub use fetcher::{
    build_http_client, classify_status, FetchClient, FetchError, FetchResult, PageRequest,
};
pub use scheduler::{CrawlScheduler, PageOutcome, SchedulerSettings};

use crate::config::Config;
use crate::output::RunSummary;
use crate::CrawlError;

/// Runs a complete crawl
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the configuration
/// 2. Build the HTTP client and extractor
/// 3. Fetch and extract pages with the worker pool
/// 4. Write the records to the output file
/// 5. Return the run summary
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `config_hash` - Hash of the configuration file, recorded in the summary
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run reached a terminal state
/// * `Err(CrawlError)` - The run could not be started
pub async fn crawl(config: Config, config_hash: &str) -> Result<RunSummary, CrawlError> {
    RunController::new(config)?
        .with_config_hash(config_hash)
        .run()
        .await
}
