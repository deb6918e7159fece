//! Run controller - top-level crawl orchestration
//!
//! This module ties the pieces of a run together:
//! - Validating the configuration snapshot
//! - Building the HTTP client, extractor and output sink
//! - Running the scheduler to a terminal state
//! - Flushing the remaining records and finalizing the summary
//! - Writing the optional markdown summary

use crate::config::{validate, Config};
use crate::crawler::extractor::{CatalogExtractor, PageExtractor};
use crate::crawler::fetcher::FetchClient;
use crate::crawler::scheduler::{CrawlScheduler, SchedulerSettings};
use crate::output::{
    generate_markdown_summary, CsvStore, ErrorStage, RecordStore, ResultSink, RunSummary,
};
use crate::CrawlError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Owns one crawl run from configuration to summary
pub struct RunController {
    config: Config,
    config_hash: String,
    extractor: Option<Arc<dyn PageExtractor>>,
    store: Option<Box<dyn RecordStore + Send>>,
}

impl RunController {
    /// Creates a controller for a validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(RunController)` - Configuration is valid
    /// * `Err(CrawlError::Config)` - Configuration was rejected
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        validate(&config)?;

        Ok(Self {
            config,
            config_hash: String::new(),
            extractor: None,
            store: None,
        })
    }

    /// Sets the configuration hash recorded in the summary
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    /// Replaces the selector-driven extractor
    pub fn extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Replaces the CSV output file
    pub fn store(mut self, store: Box<dyn RecordStore + Send>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the crawl
    ///
    /// Per-page and output errors are absorbed into the returned summary; only
    /// startup failures are returned as `Err`.
    pub async fn run(self) -> Result<RunSummary, CrawlError> {
        let Self {
            config,
            config_hash,
            extractor,
            store,
        } = self;

        let settings = SchedulerSettings::from_config(&config)?;
        let fetcher = FetchClient::from_config(&config)?;

        let extractor: Arc<dyn PageExtractor> = match extractor {
            Some(extractor) => extractor,
            None => Arc::new(CatalogExtractor::new(
                &config.selectors,
                settings.base_url.clone(),
                config.site.pagination,
            )?),
        };

        let store: Box<dyn RecordStore + Send> = match store {
            Some(store) => store,
            None => Box::new(CsvStore::new(&config.output.path, config.output.append)),
        };
        let sink = Arc::new(ResultSink::new(store, config.output.batch_size));

        tracing::info!(
            "Starting crawl of {} ({} pages from page {}), writing to {}",
            settings.base_url,
            config.crawler.max_pages,
            settings.start_page,
            sink.location()
        );

        let retry_backoff = settings.retry_backoff;
        let scheduler = Arc::new(CrawlScheduler::new(
            settings,
            fetcher,
            extractor,
            Arc::clone(&sink),
            config_hash,
        ));
        let mut summary = scheduler.run().await?;

        final_flush(&sink, &mut summary, retry_backoff).await;

        summary.records_written = sink.records_written();
        summary.finish();
        summary.log_summary();

        if let Some(summary_path) = &config.output.summary_path {
            match generate_markdown_summary(&summary, Path::new(summary_path)) {
                Ok(()) => tracing::info!("Summary written to {}", summary_path),
                Err(e) => tracing::warn!("Failed to write summary to {}: {}", summary_path, e),
            }
        }

        Ok(summary)
    }
}

/// Writes whatever is still buffered, retrying once on failure
async fn final_flush(sink: &ResultSink, summary: &mut RunSummary, retry_backoff: Duration) {
    if sink.buffered_len() == 0 {
        if sink.records_written() == 0 {
            tracing::warn!("No data to save");
        }
        return;
    }

    if let Err(e) = sink.flush() {
        tracing::warn!("Failed to write records ({}), retrying", e);
        summary.record_error(None, ErrorStage::Write, e.to_string());
        tokio::time::sleep(retry_backoff).await;

        if let Err(e) = sink.flush() {
            tracing::error!(
                "Failed to write {} records to {}: {}",
                sink.buffered_len(),
                sink.location(),
                e
            );
            summary.record_error(None, ErrorStage::Write, e.to_string());
        }
    }
}
