//! Scheduler for dispatching catalog pages to a pool of workers
//!
//! This module handles:
//! - Enumerating page indices within the page budget
//! - Running a bounded pool of workers on a `JoinSet`
//! - Retrying transient fetch failures once
//! - Per-worker politeness delays
//! - Evaluating page outcomes in page order to decide when the run ends
//!
//! Workers may finish pages in any order. Outcomes are parked until every lower
//! page has been evaluated, so the terminal decision and the output order only
//! depend on page contents, never on timing.

use crate::config::Config;
use crate::crawler::extractor::{extract_page, PageExtractor};
use crate::crawler::fetcher::{FetchClient, PageRequest};
use crate::output::{ErrorStage, ResultSink, RunSummary};
use crate::state::{PageState, RunState};
use crate::url::page_url;
use crate::{lock, ConfigError, CrawlError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;
use url::Url;

/// Scheduling parameters resolved from the configuration
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// First page index to dispatch
    pub start_page: u32,

    /// Last page index within the budget (inclusive)
    pub last_page: u32,

    pub worker_count: usize,
    pub timeout: Duration,
    pub politeness_delay: Duration,
    pub retry_backoff: Duration,
    pub max_consecutive_failures: u32,

    /// Listing URL of page 1
    pub base_url: Url,

    /// Query parameter carrying the page index
    pub page_param: String,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.site.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.site.base_url, e)))?;

        Ok(Self {
            start_page: config.crawler.start_page,
            last_page: config.crawler.last_page(),
            worker_count: config.crawler.worker_count.max(1) as usize,
            timeout: config.crawler.timeout(),
            politeness_delay: config.crawler.politeness_delay(),
            retry_backoff: config.crawler.retry_backoff(),
            max_consecutive_failures: config.crawler.max_consecutive_failures.max(1),
            base_url,
            page_param: config.site.page_param.clone(),
        })
    }

    /// URL of the given page
    pub fn page_url(&self, page_index: u32) -> Url {
        page_url(&self.base_url, &self.page_param, page_index)
    }

    /// Every URL the run may request, in dispatch order
    pub fn planned_urls(&self) -> Vec<(u32, Url)> {
        (self.start_page..=self.last_page)
            .map(|page| (page, self.page_url(page)))
            .collect()
    }
}

/// Final result of processing one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub page_index: u32,

    /// Records extracted and submitted to the sink
    pub record_count: usize,

    /// Containers dropped for missing fields
    pub skipped: usize,

    /// More pages are expected after this one
    pub has_more: bool,

    /// Stage and message of the failure, if the page failed
    pub error: Option<(ErrorStage, String)>,
}

impl PageOutcome {
    pub fn succeeded(page_index: u32, record_count: usize, skipped: usize, has_more: bool) -> Self {
        Self {
            page_index,
            record_count,
            skipped,
            has_more,
            error: None,
        }
    }

    pub fn failed(page_index: u32, stage: ErrorStage, message: impl Into<String>) -> Self {
        Self {
            page_index,
            record_count: 0,
            skipped: 0,
            has_more: false,
            error: Some((stage, message.into())),
        }
    }

    pub fn status(&self) -> PageState {
        if self.error.is_some() {
            PageState::Failed
        } else if self.record_count == 0 {
            PageState::Empty
        } else {
            PageState::Succeeded
        }
    }
}

/// Shared dispatch and evaluation state, guarded by one mutex
#[derive(Debug)]
struct DispatchState {
    /// Next page index to hand out; `None` once past `u32::MAX`
    next_page: Option<u32>,

    /// Lowest page index not yet evaluated; `None` once past `u32::MAX`
    cursor: Option<u32>,

    /// Outcomes waiting for all lower pages to be evaluated
    completed: BTreeMap<u32, PageOutcome>,

    consecutive_failures: u32,

    /// Running totals; `summary.state` is the run state
    summary: RunSummary,
}

impl DispatchState {
    fn transition(&mut self, to: RunState) -> Result<(), CrawlError> {
        let from = self.summary.state;
        if !from.can_transition_to(to) {
            return Err(CrawlError::InvalidTransition { from, to });
        }
        self.summary.state = to;
        Ok(())
    }

    fn end_run(&mut self, to: RunState, reason: &str) {
        if self.transition(to).is_ok() {
            tracing::info!("Run {}: {}", to, reason);
        }
    }
}

/// Dispatches catalog pages to workers and decides when the run ends
pub struct CrawlScheduler {
    settings: SchedulerSettings,
    fetcher: FetchClient,
    extractor: Arc<dyn PageExtractor>,
    sink: Arc<ResultSink>,
    dispatch: Mutex<DispatchState>,
}

impl CrawlScheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `settings` - Page range, pool size and timing
    /// * `fetcher` - HTTP client shared by all workers
    /// * `extractor` - Page extractor shared by all workers
    /// * `sink` - Destination of extracted records
    /// * `config_hash` - Hash of the configuration, stored in the summary
    pub fn new(
        settings: SchedulerSettings,
        fetcher: FetchClient,
        extractor: Arc<dyn PageExtractor>,
        sink: Arc<ResultSink>,
        config_hash: impl Into<String>,
    ) -> Self {
        let dispatch = DispatchState {
            next_page: Some(settings.start_page),
            cursor: Some(settings.start_page),
            completed: BTreeMap::new(),
            consecutive_failures: 0,
            summary: RunSummary::new(config_hash),
        };

        Self {
            settings,
            fetcher,
            extractor,
            sink,
            dispatch: Mutex::new(dispatch),
        }
    }

    pub fn state(&self) -> RunState {
        lock(&self.dispatch).summary.state
    }

    /// Runs the crawl to a terminal state
    ///
    /// Returns the run summary. Page failures never surface as `Err`; only a second
    /// call on the same scheduler does.
    pub async fn run(self: Arc<Self>) -> Result<RunSummary, CrawlError> {
        {
            let mut dispatch = lock(&self.dispatch);
            dispatch.transition(RunState::Running)?;
            dispatch.summary.started_at = chrono::Utc::now();
        }

        tracing::info!(
            "Crawling pages {}..={} of {} with {} workers",
            self.settings.start_page,
            self.settings.last_page,
            self.settings.base_url,
            self.settings.worker_count
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..self.settings.worker_count {
            let scheduler = Arc::clone(&self);
            workers.spawn(async move { scheduler.worker(worker_id).await });
        }

        let mut worker_failed = false;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
                worker_failed = true;
            }
        }

        let discarded = self.sink.discard_uncommitted();

        let mut dispatch = lock(&self.dispatch);
        if dispatch.summary.state == RunState::Running {
            if worker_failed {
                dispatch.end_run(RunState::Aborted, "a worker stopped unexpectedly");
            } else {
                dispatch.end_run(RunState::Completed, "all pages processed");
            }
        }
        if discarded > 0 {
            tracing::info!(
                "Discarded {} records from pages finished after the run ended",
                discarded
            );
        }
        dispatch.summary.records_discarded += discarded;

        Ok(dispatch.summary.clone())
    }

    async fn worker(&self, worker_id: usize) {
        tracing::debug!("Worker {} started", worker_id);

        while let Some(request) = self.next_request() {
            let outcome = self.process_page(request).await;
            self.report(outcome);

            if self.state() == RunState::Running && !self.settings.politeness_delay.is_zero() {
                tokio::time::sleep(self.settings.politeness_delay).await;
            }
        }

        tracing::debug!("Worker {} finished", worker_id);
    }

    /// Hands out the next page while the run is active and within budget
    fn next_request(&self) -> Option<PageRequest> {
        let mut dispatch = lock(&self.dispatch);
        if dispatch.summary.state != RunState::Running {
            return None;
        }

        let page_index = match dispatch.next_page {
            Some(page) if page <= self.settings.last_page => page,
            _ => return None,
        };
        dispatch.next_page = page_index.checked_add(1);
        dispatch.summary.pages_attempted += 1;

        Some(PageRequest {
            url: self.settings.page_url(page_index).to_string(),
            page_index,
        })
    }

    /// Fetches and extracts one page, retrying a transient fetch failure once
    async fn process_page(&self, request: PageRequest) -> PageOutcome {
        let page_index = request.page_index;
        tracing::debug!("Fetching page {}: {}", page_index, request.url);

        let mut result = self.fetcher.fetch(request, self.settings.timeout).await;

        if let Err(e) = &result.response {
            if e.is_transient() {
                tracing::warn!(
                    "Page {} fetch failed ({}), retrying in {}ms",
                    page_index,
                    e.reason(),
                    self.settings.retry_backoff.as_millis()
                );
                tokio::time::sleep(self.settings.retry_backoff).await;
                let request = result.request.clone();
                result = self.fetcher.fetch(request, self.settings.timeout).await;
            }
        }

        let body = match result.response {
            Ok(body) => body,
            Err(e) => return PageOutcome::failed(page_index, ErrorStage::Fetch, e.to_string()),
        };

        match extract_page(self.extractor.as_ref(), &body) {
            Ok(extraction) => {
                let outcome = PageOutcome::succeeded(
                    page_index,
                    extraction.records.len(),
                    extraction.skipped,
                    extraction.has_more,
                );
                self.sink.submit(page_index, extraction.records);
                outcome
            }
            Err(e) => PageOutcome::failed(page_index, ErrorStage::Extract, e.to_string()),
        }
    }

    /// Records an outcome and evaluates every outcome now in page order
    fn report(&self, outcome: PageOutcome) {
        log_outcome(&outcome);

        {
            let mut dispatch = lock(&self.dispatch);
            if dispatch.summary.state.is_terminal() {
                tracing::debug!(
                    "Ignoring page {}, run already {}",
                    outcome.page_index,
                    dispatch.summary.state
                );
                return;
            }

            dispatch.completed.insert(outcome.page_index, outcome);

            while dispatch.summary.state == RunState::Running {
                let cursor = match dispatch.cursor {
                    Some(cursor) => cursor,
                    None => break,
                };
                let next = match dispatch.completed.remove(&cursor) {
                    Some(next) => next,
                    None => break,
                };
                dispatch.cursor = cursor.checked_add(1);
                self.apply(&mut dispatch, next);

                let last_page = self.settings.last_page;
                if dispatch.cursor.map_or(true, |cursor| cursor > last_page) {
                    dispatch.end_run(RunState::Completed, "page budget exhausted");
                }
            }
        }

        if self.sink.should_flush() {
            if let Err(e) = self.sink.flush() {
                tracing::error!("Failed to write records: {}", e);
                lock(&self.dispatch)
                    .summary
                    .record_error(None, ErrorStage::Write, e.to_string());
            }
        }
    }

    /// Applies one outcome; called strictly in page order
    fn apply(&self, dispatch: &mut DispatchState, outcome: PageOutcome) {
        let status = outcome.status();

        if let Some((stage, message)) = outcome.error {
            dispatch.consecutive_failures += 1;
            dispatch.summary.pages_failed += 1;
            dispatch
                .summary
                .record_error(Some(outcome.page_index), stage, message);

            if dispatch.consecutive_failures >= self.settings.max_consecutive_failures {
                let reason = format!(
                    "{} consecutive page failures",
                    dispatch.consecutive_failures
                );
                dispatch.end_run(RunState::Aborted, &reason);
            }
            return;
        }

        dispatch.consecutive_failures = 0;
        dispatch.summary.records_skipped += outcome.skipped;

        match status {
            PageState::Empty => dispatch.summary.pages_empty += 1,
            _ => {
                dispatch.summary.pages_succeeded += 1;
                self.sink.commit(outcome.page_index);
            }
        }

        if !outcome.has_more {
            let reason = format!("no more products after page {}", outcome.page_index);
            dispatch.end_run(RunState::Completed, &reason);
        }
    }
}

fn log_outcome(outcome: &PageOutcome) {
    match (&outcome.error, outcome.status()) {
        (Some((stage, message)), _) => {
            tracing::error!(
                "Page {} failed during {}: {}",
                outcome.page_index,
                stage,
                message
            );
        }
        (None, PageState::Empty) => {
            tracing::info!("Page {}: no products found", outcome.page_index);
        }
        (None, _) if outcome.skipped > 0 => {
            tracing::info!(
                "Page {}: {} products ({} skipped)",
                outcome.page_index,
                outcome.record_count,
                outcome.skipped
            );
        }
        (None, _) => {
            tracing::info!(
                "Page {}: {} products",
                outcome.page_index,
                outcome.record_count
            );
        }
    }
}
