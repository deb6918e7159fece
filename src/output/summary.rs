//! Run summary accumulated while crawling
//!
//! The summary is built incrementally by the scheduler, completed by the run
//! controller, then logged, printed and optionally exported as markdown.

use crate::state::RunState;
use chrono::{DateTime, Utc};
use std::fmt;

/// Which stage of page processing an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStage {
    Fetch,
    Extract,
    Write,
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Write => "write",
        };
        write!(f, "{}", name)
    }
}

/// One error absorbed during the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunError {
    /// Page the error belongs to; `None` for output errors
    pub page_index: Option<u32>,
    pub stage: ErrorStage,
    pub message: String,
}

/// Totals for a crawl run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub config_hash: String,

    /// Pages handed to a worker
    pub pages_attempted: u32,
    /// Pages that yielded at least one record
    pub pages_succeeded: u32,
    /// Pages fetched fine but without products (end of catalog)
    pub pages_empty: u32,
    pub pages_failed: u32,

    pub records_written: usize,
    /// Product containers dropped for missing fields
    pub records_skipped: usize,
    /// Records of pages that finished after the run had already ended
    pub records_discarded: usize,

    /// Errors in page order, output errors in the order they happened
    pub errors: Vec<RunError>,
}

impl RunSummary {
    /// Starts a summary for a run beginning now
    pub fn new(config_hash: impl Into<String>) -> Self {
        Self {
            state: RunState::Idle,
            started_at: Utc::now(),
            finished_at: None,
            config_hash: config_hash.into(),
            pages_attempted: 0,
            pages_succeeded: 0,
            pages_empty: 0,
            pages_failed: 0,
            records_written: 0,
            records_skipped: 0,
            records_discarded: 0,
            errors: Vec::new(),
        }
    }

    pub fn record_error(
        &mut self,
        page_index: Option<u32>,
        stage: ErrorStage,
        message: impl Into<String>,
    ) {
        self.errors.push(RunError {
            page_index,
            stage,
            message: message.into(),
        });
    }

    /// Stamps the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_milliseconds() as f64 / 1000.0)
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// A run succeeds if it completed and fetched at least one page
    pub fn is_success(&self) -> bool {
        self.state == RunState::Completed && self.pages_succeeded + self.pages_empty > 0
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Emits the one-line summary through the logger
    pub fn log_summary(&self) {
        let line = self.summary_line();
        if self.is_success() {
            tracing::info!("{}", line);
        } else {
            tracing::error!("{}", line);
        }
    }

    /// Single-line totals
    pub fn summary_line(&self) -> String {
        format!(
            "Run {}: pages attempted={} succeeded={} empty={} failed={}, records written={} skipped={} discarded={}, errors={}",
            self.state,
            self.pages_attempted,
            self.pages_succeeded,
            self.pages_empty,
            self.pages_failed,
            self.records_written,
            self.records_skipped,
            self.records_discarded,
            self.error_count()
        )
    }
}

/// Prints a summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Run:");
    println!("  State: {}", summary.state);
    println!("  Started: {}", summary.started_at.to_rfc3339());
    if let Some(duration) = summary.duration_seconds() {
        println!("  Duration: {:.1}s", duration);
    }
    println!();

    println!("Pages:");
    println!("  Attempted: {}", summary.pages_attempted);
    println!("  Succeeded: {}", summary.pages_succeeded);
    println!("  Empty: {}", summary.pages_empty);
    println!("  Failed: {}", summary.pages_failed);
    println!();

    println!("Records:");
    println!("  Written: {}", summary.records_written);
    println!("  Skipped: {}", summary.records_skipped);
    if summary.records_discarded > 0 {
        println!("  Discarded: {}", summary.records_discarded);
    }
    println!();

    if !summary.errors.is_empty() {
        println!("Errors ({}):", summary.error_count());
        for error in &summary.errors {
            match error.page_index {
                Some(page) => println!("  - page {} [{}]: {}", page, error.stage, error.message),
                None => println!("  - [{}]: {}", error.stage, error.message),
            }
        }
        println!();
    }
}
