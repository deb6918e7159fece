//! Output module for crawl results and reports
//!
//! This module handles:
//! - Buffering extracted records and committing them in page order
//! - Writing records atomically to the CSV output file
//! - Accumulating and reporting the run summary

mod csv_store;
mod markdown;
mod sink;
pub mod summary;
mod traits;

pub use csv_store::{CsvStore, CSV_HEADER};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use sink::ResultSink;
pub use summary::{print_summary, ErrorStage, RunError, RunSummary};
pub use traits::{OutputError, OutputResult, RecordStore};
