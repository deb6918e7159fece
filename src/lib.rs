//! Catalog-Crawl: a polite paginated catalog scraper
//!
//! This crate fetches the paginated listing pages of a single e-commerce site with a
//! bounded pool of workers, extracts product records from each page and writes them,
//! in page order, to a CSV file.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Catalog-Crawl operations
///
/// Only startup failures surface through this type. Everything that goes wrong
/// while pages are being crawled is absorbed into the run summary.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

/// URL-specific errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Empty link")]
    Empty,
}

/// Result type alias for Catalog-Crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Locks a mutex, recovering the data if a worker panicked while holding it
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{PageExtractor, ProductRecord, RunController};
pub use output::RunSummary;
pub use state::RunState;
