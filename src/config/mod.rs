//! Configuration module for Catalog-Crawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use catalog_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will request up to {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, LoggingConfig, OutputConfig, PaginationMode, SelectorConfig,
    SiteConfig, UserAgentConfig, MAX_TIMEOUT_SECONDS,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, hash_content, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
