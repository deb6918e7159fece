use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, SelectorConfig, SiteConfig, MAX_TIMEOUT_SECONDS,
};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use scraper::Selector;
use std::time::Duration;
use url::Url;

/// Upper bound on concurrent workers for a single-site crawl
const MAX_WORKERS: u32 = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_user_agent(&config.user_agent.value)?;
    validate_crawler_config(&config.crawler)?;
    validate_selectors(&config.selectors)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the target site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", config.base_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    if config.page_param.trim().is_empty() {
        return Err(ConfigError::Validation(
            "page-param cannot be empty".to_string(),
        ));
    }

    for (name, value) in &config.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(format!("bad header name '{}'", name)))?;
        HeaderValue::from_str(value)
            .map_err(|_| ConfigError::InvalidHeader(format!("bad value for header '{}'", name)))?;
    }

    Ok(())
}

/// Validates the user agent string
fn validate_user_agent(value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent value cannot be empty".to_string(),
        ));
    }

    HeaderValue::from_str(value).map_err(|_| {
        ConfigError::InvalidHeader("user-agent contains invalid characters".to_string())
    })?;

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.start_page < 1 {
        return Err(ConfigError::Validation(format!(
            "start-page must be >= 1, got {}",
            config.start_page
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.checked_last_page().is_none() {
        return Err(ConfigError::Validation(format!(
            "start-page {} plus max-pages {} exceeds the largest page index {}",
            config.start_page,
            config.max_pages,
            u32::MAX
        )));
    }

    if !config.timeout_seconds.is_finite() || config.timeout_seconds <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "timeout-seconds must be a positive number, got {}",
            config.timeout_seconds
        )));
    }

    if config.timeout_seconds > MAX_TIMEOUT_SECONDS
        || Duration::try_from_secs_f64(config.timeout_seconds).is_err()
    {
        return Err(ConfigError::Validation(format!(
            "timeout-seconds must be at most {}, got {}",
            MAX_TIMEOUT_SECONDS, config.timeout_seconds
        )));
    }

    if config.worker_count < 1 || config.worker_count > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "worker-count must be between 1 and {}, got {}",
            MAX_WORKERS, config.worker_count
        )));
    }

    if config.max_consecutive_failures < 1 {
        return Err(ConfigError::Validation(format!(
            "max-consecutive-failures must be >= 1, got {}",
            config.max_consecutive_failures
        )));
    }

    Ok(())
}

/// Validates that every selector compiles
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for selector in [
        &config.listing,
        &config.container,
        &config.title,
        &config.price,
        &config.link,
        &config.category,
        &config.next,
    ] {
        Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
            selector: selector.clone(),
            message: format!("{:?}", e),
        })?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if let Some(summary_path) = &config.summary_path {
        if summary_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "summary-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}
