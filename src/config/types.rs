use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Catalog-Crawl
///
/// Every table and key is optional. Missing values fall back to the defaults of the
/// reference catalog (the webscraper.io static e-commerce test site).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub crawler: CrawlerConfig,
    pub selectors: SelectorConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// URL of the first catalog page
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Query parameter carrying the page number for pages after the first
    #[serde(rename = "page-param")]
    pub page_param: String,

    /// How the end of the catalog is detected
    pub pagination: PaginationMode,

    /// Extra request headers sent with every fetch
    pub headers: BTreeMap<String, String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://webscraper.io/test-sites/e-commerce/static/computers".to_string(),
            page_param: "page".to_string(),
            pagination: PaginationMode::default(),
            headers: BTreeMap::new(),
        }
    }
}

/// Strategy for deciding whether more catalog pages exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationMode {
    /// Keep going until a page yields no products
    #[default]
    EmptyPage,

    /// Keep going only while the page shows a "next" control
    NextControl,
}

/// User agent configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Full User-Agent header value
    pub value: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                    (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36"
                .to_string(),
        }
    }
}

/// Longest accepted per-request timeout (one day)
pub const MAX_TIMEOUT_SECONDS: f64 = 86_400.0;

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// First page index to request (resume point)
    #[serde(rename = "start-page")]
    pub start_page: u32,

    /// Maximum number of pages to request in one run
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-seconds")]
    pub timeout_seconds: f64,

    /// Number of concurrent fetch workers
    #[serde(rename = "worker-count")]
    pub worker_count: u32,

    /// Minimum pause a worker observes between two pages (milliseconds)
    #[serde(rename = "politeness-delay-ms")]
    pub politeness_delay_ms: u64,

    /// Pause before retrying a transient fetch failure (milliseconds)
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Consecutive page failures that abort the run
    #[serde(rename = "max-consecutive-failures")]
    pub max_consecutive_failures: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_page: 1,
            max_pages: 3,
            timeout_seconds: 10.0,
            worker_count: 4,
            politeness_delay_ms: 1000,
            retry_backoff_ms: 500,
            max_consecutive_failures: 2,
        }
    }
}

impl CrawlerConfig {
    /// Per-request timeout as a duration
    ///
    /// Never panics: values outside `[1ms, MAX_TIMEOUT_SECONDS]` are clamped into that
    /// range. Validation rejects them before a run starts.
    pub fn timeout(&self) -> Duration {
        let min = Duration::from_millis(1);
        let max = Duration::from_secs_f64(MAX_TIMEOUT_SECONDS);
        match Duration::try_from_secs_f64(self.timeout_seconds) {
            Ok(timeout) => timeout.clamp(min, max),
            Err(_) if self.timeout_seconds > 0.0 => max,
            Err(_) => min,
        }
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Last page index this run may request
    ///
    /// `None` if the range does not fit in `u32`.
    pub fn checked_last_page(&self) -> Option<u32> {
        self.start_page.checked_add(self.max_pages.saturating_sub(1))
    }

    /// Last page index this run may request, capped at `u32::MAX`
    pub fn last_page(&self) -> u32 {
        self.checked_last_page().unwrap_or(u32::MAX)
    }
}

/// CSS selectors used to pull products out of a catalog page
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Marker proving the page is a catalog listing at all
    pub listing: String,

    /// One match per product card
    pub container: String,

    /// Product title, relative to the container
    pub title: String,

    /// Product price, relative to the container
    pub price: String,

    /// Element whose `href` links to the product, relative to the container
    pub link: String,

    /// Active category label, anywhere on the page
    pub category: String,

    /// "Next page" control, anywhere on the page
    pub next: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing: "div.test-site".to_string(),
            container: "div.thumbnail".to_string(),
            title: "a.title".to_string(),
            price: "h4.price".to_string(),
            link: "a.title".to_string(),
            category: "a.category-link.active".to_string(),
            next: "a[rel=\"next\"]".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the CSV output file
    pub path: String,

    /// Keep existing file content and add new rows after it
    pub append: bool,

    /// Flush whenever this many records are committed (0 = only at run end)
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Optional path of a markdown run summary
    #[serde(rename = "summary-path")]
    pub summary_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "products.csv".to_string(),
            append: false,
            batch_size: 0,
            summary_path: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write log lines to this file
    pub file: Option<String>,
}
