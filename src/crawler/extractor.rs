//! Product extraction from catalog pages
//!
//! This module turns a parsed catalog page into:
//! - Product records (title, price, category, absolute link)
//! - A has-more signal used by the scheduler to stop pagination
//!
//! Extraction is pluggable through the `PageExtractor` trait; `CatalogExtractor`
//! implements it with configurable CSS selectors.

use crate::config::{PaginationMode, SelectorConfig};
use crate::url::resolve_link;
use crate::{ConfigError, UrlError};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Category used when the page shows no active category
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// One product listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    #[serde(rename = "Title")]
    pub title: String,

    #[serde(rename = "Price")]
    pub price: String,

    #[serde(rename = "Category")]
    pub category: String,

    /// Absolute product URL
    #[serde(rename = "Link")]
    pub url: String,
}

/// Errors raised while extracting a page or a single product
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// Page has no listing marker and no product containers
    #[error("page has no catalog listing")]
    MissingListing,

    /// A product container lacks a required field
    #[error("missing {0}")]
    MissingField(&'static str),

    /// A product link could not be turned into an absolute URL
    #[error("invalid link '{href}': {source}")]
    InvalidLink { href: String, source: UrlError },
}

/// Everything extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtraction {
    /// Records in document order
    pub records: Vec<ProductRecord>,

    /// Containers dropped because a required field was missing
    pub skipped: usize,

    /// True if more catalog pages are expected after this one
    pub has_more: bool,
}

/// Trait for page extraction stages
///
/// Implementations must be stateless per page; one extractor is shared by all workers.
pub trait PageExtractor: Send + Sync {
    /// Extracts product records and the pagination signal from a parsed page
    fn extract(&self, document: &Html) -> Result<PageExtraction, ExtractionError>;
}

/// Parses raw HTML and runs an extractor over it
///
/// The parsed document is not `Send`, so it never outlives this call.
pub fn extract_page(
    extractor: &dyn PageExtractor,
    html: &str,
) -> Result<PageExtraction, ExtractionError> {
    let document = Html::parse_document(html);
    extractor.extract(&document)
}

/// Compiled selectors for a catalog site
#[derive(Debug, Clone)]
struct Selectors {
    listing: Selector,
    container: Selector,
    title: Selector,
    price: Selector,
    link: Selector,
    category: Selector,
    next: Selector,
}

/// Selector-driven extractor for product listing pages
#[derive(Debug, Clone)]
pub struct CatalogExtractor {
    selectors: Selectors,
    base_url: Url,
    pagination: PaginationMode,
}

impl CatalogExtractor {
    /// Compiles the configured selectors
    ///
    /// # Arguments
    ///
    /// * `config` - Selector configuration
    /// * `base_url` - Base for resolving relative product links
    /// * `pagination` - How the end of the catalog is detected
    pub fn new(
        config: &SelectorConfig,
        base_url: Url,
        pagination: PaginationMode,
    ) -> Result<Self, ConfigError> {
        let selectors = Selectors {
            listing: compile(&config.listing)?,
            container: compile(&config.container)?,
            title: compile(&config.title)?,
            price: compile(&config.price)?,
            link: compile(&config.link)?,
            category: compile(&config.category)?,
            next: compile(&config.next)?,
        };

        Ok(Self {
            selectors,
            base_url,
            pagination,
        })
    }

    /// Reads the active category label, falling back to `UNKNOWN_CATEGORY`
    fn category(&self, document: &Html) -> String {
        document
            .select(&self.selectors.category)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
    }

    /// Extracts a single product from its container
    fn extract_product(
        &self,
        container: ElementRef<'_>,
        category: &str,
    ) -> Result<ProductRecord, ExtractionError> {
        let title = container
            .select(&self.selectors.title)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty())
            .ok_or(ExtractionError::MissingField("title"))?;

        let price = container
            .select(&self.selectors.price)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty())
            .ok_or(ExtractionError::MissingField("price"))?;

        let href = container
            .select(&self.selectors.link)
            .next()
            .and_then(|link| link.value().attr("href"))
            .ok_or(ExtractionError::MissingField("link"))?;

        let url = resolve_link(href, &self.base_url).map_err(|source| {
            ExtractionError::InvalidLink {
                href: href.to_string(),
                source,
            }
        })?;

        Ok(ProductRecord {
            title,
            price,
            category: category.to_string(),
            url: url.to_string(),
        })
    }

    fn has_next_control(&self, document: &Html) -> bool {
        document.select(&self.selectors.next).next().is_some()
    }
}

impl PageExtractor for CatalogExtractor {
    fn extract(&self, document: &Html) -> Result<PageExtraction, ExtractionError> {
        let containers: Vec<ElementRef<'_>> = document.select(&self.selectors.container).collect();

        if containers.is_empty() && document.select(&self.selectors.listing).next().is_none() {
            return Err(ExtractionError::MissingListing);
        }

        let category = self.category(document);
        let mut records = Vec::with_capacity(containers.len());
        let mut skipped = 0;

        for (position, container) in containers.into_iter().enumerate() {
            match self.extract_product(container, &category) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping product #{}: {}", position + 1, e);
                    skipped += 1;
                }
            }
        }

        let has_more = !records.is_empty()
            && match self.pagination {
                PaginationMode::EmptyPage => true,
                PaginationMode::NextControl => self.has_next_control(document),
            };

        Ok(PageExtraction {
            records,
            skipped,
            has_more,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Collects and trims the text of an element, collapsing inner whitespace runs
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
