//! URL handling module for Catalog-Crawl
//!
//! This module builds catalog page URLs and resolves product links found on them.

mod pagination;
mod resolve;

pub use pagination::page_url;
pub use resolve::resolve_link;
