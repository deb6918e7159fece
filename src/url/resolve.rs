use crate::UrlError;
use url::Url;

/// Resolves a product link against the site base URL
///
/// Root-relative and path-relative links are joined onto `base`; absolute links pass
/// through unchanged. Links that cannot point at a product page are rejected:
/// - empty hrefs and fragment-only anchors
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - anything that does not resolve to HTTP(S)
///
/// # Examples
///
/// ```
/// use catalog_crawl::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://webscraper.io/test-sites/e-commerce/static/computers").unwrap();
/// let link = resolve_link("/test-sites/e-commerce/static/product/31", &base).unwrap();
/// assert_eq!(link.as_str(), "https://webscraper.io/test-sites/e-commerce/static/product/31");
/// ```
pub fn resolve_link(href: &str, base: &Url) -> Result<Url, UrlError> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return Err(UrlError::Empty);
    }

    let lowered = href.to_ascii_lowercase();
    for scheme in ["javascript:", "mailto:", "tel:", "data:"] {
        if lowered.starts_with(scheme) {
            return Err(UrlError::InvalidScheme(scheme.trim_end_matches(':').to_string()));
        }
    }

    let absolute = base.join(href).map_err(|e| UrlError::Parse(e.to_string()))?;

    match absolute.scheme() {
        "http" | "https" => Ok(absolute),
        other => Err(UrlError::InvalidScheme(other.to_string())),
    }
}
