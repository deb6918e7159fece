use url::Url;

/// Builds the URL of a catalog page
///
/// Page 1 is the base URL itself. Every later page carries its index in the
/// `page_param` query parameter; any existing value of that parameter is replaced and
/// other query parameters are kept in order.
///
/// # Examples
///
/// ```
/// use catalog_crawl::url::page_url;
/// use url::Url;
///
/// let base = Url::parse("https://shop.example.com/catalog").unwrap();
/// assert_eq!(page_url(&base, "page", 1).as_str(), "https://shop.example.com/catalog");
/// assert_eq!(page_url(&base, "page", 3).as_str(), "https://shop.example.com/catalog?page=3");
/// ```
pub fn page_url(base: &Url, page_param: &str, page_index: u32) -> Url {
    if page_index <= 1 {
        return base.clone();
    }

    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != page_param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = base.clone();
    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &retained {
            pairs.append_pair(key, value);
        }
        pairs.append_pair(page_param, &page_index.to_string());
    }
    url
}
