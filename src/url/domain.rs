use url::Url;

/// Extracts the domain from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use catalog_scraper::url::extract_domain;
///
/// let url = Url::parse("https://Shop.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("shop.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if both URLs point at the same site (host and port)
///
/// Subdomains count as different sites: `cdn.example.com` is not
/// `example.com`.
pub fn is_same_site(a: &Url, b: &Url) -> bool {
    extract_domain(a).is_some()
        && extract_domain(a) == extract_domain(b)
        && a.port_or_known_default() == b.port_or_known_default()
}
