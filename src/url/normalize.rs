use crate::{UrlError, UrlResult};
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Normalizes a URL for identity comparisons during traversal
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an http(s) scheme and a host
/// 3. Lowercase the host
/// 4. Normalize path: remove dot segments and empty segments
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking query parameters, sort the rest, drop an empty query
///
/// The trailing slash is kept here; [`visit_key`] strips it when the URL is
/// used as a visited-set key.
///
/// # Examples
///
/// ```
/// use catalog_scraper::url::normalize_url;
///
/// let url = normalize_url("https://Shop.Example.com/a/../tools/#reviews").unwrap();
/// assert_eq!(url.as_str(), "https://shop.example.com/tools/");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Returns the visited-set key for a URL: normalized, trailing slash stripped
///
/// The site root collapses to the bare origin (`https://shop.example.com`).
pub fn visit_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);

    let path = key.path().to_string();
    let query = key.query().map(|q| q.to_string());

    let mut out = format!("{}://{}", key.scheme(), key.host_str().unwrap_or_default());
    if let Some(port) = key.port() {
        out.push_str(&format!(":{}", port));
    }
    out.push_str(path.trim_end_matches('/'));
    if let Some(q) = query {
        out.push('?');
        out.push_str(&q);
    }
    out
}

/// Returns the URL as a string that always ends with a path separator
///
/// Query and fragment are dropped; product identity is the path alone.
pub fn with_trailing_slash(url: &Url) -> String {
    let mut out = url.clone();
    out.set_fragment(None);
    out.set_query(None);
    if !out.path().ends_with('/') {
        let path = format!("{}/", out.path());
        out.set_path(&path);
    }
    out.to_string()
}

/// Normalizes a URL path by removing dot segments and repeated slashes
///
/// A trailing slash on a non-root path is preserved.
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let trailing = path.len() > 1 && path.ends_with('/');
    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", normalized_segments.join("/"));
    if trailing {
        result.push('/');
    }
    result
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
