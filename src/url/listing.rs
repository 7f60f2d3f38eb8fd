use url::Url;

/// Query parameter carrying the listing page number
pub const PAGE_PARAM: &str = "page";

/// Builds the URL of a given listing page
///
/// The `page` parameter is replaced in place when present and appended
/// otherwise; every other parameter keeps its position and value.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use catalog_scraper::url::build_listing_page_url;
///
/// let base = Url::parse("https://shop.example.com/all/?mode=4&limit=100").unwrap();
/// assert_eq!(
///     build_listing_page_url(&base, 3).as_str(),
///     "https://shop.example.com/all/?mode=4&limit=100&page=3"
/// );
/// ```
pub fn build_listing_page_url(base: &Url, page_number: u32) -> Url {
    let page = page_number.to_string();
    let mut replaced = false;

    let pairs: Vec<(String, String)> = base
        .query_pairs()
        .filter_map(|(k, v)| {
            if k == PAGE_PARAM {
                if replaced {
                    return None;
                }
                replaced = true;
                Some((k.into_owned(), page.clone()))
            } else {
                Some((k.into_owned(), v.into_owned()))
            }
        })
        .collect();

    let mut url = base.clone();
    url.set_fragment(None);
    {
        let mut query = url.query_pairs_mut();
        query.clear().extend_pairs(&pairs);
        if !replaced {
            query.append_pair(PAGE_PARAM, &page);
        }
    }
    url
}
