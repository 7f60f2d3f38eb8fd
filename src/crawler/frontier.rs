//! Breadth-first frontier for whole-site traversal
//!
//! URLs are keyed by [`visit_key`], so a page reached through variants that
//! differ only by fragment, tracking parameters, query order or a trailing
//! slash is visited once. Only same-site, non-asset links are admitted.

use crate::extract::text::select_all;
use crate::url::{is_same_site, normalize_url, visit_key};
use scraper::Html;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Path extensions of binary and static assets never worth fetching as pages
const ASSET_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp", "pdf", "zip", "gz", "css", "js",
    "mp4", "mp3", "woff", "woff2", "ttf",
];

/// FIFO queue of pages still to visit, plus every key ever admitted
#[derive(Debug)]
pub struct Frontier {
    seed: Url,
    queue: VecDeque<Url>,
    seen: HashSet<String>,
}

impl Frontier {
    /// Creates a frontier containing only the seed
    pub fn new(seed: Url) -> Self {
        let mut frontier = Self {
            seed: seed.clone(),
            queue: VecDeque::new(),
            seen: HashSet::new(),
        };
        frontier.push(seed);
        frontier
    }

    /// Admits a URL if it is same-site, not an asset and never seen before
    ///
    /// Returns true if the URL was queued.
    pub fn push(&mut self, url: Url) -> bool {
        if !is_same_site(&url, &self.seed) || is_asset(&url) {
            return false;
        }

        if !self.seen.insert(visit_key(&url)) {
            return false;
        }

        self.queue.push_back(url);
        true
    }

    /// Admits every URL from the iterator, returning how many were queued
    pub fn extend(&mut self, urls: impl IntoIterator<Item = Url>) -> usize {
        urls.into_iter().filter(|url| self.push(url.clone())).count()
    }

    pub fn pop(&mut self) -> Option<Url> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of distinct pages ever admitted
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

/// Every http(s) link on a page, resolved and normalized, in document order
pub fn page_links(document: &Html, base_url: &Url) -> Vec<Url> {
    select_all(document, "a[href]")
        .into_iter()
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| base_url.join(href.trim()).ok())
        .filter_map(|url| match normalize_url(url.as_str()) {
            Ok(normalized) => Some(normalized),
            Err(e) => {
                tracing::trace!("Skipping link {}: {}", url, e);
                None
            }
        })
        .collect()
}

fn is_asset(url: &Url) -> bool {
    let Some(last) = url.path_segments().and_then(|mut segments| segments.next_back()) else {
        return false;
    };

    match last.rsplit_once('.') {
        Some((_, extension)) => ASSET_EXTENSIONS.contains(&extension.to_lowercase().as_str()),
        None => false,
    }
}
