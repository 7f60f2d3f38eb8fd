//! Ordered selector cascades
//!
//! Each field is described by a list of strategies, most specific first. A
//! strategy pairs a locator (which element?) with a reader (what value?). The
//! first strategy that locates an element yielding a non-empty value wins, so
//! the order of the list is the precedence of the heuristics.

use crate::extract::text::{class_matches, element_text, id_matches, select_all, select_within};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

/// How a strategy finds its candidate element
#[derive(Debug, Clone)]
pub enum Locate {
    /// First element among `tags` with a class token matching the pattern
    ClassOn {
        tags: &'static [&'static str],
        class: &'static LazyLock<Regex>,
    },
    /// First element among `tags` with an id matching the pattern
    IdOn {
        tags: &'static [&'static str],
        id: &'static LazyLock<Regex>,
    },
    /// First element matching a CSS selector
    Css(&'static str),
}

impl Locate {
    /// Finds the first matching element in document order
    pub fn find<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        match self {
            Self::ClassOn { tags, class } => select_all(document, &tags.join(","))
                .into_iter()
                .find(|el| class_matches(*el, class)),
            Self::IdOn { tags, id } => select_all(document, &tags.join(","))
                .into_iter()
                .find(|el| id_matches(*el, id)),
            Self::Css(css) => select_all(document, css).into_iter().next(),
        }
    }
}

/// How a strategy turns a located element into a value
#[derive(Debug, Clone)]
pub enum Read {
    /// Whitespace-collapsed text content
    Text,
    /// First non-blank attribute from the list, else the text content
    AttrOrText(&'static [&'static str]),
    /// Text of the first link inside the element; nothing if there is no link
    FirstLinkText,
    /// Document title with a trailing ` - Site name` or ` | Site name` removed
    TitleText,
}

static RE_TITLE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[-|]\s+.*$").expect("title suffix regex"));

impl Read {
    pub fn read(&self, element: ElementRef<'_>) -> String {
        match self {
            Self::Text => element_text(element),
            Self::AttrOrText(attrs) => attrs
                .iter()
                .filter_map(|name| element.value().attr(name))
                .map(str::trim)
                .find(|value| !value.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| element_text(element)),
            Self::FirstLinkText => select_within(element, "a")
                .into_iter()
                .next()
                .map(element_text)
                .unwrap_or_default(),
            Self::TitleText => RE_TITLE_SUFFIX
                .replace(&element_text(element), "")
                .into_owned(),
        }
    }
}

/// One step of a cascade
#[derive(Debug, Clone)]
pub struct Strategy {
    /// Short name used in debug logs
    pub label: &'static str,
    pub locate: Locate,
    pub read: Read,
}

impl Strategy {
    pub fn new(label: &'static str, locate: Locate, read: Read) -> Self {
        Self {
            label,
            locate,
            read,
        }
    }
}

/// An ordered list of strategies for one field
#[derive(Debug, Clone, Default)]
pub struct Cascade {
    pub strategies: Vec<Strategy>,
}

impl Cascade {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    /// First non-empty value produced by the strategies, in order
    pub fn value(&self, document: &Html) -> Option<String> {
        self.strategies.iter().find_map(|strategy| {
            let element = strategy.locate.find(document)?;
            let value = strategy.read.read(element);
            if value.is_empty() {
                tracing::trace!("Strategy '{}' matched but yielded nothing", strategy.label);
                return None;
            }
            tracing::trace!("Strategy '{}' produced a value", strategy.label);
            Some(value)
        })
    }

    /// First element located by the strategies, in order
    ///
    /// Used by fields whose value needs the whole container (descriptions,
    /// specification panels, breadcrumbs).
    pub fn element<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.locate.find(document))
    }
}
