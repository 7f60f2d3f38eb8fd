//! DOM text and matching helpers shared by the extractors

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Collapses every whitespace run to a single space and trims the ends
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-collapsed text content of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Text content of an element with `script` and `style` bodies removed
///
/// Each non-empty text fragment is whitespace-collapsed; fragments are joined
/// with `separator`.
pub fn visible_text(element: ElementRef<'_>, separator: &str) -> String {
    let mut parts = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != element.id())
            .any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript"))
            });
        if hidden {
            continue;
        }

        let fragment = collapse_whitespace(text);
        if !fragment.is_empty() {
            parts.push(fragment);
        }
    }

    parts.join(separator)
}

/// Returns true if any class token of the element matches the pattern
pub fn class_matches(element: ElementRef<'_>, pattern: &Regex) -> bool {
    element.value().classes().any(|class| pattern.is_match(class))
}

/// Returns true if the element's id matches the pattern
pub fn id_matches(element: ElementRef<'_>, pattern: &Regex) -> bool {
    element.value().id().is_some_and(|id| pattern.is_match(id))
}

/// Selects every element of a document matching a CSS selector
///
/// An unparseable selector selects nothing.
pub fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Selects every descendant of an element matching a CSS selector
pub fn select_within<'a>(element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => element.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// First `n` characters of a string (not bytes)
pub fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
