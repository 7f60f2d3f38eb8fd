//! Numeric price parsing

use regex::Regex;
use std::sync::LazyLock;

/// A number directly preceded by a currency symbol
static RE_CURRENCY_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$£€]\s*(\d[\d,]*(?:\.\d+)?)").expect("currency amount regex")
});

/// Any number, used when the text carries no currency symbol
static RE_BARE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]*(?:\.\d+)?)").expect("bare amount regex"));

/// Parses the first currency-prefixed amount out of displayed price text
///
/// The first match wins, even on promotional text such as
/// `"Now $12.00, was $15.00"`. Text with no currency symbol falls back to
/// the first bare number. Returns `None` when nothing parses.
///
/// # Examples
///
/// ```
/// use catalog_scraper::extract::parse_price;
///
/// assert_eq!(parse_price("Now $1,234.56 (was $1,500)"), Some(1234.56));
/// assert_eq!(parse_price("Call for price"), None);
/// ```
pub fn parse_price(text: &str) -> Option<f64> {
    let captures = RE_CURRENCY_AMOUNT
        .captures(text)
        .or_else(|| RE_BARE_AMOUNT.captures(text))?;

    let digits = captures.get(1)?.as_str().replace(',', "");
    digits.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_currency_match_wins() {
        assert_eq!(parse_price("Now $1,234.56 (was $1,500)"), Some(1234.56));
    }

    #[test]
    fn test_currency_preferred_over_earlier_bare_number() {
        assert_eq!(parse_price("2 for $9.98"), Some(9.98));
    }

    #[test]
    fn test_bare_number_fallback() {
        assert_eq!(parse_price("Price: 45.10"), Some(45.1));
    }

    #[test]
    fn test_whole_dollars() {
        assert_eq!(parse_price("$1,500"), Some(1500.0));
    }

    #[test]
    fn test_other_currencies() {
        assert_eq!(parse_price("£ 12.50"), Some(12.5));
        assert_eq!(parse_price("€7"), Some(7.0));
    }

    #[test]
    fn test_no_number() {
        assert_eq!(parse_price("Call for pricing"), None);
        assert_eq!(parse_price(""), None);
    }
}
