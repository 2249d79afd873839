//! Numeric price parsing for displayed prices such as `"12,500 DH"`

use std::sync::LazyLock;

use regex::Regex;

use crate::models::Dataset;

static CURRENCY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:dhs?|mad)\b").unwrap());
static AMOUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").unwrap());

/// Parse the first amount in a display price, `NaN` when there is none
pub fn parse_price(display: &str) -> f64 {
    let without_currency = CURRENCY_SUFFIX.replace_all(display, "");
    let cleaned: String = without_currency
        .chars()
        .filter(|c| !matches!(c, ',' | '\u{a0}' | '\u{202f}'))
        .collect();

    AMOUNT
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

impl Dataset {
    /// Fill `price_numeric` for every component; nothing is dropped
    pub fn normalize_prices(self) -> Self {
        self.map_components(|mut component| {
            component.price_numeric = Some(parse_price(&component.price_display));
            component
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Component, NO_PRICE, NO_PROMOTION};
    use chrono::Utc;

    #[test]
    fn parses_catalog_prices() {
        assert_eq!(parse_price("12,500 DH"), 12500.0);
        assert_eq!(parse_price("899.50DH"), 899.5);
        assert_eq!(parse_price("1\u{202f}299 MAD"), 1299.0);
        assert_eq!(parse_price("à partir de 450 Dhs"), 450.0);
        assert_eq!(parse_price("3499"), 3499.0);
    }

    #[test]
    fn only_ascii_digits_form_an_amount() {
        assert_eq!(parse_price("\u{661}\u{662}\u{663} / 450 DH"), 450.0);
        assert!(parse_price("\u{661}\u{662}\u{663} DH").is_nan());
    }

    #[test]
    fn missing_digits_give_nan_not_zero() {
        assert!(parse_price(NO_PRICE).is_nan());
        assert!(parse_price("").is_nan());
        assert!(parse_price("DH").is_nan());
    }

    #[test]
    fn normalization_keeps_every_row() {
        let prices = ["12,500 DH", NO_PRICE, "899.50DH", "Sur devis"];
        let components = prices
            .iter()
            .map(|p| Component {
                brand: "Test".to_string(),
                title: "Test".to_string(),
                price_display: (*p).to_string(),
                promotion: NO_PROMOTION.to_string(),
                category: Category::Other,
                price_numeric: None,
            })
            .collect();

        let dataset = Dataset::new(components, 1, Utc::now()).normalize_prices();

        assert_eq!(dataset.len(), prices.len());
        assert!(dataset.is_normalized());
        let numeric: Vec<f64> = dataset
            .components()
            .iter()
            .map(|c| c.price_numeric.unwrap())
            .collect();
        assert_eq!(numeric[0], 12500.0);
        assert!(numeric[1].is_nan());
        assert_eq!(numeric[2], 899.5);
        assert!(numeric[3].is_nan());
    }

    #[test]
    fn empty_dataset_stays_empty() {
        let dataset = Dataset::new(Vec::new(), 0, Utc::now()).normalize_prices();
        assert!(dataset.is_empty());
    }
}
