//! Keyword-based hardware classification of product titles

use crate::models::Category;

/// Ordered rules, first match wins. Titles on the catalog mix French and
/// English, so both vocabularies appear.
const RULES: &[(Category, &[&str])] = &[
    (Category::Cpu, &["processeur", "cpu", "ryzen", "intel core"]),
    (
        Category::Gpu,
        &["carte graphique", "gpu", "rtx", "radeon", "geforce"],
    ),
    (Category::Storage, &["ssd", "hdd", "disque", "nvme"]),
    (Category::Ram, &["ram", "mémoire", "ddr4", "ddr5"]),
    (
        Category::Motherboard,
        &["carte mère", "motherboard", "b550", "z790"],
    ),
];

/// Classify a title into a [`Category`], falling back to [`Category::Other`]
pub fn classify(title: &str) -> Category {
    let title_lower = title.to_lowercase();

    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| title_lower.contains(k)))
        .map_or(Category::Other, |(category, _)| *category)
}
