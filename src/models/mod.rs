//! Data models for scraped components and scrape runs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_BRAND: &str = "Unknown";
pub const NO_TITLE: &str = "No title";
pub const NO_PROMOTION: &str = "N/A";
pub const NO_PRICE: &str = "Price N/A";

/// Hardware category assigned from a product title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "CPU")]
    Cpu,
    #[serde(rename = "GPU")]
    Gpu,
    Storage,
    #[serde(rename = "RAM")]
    Ram,
    Motherboard,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Cpu,
        Category::Gpu,
        Category::Storage,
        Category::Ram,
        Category::Motherboard,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Cpu => "CPU",
            Category::Gpu => "GPU",
            Category::Storage => "Storage",
            Category::Ram => "RAM",
            Category::Motherboard => "Motherboard",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown category: {s}"))
    }
}

/// A component listing scraped from one product card.
///
/// Every text field carries either extracted content or one of the sentinel
/// constants above, never an empty value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Price")]
    pub price_display: String,
    #[serde(rename = "Promotion")]
    pub promotion: String,
    #[serde(rename = "Category")]
    pub category: Category,
    /// Set by price normalization; `Some(NaN)` when the display price has no digits
    #[serde(
        rename = "Price (DH)",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub price_numeric: Option<f64>,
}

/// Everything one scrape run produced, in page order then card order
#[derive(Debug, Clone)]
pub struct Dataset {
    components: Vec<Component>,
    pages_scraped: u32,
    scraped_at: DateTime<Utc>,
}

impl Dataset {
    pub fn new(components: Vec<Component>, pages_scraped: u32, scraped_at: DateTime<Utc>) -> Self {
        Self {
            components,
            pages_scraped,
            scraped_at,
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of listing pages that contributed at least one component
    pub fn pages_scraped(&self) -> u32 {
        self.pages_scraped
    }

    pub fn scraped_at(&self) -> DateTime<Utc> {
        self.scraped_at
    }

    pub fn is_normalized(&self) -> bool {
        !self.components.is_empty() && self.components.iter().all(|c| c.price_numeric.is_some())
    }

    pub(crate) fn map_components(self, f: impl FnMut(Component) -> Component) -> Self {
        Self {
            components: self.components.into_iter().map(f).collect(),
            ..self
        }
    }
}
