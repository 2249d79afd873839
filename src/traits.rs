//! Traits and interfaces for the collaborators the scraper depends on

use anyhow::Result;
use async_trait::async_trait;

/// Configuration for the listing site being scraped
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Display name for the website
    pub name: String,
    /// Query parameter carrying the 1-based page number
    pub page_param: String,
    /// CSS selectors for extracting data
    pub selectors: SiteSelectors,
}

impl ScraperConfig {
    pub fn ultrapc() -> Self {
        Self {
            name: "UltraPC".to_string(),
            page_param: "p".to_string(),
            selectors: SiteSelectors::default(),
        }
    }
}

/// CSS selectors for different parts of a product listing
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    /// Container selector for individual product cards
    pub product_card: String,
    /// Thumbnail block holding the title link
    pub thumbnail_container: String,
    /// Link carrying the product title, inside the thumbnail block
    pub title_link: String,
    /// Image inside the title link, used for its alt text
    pub image: String,
    /// Promotional flags list
    pub flags: String,
    /// Displayed price
    pub price: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            product_card: "article.product-miniature".to_string(),
            thumbnail_container: "div.thumbnail-container".to_string(),
            title_link: "a.product-thumbnail".to_string(),
            image: "img".to_string(),
            flags: "ul.product-flags".to_string(),
            price: "span.price".to_string(),
        }
    }
}

/// A browser session able to render pages after their scripts ran
#[async_trait]
pub trait PageRenderer: Send {
    /// Navigate to `url` and return the rendered markup
    ///
    /// # Returns
    /// * `Result<String>` - The page HTML, or an error on timeout/navigation failure
    async fn render(&mut self, url: &str) -> Result<String>;

    /// Tear the session down. Calling it twice is harmless.
    async fn close(&mut self) -> Result<()>;
}

/// Free-text completion service used for the insight report
#[async_trait]
pub trait InsightService: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Complete `prompt` and return the model's answer
    async fn complete(&self, prompt: &str) -> Result<String>;
}
