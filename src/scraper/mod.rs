//! Extraction of component records from one rendered listing page

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

use crate::classifier::classify;
use crate::models::{Component, NO_PRICE, NO_PROMOTION, NO_TITLE, UNKNOWN_BRAND};
use crate::traits::SiteSelectors;

/// Why a product card was left out of the page's results
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CardError {
    #[error("product card has no thumbnail container")]
    MissingThumbnail,
    #[error("thumbnail container has no title link")]
    MissingTitleLink,
}

/// Parsed selectors for one listing layout
pub struct ListingExtractor {
    product_card: Selector,
    thumbnail_container: Selector,
    title_link: Selector,
    image: Selector,
    flags: Selector,
    price: Selector,
}

fn parse_selector(name: &str, css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| anyhow::anyhow!("Failed to parse {} selector {:?}: {:?}", name, css, e))
}

impl ListingExtractor {
    pub fn new(selectors: &SiteSelectors) -> Result<Self> {
        Ok(Self {
            product_card: parse_selector("product card", &selectors.product_card)?,
            thumbnail_container: parse_selector(
                "thumbnail container",
                &selectors.thumbnail_container,
            )?,
            title_link: parse_selector("title link", &selectors.title_link)?,
            image: parse_selector("image", &selectors.image)?,
            flags: parse_selector("flags", &selectors.flags)?,
            price: parse_selector("price", &selectors.price)?,
        })
    }

    /// Extract every well-formed product card, in document order.
    ///
    /// A page without cards yields an empty vector. Cards missing their
    /// title structure are skipped; the rest of the page is unaffected.
    pub fn extract(&self, html: &str) -> Vec<Component> {
        let document = Html::parse_document(html);
        let mut components = Vec::new();

        for (index, card) in document.select(&self.product_card).enumerate() {
            match self.extract_card(card) {
                Ok(component) => components.push(component),
                Err(e) => debug!("Skipping product card {}: {}", index, e),
            }
        }

        components
    }

    fn extract_card(&self, card: ElementRef<'_>) -> Result<Component, CardError> {
        let container = card
            .select(&self.thumbnail_container)
            .next()
            .ok_or(CardError::MissingThumbnail)?;
        let link = container
            .select(&self.title_link)
            .next()
            .ok_or(CardError::MissingTitleLink)?;

        let visible_title = joined_text(link, " ");

        // Brand comes from the visible title when there is one, else from the image alt text
        let (title, brand) = match visible_title {
            Some(title) => {
                let brand = first_token(&title);
                (title, brand)
            }
            None => {
                let title = link
                    .value()
                    .attr("title")
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string);
                let brand = link
                    .select(&self.image)
                    .next()
                    .and_then(|img| img.value().attr("alt"))
                    .and_then(first_token);
                (title.unwrap_or_else(|| NO_TITLE.to_string()), brand)
            }
        };

        let promotion = card
            .select(&self.flags)
            .next()
            .and_then(|flags| joined_text(flags, ", "));

        let price_display = card
            .select(&self.price)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|p| !p.is_empty());

        let category = classify(&title);

        Ok(Component {
            brand: brand.unwrap_or_else(|| UNKNOWN_BRAND.to_string()),
            title,
            price_display: price_display.unwrap_or_else(|| NO_PRICE.to_string()),
            promotion: promotion.unwrap_or_else(|| NO_PROMOTION.to_string()),
            category,
            price_numeric: None,
        })
    }
}

/// Trimmed text nodes of `element`, blanks dropped, joined with `separator`
fn joined_text(element: ElementRef<'_>, separator: &str) -> Option<String> {
    let parts: Vec<&str> = element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(separator))
    }
}

fn first_token(text: &str) -> Option<String> {
    text.split_whitespace().next().map(str::to_string)
}
