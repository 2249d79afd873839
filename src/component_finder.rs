use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use url::Url;

use crate::models::{Component, Dataset};
use crate::scraper::ListingExtractor;
use crate::traits::{PageRenderer, ScraperConfig};

/// Walks the paginated catalog and gathers every component it lists
pub struct ComponentFinder {
    config: ScraperConfig,
    extractor: ListingExtractor,
}

impl ComponentFinder {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let extractor = ListingExtractor::new(&config.selectors)?;
        Ok(Self { config, extractor })
    }

    /// Scrape pages `1..=max_pages` of `base_url` through one browser session.
    ///
    /// Stops at the first page that yields nothing or fails to render; the
    /// two cases are not told apart. The session is closed on every path.
    /// `on_page` receives each page number before it is fetched.
    pub async fn scrape_all<R>(
        &self,
        renderer: &mut R,
        base_url: &str,
        max_pages: u32,
        on_page: impl FnMut(u32),
    ) -> Result<Dataset>
    where
        R: PageRenderer + ?Sized,
    {
        let result = self.paginate(renderer, base_url, max_pages, on_page).await;

        if let Err(e) = renderer.close().await {
            warn!("Failed to close browser session cleanly: {:#}", e);
        }

        result
    }

    async fn paginate<R>(
        &self,
        renderer: &mut R,
        base_url: &str,
        max_pages: u32,
        mut on_page: impl FnMut(u32),
    ) -> Result<Dataset>
    where
        R: PageRenderer + ?Sized,
    {
        let base = Url::parse(base_url).with_context(|| format!("Invalid base URL {base_url}"))?;
        let scraped_at = Utc::now();

        info!(
            "Scraping up to {} pages of {} from {}",
            max_pages, self.config.name, base
        );

        let mut all_components: Vec<Component> = Vec::new();
        let mut pages_scraped = 0;

        for page_num in 1..=max_pages {
            on_page(page_num);
            let url = page_url(&base, &self.config.page_param, page_num);
            info!("Scraping page {}", page_num);

            let components = match renderer.render(url.as_str()).await {
                Ok(html) => self.extractor.extract(&html),
                Err(e) => {
                    warn!("Page {} could not be loaded, stopping: {:#}", page_num, e);
                    break;
                }
            };

            if components.is_empty() {
                info!(
                    "No components on page {}, assuming end of catalog",
                    page_num
                );
                break;
            }

            info!("Found {} components on page {}", components.len(), page_num);
            all_components.extend(components);
            pages_scraped += 1;
        }

        info!(
            "Collected {} components from {} pages of {}",
            all_components.len(),
            pages_scraped,
            self.config.name
        );

        Ok(Dataset::new(all_components, pages_scraped, scraped_at))
    }
}

/// `base` with its page parameter set to `page`, other query pairs kept
pub fn page_url(base: &Url, page_param: &str, page: u32) -> Url {
    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != page_param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(page_param, &page.to_string());
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Serves `pages` in order; anything past the end renders as an empty listing
    struct MockRenderer {
        pages: Vec<Result<String, String>>,
        requests: Vec<String>,
        closed: bool,
    }

    impl MockRenderer {
        fn new(pages: Vec<Result<String, String>>) -> Self {
            Self {
                pages,
                requests: Vec::new(),
                closed: false,
            }
        }
    }

    #[async_trait]
    impl PageRenderer for MockRenderer {
        async fn render(&mut self, url: &str) -> Result<String> {
            self.requests.push(url.to_string());
            match self.pages.get(self.requests.len() - 1) {
                Some(Ok(html)) => Ok(html.clone()),
                Some(Err(message)) => Err(anyhow::anyhow!(message.clone())),
                None => Ok(listing(0, 0)),
            }
        }

        async fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn listing(page: usize, cards: usize) -> String {
        let cards: String = (0..cards)
            .map(|i| {
                format!(
                    r#"<article class="product-miniature"><div class="thumbnail-container">
                         <a class="product-thumbnail">Brand{page} Item {i}</a>
                       </div><span class="price">{} DH</span></article>"#,
                    100 * (i + 1)
                )
            })
            .collect();
        format!("<html><body>{cards}</body></html>")
    }

    fn finder() -> ComponentFinder {
        ComponentFinder::new(ScraperConfig::ultrapc()).unwrap()
    }

    const BASE: &str = "https://www.ultrapc.ma/20-composants";

    #[tokio::test]
    async fn stops_at_first_empty_page() {
        let mut pages: Vec<Result<String, String>> = (1..=10).map(|p| Ok(listing(p, 3))).collect();
        pages.push(Ok(listing(11, 0)));
        let mut renderer = MockRenderer::new(pages);

        let dataset = finder()
            .scrape_all(&mut renderer, BASE, 20, |_| {})
            .await
            .unwrap();

        assert_eq!(renderer.requests.len(), 11);
        assert_eq!(dataset.len(), 30);
        assert_eq!(dataset.pages_scraped(), 10);
        assert!(renderer.closed);
    }

    #[tokio::test]
    async fn never_fetches_more_than_max_pages() {
        let pages = (1..=10).map(|p| Ok(listing(p, 2))).collect();
        let mut renderer = MockRenderer::new(pages);
        let mut reported = Vec::new();

        let dataset = finder()
            .scrape_all(&mut renderer, BASE, 3, |page| reported.push(page))
            .await
            .unwrap();

        assert_eq!(
            renderer.requests,
            vec![
                format!("{BASE}?p=1"),
                format!("{BASE}?p=2"),
                format!("{BASE}?p=3"),
            ]
        );
        assert_eq!(reported, vec![1, 2, 3]);
        assert_eq!(dataset.len(), 6);
    }

    #[tokio::test]
    async fn keeps_page_order_then_card_order() {
        let pages = vec![Ok(listing(1, 2)), Ok(listing(2, 2))];
        let mut renderer = MockRenderer::new(pages);

        let dataset = finder()
            .scrape_all(&mut renderer, BASE, 5, |_| {})
            .await
            .unwrap();

        let titles: Vec<&str> = dataset.components().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Brand1 Item 0", "Brand1 Item 1", "Brand2 Item 0", "Brand2 Item 1"]
        );
    }

    #[tokio::test]
    async fn render_failure_ends_the_run_with_what_was_gathered() {
        let pages = vec![
            Ok(listing(1, 4)),
            Err("navigation timed out".to_string()),
            Ok(listing(3, 4)),
        ];
        let mut renderer = MockRenderer::new(pages);

        let dataset = finder()
            .scrape_all(&mut renderer, BASE, 10, |_| {})
            .await
            .unwrap();

        assert_eq!(renderer.requests.len(), 2);
        assert_eq!(dataset.len(), 4);
        assert!(renderer.closed);
    }

    #[tokio::test]
    async fn invalid_base_url_is_an_error_and_still_closes_the_session() {
        let mut renderer = MockRenderer::new(Vec::new());

        let result = finder()
            .scrape_all(&mut renderer, "not a url", 5, |_| {})
            .await;

        assert!(result.is_err());
        assert!(renderer.requests.is_empty());
        assert!(renderer.closed);
    }

    #[tokio::test]
    async fn zero_max_pages_fetches_nothing() {
        let mut renderer = MockRenderer::new(vec![Ok(listing(1, 1))]);

        let dataset = finder()
            .scrape_all(&mut renderer, BASE, 0, |_| {})
            .await
            .unwrap();

        assert!(dataset.is_empty());
        assert!(renderer.requests.is_empty());
    }

    #[test]
    fn page_url_replaces_existing_page_parameter() {
        let base = Url::parse("https://www.ultrapc.ma/20-composants?order=price&p=7").unwrap();

        assert_eq!(
            page_url(&base, "p", 2).as_str(),
            "https://www.ultrapc.ma/20-composants?order=price&p=2"
        );
    }
}
