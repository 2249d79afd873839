//! Headless browser session over WebDriver

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use tracing::{debug, info};

use crate::traits::PageRenderer;

/// Timing knobs for page rendering
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Upper bound for navigation plus settling
    pub page_timeout: Duration,
    /// How long to wait for `ready_selector` to show up
    pub settle_delay: Duration,
    /// Element whose presence means the listing has rendered
    pub ready_selector: String,
}

/// A single WebDriver session reused for every page of a run
pub struct WebDriverSession {
    client: Option<Client>,
    options: RenderOptions,
}

impl WebDriverSession {
    /// Start a headless browser session on the WebDriver server at `webdriver_url`
    pub async fn connect(webdriver_url: &str, options: RenderOptions) -> Result<Self> {
        info!("Connecting to WebDriver at {}", webdriver_url);

        let mut capabilities = serde_json::Map::new();
        capabilities.insert(
            "moz:firefoxOptions".to_string(),
            json!({ "args": ["-headless"] }),
        );
        capabilities.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": ["--headless=new", "--disable-gpu"] }),
        );

        let mut builder = ClientBuilder::native();
        builder.capabilities(capabilities);
        let client = builder
            .connect(webdriver_url)
            .await
            .with_context(|| format!("Failed to start browser session at {webdriver_url}"))?;

        info!("Browser session ready");
        Ok(Self {
            client: Some(client),
            options,
        })
    }

    async fn navigate(client: &Client, url: &str, options: &RenderOptions) -> Result<String> {
        client.goto(url).await?;

        // An empty catalog page never shows a card, so a missed wait is not a failure
        if let Err(e) = client
            .wait()
            .at_most(options.settle_delay)
            .for_element(Locator::Css(&options.ready_selector))
            .await
        {
            debug!("No product card appeared on {} after settling: {}", url, e);
        }

        Ok(client.source().await?)
    }
}

#[async_trait]
impl PageRenderer for WebDriverSession {
    async fn render(&mut self, url: &str) -> Result<String> {
        let client = self
            .client
            .as_ref()
            .context("Browser session already closed")?;

        tokio::time::timeout(
            self.options.page_timeout,
            Self::navigate(client, url, &self.options),
        )
        .await
        .with_context(|| {
            format!(
                "Timed out after {:?} rendering {}",
                self.options.page_timeout, url
            )
        })?
        .with_context(|| format!("Failed to render {url}"))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            info!("Closing browser session");
            client.close().await?;
        }
        Ok(())
    }
}
