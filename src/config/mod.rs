//! Runtime configuration from environment variables
//!
//! `main` loads a `.env` file first, so every setting below can live there.
//! Unset variables fall back to defaults suited to scraping ultrapc.ma with a
//! local WebDriver and a local Ollama server.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::browser::RenderOptions;
use crate::insights::DealRange;
use crate::traits::ScraperConfig;

pub const DEFAULT_BASE_URL: &str = "https://www.ultrapc.ma/20-composants";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub max_pages: u32,
    pub webdriver_url: String,
    pub page_timeout: Duration,
    pub settle_delay: Duration,
    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_num_ctx: u32,
    pub deal_range: DealRange,
    pub database_url: String,
    pub csv_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup, `from_env` uses the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            base_url: text("COMPONENTS_BASE_URL", DEFAULT_BASE_URL),
            max_pages: parsed(&lookup, "MAX_PAGES", 72)?,
            webdriver_url: text("WEBDRIVER_URL", "http://localhost:4444"),
            page_timeout: Duration::from_secs(parsed(&lookup, "PAGE_TIMEOUT_SECS", 10)?),
            settle_delay: Duration::from_millis(parsed(&lookup, "SETTLE_DELAY_MS", 2000)?),
            ollama_url: text("OLLAMA_URL", "http://localhost:11434"),
            ollama_model: text("OLLAMA_MODEL", "qwen2.5:3b"),
            ollama_num_ctx: parsed(&lookup, "OLLAMA_NUM_CTX", 32000)?,
            deal_range: DealRange {
                min: parsed(&lookup, "DEAL_MIN_DH", 3000)?,
                max: parsed(&lookup, "DEAL_MAX_DH", 4000)?,
            },
            database_url: text("DATABASE_URL", "sqlite:database/components.db"),
            csv_path: PathBuf::from(text("COMPONENTS_CSV", "components.csv")),
        })
    }

    pub fn render_options(&self, scraper: &ScraperConfig) -> RenderOptions {
        RenderOptions {
            page_timeout: self.page_timeout,
            settle_delay: self.settle_delay,
            ready_selector: scraper.selectors.product_card.clone(),
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {value:?}")),
        None => Ok(default),
    }
}
