//! # Language-model insights
//!
//! Turns a [`Dataset`] into a plain-text table, wraps it in the analysis
//! prompt and hands it to an [`InsightService`]. The bundled service is
//! [`OllamaClient`], which talks to a local Ollama server; tests and other
//! callers can pass any implementation of the trait.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::models::Dataset;
use crate::traits::InsightService;

pub const EMPTY_DATASET_REPLY: &str = "No components found.";

/// Price band, in dirhams, the model is asked to find deals in
#[derive(Debug, Clone, Copy)]
pub struct DealRange {
    pub min: u32,
    pub max: u32,
}

impl Default for DealRange {
    fn default() -> Self {
        Self { min: 3000, max: 4000 }
    }
}

/// Render the dataset as an aligned text table without a row index.
///
/// Text columns are left-aligned, the numeric price column right-aligned.
pub fn summary_table(dataset: &Dataset) -> String {
    let with_numeric = dataset.is_normalized();
    let mut headers = vec!["Brand", "Title", "Price", "Promotion", "Category"];
    if with_numeric {
        headers.push("Price (DH)");
    }

    let rows: Vec<Vec<String>> = dataset
        .components()
        .iter()
        .map(|c| {
            let mut row = vec![
                c.brand.clone(),
                c.title.clone(),
                c.price_display.clone(),
                c.promotion.clone(),
                c.category.to_string(),
            ];
            if with_numeric {
                row.push(format_amount(c.price_numeric.unwrap_or(f64::NAN)));
            }
            row
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|row| row[i].width())
                .chain(std::iter::once(header.width()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let numeric_column = with_numeric.then_some(headers.len() - 1);
    let render_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let padding = " ".repeat(widths[i].saturating_sub(cell.width()));
                if Some(i) == numeric_column {
                    format!("{padding}{cell}")
                } else {
                    format!("{cell}{padding}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_row(headers.clone())];
    lines.extend(
        rows.iter()
            .map(|row| render_row(row.iter().map(String::as_str).collect())),
    );
    lines.join("\n")
}

fn format_amount(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value:.2}")
    }
}

/// Build the analysis prompt around the dataset's table
pub fn build_prompt(dataset: &Dataset, deals: DealRange) -> String {
    format!(
        "Analyze the following PC component listings from Ultrapc.ma and provide:\n\
         - Insights on price ranges\n\
         - Most popular brands\n\
         - Availability insights (if applicable)\n\
         - Categorization by component types\n\
         - Top picks between {}dh and {}dh\n\n\
         {}\n\n\
         AI Analysis:",
        deals.min,
        deals.max,
        summary_table(dataset)
    )
}

/// Ask `service` for an analysis of `dataset`; an empty dataset is answered locally
pub async fn analyze(
    service: &dyn InsightService,
    dataset: &Dataset,
    deals: DealRange,
) -> Result<String> {
    if dataset.is_empty() {
        return Ok(EMPTY_DATASET_REPLY.to_string());
    }

    info!(
        "Requesting insights for {} components from {}",
        dataset.len(),
        service.name()
    );
    let prompt = build_prompt(dataset, deals);
    service.complete(&prompt).await
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for a local Ollama server's `/api/generate` endpoint
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
    num_ctx: u32,
}

impl OllamaClient {
    pub fn new(endpoint: &str, model: &str, num_ctx: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            num_ctx,
        })
    }
}

#[async_trait]
impl InsightService for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_ctx: self.num_ctx,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}", self.endpoint))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Ollama returned {} for model {}",
                response.status(),
                self.model
            ));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .context("Ollama response had no `response` field")?;

        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Component, NO_PROMOTION};
    use chrono::Utc;
    use std::sync::Mutex;

    struct RecordingService {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InsightService for RecordingService {
        fn name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("Good deals: RTX 4060".to_string())
        }
    }

    fn component(brand: &str, title: &str, price: &str, category: Category) -> Component {
        Component {
            brand: brand.to_string(),
            title: title.to_string(),
            price_display: price.to_string(),
            promotion: NO_PROMOTION.to_string(),
            category,
            price_numeric: None,
        }
    }

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                component("MSI", "MSI GeForce RTX 4060", "3,499 DH", Category::Gpu),
                component("G.Skill", "G.Skill Trident Z mémoire DDR5", "Price N/A", Category::Ram),
            ],
            1,
            Utc::now(),
        )
    }

    #[test]
    fn table_columns_line_up() {
        let table = summary_table(&dataset().normalize_prices());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Brand    Title"));
        assert!(lines[0].ends_with("Price (DH)"));
        assert!(lines[1].ends_with("3499.00"));
        assert!(lines[2].ends_with("NaN"));

        let title_column = lines[0].find("Title").unwrap();
        assert_eq!(&lines[1][title_column..title_column + 3], "MSI");
    }

    #[test]
    fn table_without_normalization_has_five_columns() {
        let table = summary_table(&dataset());
        assert!(!table.contains("Price (DH)"));
        assert!(table.lines().next().unwrap().ends_with("Category"));
    }

    #[test]
    fn prompt_embeds_table_and_deal_range() {
        let data = dataset();
        let prompt = build_prompt(&data, DealRange { min: 1000, max: 2000 });

        assert!(prompt.contains("Top picks between 1000dh and 2000dh"));
        assert!(prompt.contains(&summary_table(&data)));
        assert!(prompt.ends_with("AI Analysis:"));
    }

    #[tokio::test]
    async fn analyze_sends_prompt_to_service() {
        let service = RecordingService {
            prompts: Mutex::new(Vec::new()),
        };

        let answer = analyze(&service, &dataset(), DealRange::default())
            .await
            .unwrap();

        assert_eq!(answer, "Good deals: RTX 4060");
        let prompts = service.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("MSI GeForce RTX 4060"));
    }

    #[tokio::test]
    async fn empty_dataset_does_not_call_service() {
        let service = RecordingService {
            prompts: Mutex::new(Vec::new()),
        };
        let empty = Dataset::new(Vec::new(), 0, Utc::now());

        let answer = analyze(&service, &empty, DealRange::default())
            .await
            .unwrap();

        assert_eq!(answer, EMPTY_DATASET_REPLY);
        assert!(service.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn generate_request_matches_ollama_shape() {
        let request = GenerateRequest {
            model: "qwen2.5:3b",
            prompt: "hi",
            stream: false,
            options: GenerateOptions { num_ctx: 32000 },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "qwen2.5:3b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_ctx"], 32000);
    }
}
