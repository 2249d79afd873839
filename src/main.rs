use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

mod browser;
mod classifier;
mod component_finder;
mod config;
mod database;
mod export;
mod insights;
mod models;
mod prices;
mod scraper;
mod stats;
mod traits;

use browser::WebDriverSession;
use component_finder::ComponentFinder;
use config::Config;
use database::Database;
use insights::OllamaClient;
use models::Dataset;
use stats::DatasetStats;
use traits::ScraperConfig;

#[derive(Parser)]
#[command(
    name = "component-finder",
    about = "Scrape PC component listings from ultrapc.ma and ask a local model about them"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Highest listing page to fetch (env: MAX_PAGES)
    #[arg(short = 'n', long, global = true)]
    max_pages: Option<u32>,

    /// Catalog URL without the page parameter (env: COMPONENTS_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// CSV file to write or read (env: COMPONENTS_CSV)
    #[arg(long, global = true)]
    csv: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the catalog, save it as CSV and record the run
    Scrape {
        /// Skip the SQLite run history
        #[arg(long)]
        no_db: bool,
    },
    /// Load a saved CSV (or a recorded run), print statistics and ask the model for insights
    Analyze {
        /// Analyze this recorded run instead of the CSV file
        #[arg(long)]
        run: Option<i64>,
    },
    /// Scrape then analyze in one go
    Run {
        /// Skip the SQLite run history
        #[arg(long)]
        no_db: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(max_pages) = cli.max_pages {
        config.max_pages = max_pages;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(csv) = cli.csv {
        config.csv_path = csv;
    }

    match cli.command {
        Commands::Scrape { no_db } => {
            scrape_and_save(&config, no_db).await?;
        }
        Commands::Analyze { run } => {
            let dataset = match run {
                Some(run_id) => Database::new(&config.database_url).await?.load_run(run_id).await?,
                None => export::load_csv(&config.csv_path)?,
            };
            report(&config, &dataset.normalize_prices()).await?;
        }
        Commands::Run { no_db } => {
            let dataset = scrape_and_save(&config, no_db).await?;
            report(&config, &dataset).await?;
        }
    }

    Ok(())
}

async fn scrape(config: &Config) -> Result<Dataset> {
    let scraper_config = ScraperConfig::ultrapc();
    let finder = ComponentFinder::new(scraper_config.clone())?;
    let mut session =
        WebDriverSession::connect(&config.webdriver_url, config.render_options(&scraper_config))
            .await?;

    let pb = ProgressBar::new(u64::from(config.max_pages));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let dataset = finder
        .scrape_all(&mut session, &config.base_url, config.max_pages, |page| {
            pb.set_position(u64::from(page - 1));
            pb.set_message(format!("scraping page {page}"));
        })
        .await;
    pb.finish_and_clear();

    Ok(dataset?.normalize_prices())
}

async fn scrape_and_save(config: &Config, no_db: bool) -> Result<Dataset> {
    let dataset = scrape(config).await?;

    if dataset.is_empty() {
        println!("No component data found.");
        return Ok(dataset);
    }

    export::save_csv(&dataset, &config.csv_path)?;
    println!(
        "Scraped {} products from {} pages, saved to {}",
        dataset.len(),
        dataset.pages_scraped(),
        config.csv_path.display()
    );

    if !no_db {
        let database = Database::new(&config.database_url).await?;
        let summary = database.save_run(&dataset).await?;
        println!(
            "Run {} recorded, {} products not seen before",
            summary.run_id, summary.new_components
        );
    }

    Ok(dataset)
}

async fn report(config: &Config, dataset: &Dataset) -> Result<()> {
    if dataset.is_empty() {
        warn!("Nothing to analyze");
        return Ok(());
    }

    println!("{}", insights::summary_table(dataset));
    println!();
    print!("{}", DatasetStats::compute(dataset));

    let service = OllamaClient::new(
        &config.ollama_url,
        &config.ollama_model,
        config.ollama_num_ctx,
    )?;
    info!("Generating insights, this can take a while");
    let analysis = insights::analyze(&service, dataset, config.deal_range).await?;

    println!("\nAI-powered insights\n");
    println!("{analysis}");
    Ok(())
}
