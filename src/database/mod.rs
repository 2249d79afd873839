//! SQLite history of scrape runs

use std::collections::HashSet;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::models::{Component, Dataset};

/// Outcome of recording one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: i64,
    /// Components whose brand and title were never stored by an earlier run
    pub new_components: usize,
}

/// Stable identity of a listing across runs
pub fn component_key(component: &Component) -> String {
    format!(
        "{:x}",
        md5::compute(format!("{}:{}", component.brand, component.title))
    )
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(db_url)
            .with_context(|| format!("Invalid database URL {db_url}"))?
            .create_if_missing(true);

        // SQLite creates the file but not its directory
        if let Some(dir) = options.clone()
            .get_filename()
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let pool = SqlitePool::connect_with(options).await?;
        Self::migrate(pool).await
    }

    /// A private database that lives as long as the returned handle
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Database initialized successfully");
        Ok(Self { pool })
    }

    pub async fn get_known_component_keys(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT DISTINCT component_key FROM components")
            .fetch_all(&self.pool)
            .await?;

        let keys = rows
            .into_iter()
            .map(|row| row.get::<String, _>("component_key"))
            .collect();

        Ok(keys)
    }

    /// Store a run and its components in one transaction
    pub async fn save_run(&self, dataset: &Dataset) -> Result<RunSummary> {
        let known = self.get_known_component_keys().await?;
        let mut tx = self.pool.begin().await?;

        let run_id = sqlx::query(
            r"
            INSERT INTO scrape_runs (scraped_at, pages_scraped, component_count, normalized)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(dataset.scraped_at())
        .bind(i64::from(dataset.pages_scraped()))
        .bind(dataset.len() as i64)
        .bind(dataset.is_normalized())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let mut seen_this_run = HashSet::new();
        let mut new_components = 0;

        for (position, component) in dataset.components().iter().enumerate() {
            let key = component_key(component);
            if !known.contains(&key) && seen_this_run.insert(key.clone()) {
                new_components += 1;
            }

            sqlx::query(
                r"
                INSERT INTO components
                    (run_id, position, component_key, brand, title, price, promotion, category, price_dh)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(run_id)
            .bind(position as i64)
            .bind(&key)
            .bind(&component.brand)
            .bind(&component.title)
            .bind(&component.price_display)
            .bind(&component.promotion)
            .bind(component.category.label())
            .bind(component.price_numeric.filter(|p| !p.is_nan()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "Recorded run {} with {} components ({} new)",
            run_id,
            dataset.len(),
            new_components
        );
        Ok(RunSummary {
            run_id,
            new_components,
        })
    }

    /// Rebuild the dataset stored for `run_id`.
    ///
    /// NaN prices are stored as NULL; in a normalized run they come back as `Some(NaN)`.
    pub async fn load_run(&self, run_id: i64) -> Result<Dataset> {
        let run = sqlx::query(
            "SELECT scraped_at, pages_scraped, normalized FROM scrape_runs WHERE id = ?",
        )
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| anyhow::anyhow!("No scrape run with id {}", run_id))?;

        let rows = sqlx::query(
            r"
            SELECT brand, title, price, promotion, category, price_dh
            FROM components
            WHERE run_id = ?
            ORDER BY position
            ",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        let normalized: bool = run.get("normalized");
        let mut components = Vec::with_capacity(rows.len());
        for row in rows {
            let price_dh: Option<f64> = row.get("price_dh");
            components.push(Component {
                brand: row.get("brand"),
                title: row.get("title"),
                price_display: row.get("price"),
                promotion: row.get("promotion"),
                category: row.get::<String, _>("category").parse()?,
                price_numeric: if normalized {
                    Some(price_dh.unwrap_or(f64::NAN))
                } else {
                    price_dh
                },
            });
        }

        Ok(Dataset::new(
            components,
            u32::try_from(run.get::<i64, _>("pages_scraped"))?,
            run.get::<DateTime<Utc>, _>("scraped_at"),
        ))
    }
}
