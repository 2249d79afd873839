//! Aggregates behind the category and brand charts

use std::collections::HashMap;
use std::fmt;

use crate::models::{Category, Dataset};

const TOP_BRANDS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub category: Category,
    pub count: usize,
    /// Mean of the parsed prices, `None` when no price in the category parsed
    pub average_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    /// Categories present in the dataset, most frequent first
    pub categories: Vec<CategoryStats>,
    /// Up to ten brands with the most listings
    pub top_brands: Vec<(String, usize)>,
}

impl DatasetStats {
    pub fn compute(dataset: &Dataset) -> Self {
        let mut per_category: HashMap<Category, (usize, f64, usize)> = HashMap::new();
        let mut per_brand: HashMap<&str, usize> = HashMap::new();

        for component in dataset.components() {
            let entry = per_category.entry(component.category).or_default();
            entry.0 += 1;
            if let Some(price) = component.price_numeric.filter(|p| !p.is_nan()) {
                entry.1 += price;
                entry.2 += 1;
            }
            *per_brand.entry(component.brand.as_str()).or_default() += 1;
        }

        let mut categories: Vec<CategoryStats> = per_category
            .into_iter()
            .map(|(category, (count, sum, priced))| CategoryStats {
                category,
                count,
                average_price: (priced > 0).then(|| sum / priced as f64),
            })
            .collect();
        // Ties fall back to the classifier's category order
        categories.sort_by_key(|s| {
            let rank = Category::ALL.iter().position(|c| *c == s.category);
            (std::cmp::Reverse(s.count), rank)
        });

        let mut top_brands: Vec<(String, usize)> = per_brand
            .into_iter()
            .map(|(brand, count)| (brand.to_string(), count))
            .collect();
        top_brands.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_brands.truncate(TOP_BRANDS);

        Self {
            categories,
            top_brands,
        }
    }
}

impl fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Component count by category")?;
        for stats in &self.categories {
            let average = stats
                .average_price
                .map_or_else(|| "n/a".to_string(), |p| format!("{p:.2} DH"));
            writeln!(
                f,
                "  {:<12} {:>5}   avg {}",
                stats.category.label(),
                stats.count,
                average
            )?;
        }

        writeln!(f, "Top {} brands by number of products", TOP_BRANDS)?;
        for (brand, count) in &self.top_brands {
            writeln!(f, "  {brand:<20} {count:>5}")?;
        }
        Ok(())
    }
}
