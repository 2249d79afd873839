//! CSV import and export of component listings

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::models::{Component, Dataset, NO_PRICE, NO_PROMOTION, NO_TITLE, UNKNOWN_BRAND};

/// Write one row per component with a `Brand,Title,Price,Promotion,Category` header
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for component in dataset.components() {
        wtr.serialize(component)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv(dataset, file)?;
    info!("Saved {} components to {}", dataset.len(), path.display());
    Ok(())
}

/// Read components back from a file written by [`write_csv`]
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = csv::Reader::from_reader(reader);
    let components = rdr
        .deserialize::<Component>()
        .enumerate()
        .map(|(row, record)| {
            record
                .map(fill_blank_fields)
                .with_context(|| format!("Malformed CSV row {}", row + 1))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Dataset::new(components, 0, Utc::now()))
}

/// Files edited by hand may leave cells empty; put the sentinels back
fn fill_blank_fields(mut component: Component) -> Component {
    for (field, sentinel) in [
        (&mut component.brand, UNKNOWN_BRAND),
        (&mut component.title, NO_TITLE),
        (&mut component.price_display, NO_PRICE),
        (&mut component.promotion, NO_PROMOTION),
    ] {
        if field.trim().is_empty() {
            *field = sentinel.to_string();
        }
    }
    component
}

pub fn load_csv(path: &Path) -> Result<Dataset> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let dataset = read_csv(file)?;
    info!("Loaded {} components from {}", dataset.len(), path.display());
    Ok(dataset)
}
