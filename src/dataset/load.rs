use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::ScaffoldDataset;
use super::parse::parse_dataset;

pub fn load_dataset(path: &Path) -> Result<ScaffoldDataset> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset file {}", path.display()))?;

    let fallback_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("dataset");

    let dataset = parse_dataset(&raw, fallback_name)
        .with_context(|| format!("failed to parse dataset file {}", path.display()))?;

    info!(
        dataset = %dataset.name,
        scaffolds = dataset.scaffold_count(),
        molecules = dataset.molecule_count(),
        "loaded scaffold dataset"
    );
    Ok(dataset)
}
