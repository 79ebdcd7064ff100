//! Class index to food label mapping

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

/// Classes in the order the bundled model was trained on
pub const BUILTIN_LABELS: &[&str] = &["Pizza", "Burger", "Salad"];

pub fn builtin_labels() -> Vec<String> {
    BUILTIN_LABELS.iter().map(|s| s.to_string()).collect()
}

/// Load labels from a text file, one per line in class-index order.
///
/// Blank lines are skipped and surrounding whitespace trimmed.
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open labels file: {}", path.display()))?;

    let mut labels = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.context("Failed to read labels line")?;
        let label = line.trim();
        if !label.is_empty() {
            labels.push(label.to_string());
        }
    }

    if labels.is_empty() {
        anyhow::bail!("Labels file {} is empty", path.display());
    }

    Ok(labels)
}

/// Label for a predicted class index; out-of-range indices get a synthetic name.
pub fn label_for(labels: &[String], index: usize) -> String {
    labels
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("class_{}", index))
}
