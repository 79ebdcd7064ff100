//! Static food-label to calorie lookup

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

/// Calories reported for labels missing from the table
pub const DEFAULT_CALORIES: u32 = 0;

/// Approximate calories per serving for the built-in classes
const BUILTIN: &[(&str, u32)] = &[("Pizza", 285), ("Burger", 354), ("Salad", 152)];

/// Read-only calorie table, built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct CalorieTable {
    entries: HashMap<String, u32>,
    default: u32,
}

impl Default for CalorieTable {
    fn default() -> Self {
        Self::new(
            BUILTIN
                .iter()
                .map(|(label, kcal)| (label.to_string(), *kcal)),
            DEFAULT_CALORIES,
        )
    }
}

impl CalorieTable {
    pub fn new<I>(entries: I, default: u32) -> Self
    where
        I: IntoIterator<Item = (String, u32)>,
    {
        Self {
            entries: entries.into_iter().collect(),
            default,
        }
    }

    /// Load a table from a JSON object such as `{"Pizza": 285, "Burger": 354}`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read calorie table {}", path.display()))?;
        let entries: HashMap<String, u32> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid calorie table {}", path.display()))?;

        if entries.is_empty() {
            anyhow::bail!("Calorie table {} has no entries", path.display());
        }

        Ok(Self::new(entries, DEFAULT_CALORIES))
    }

    /// Calories for `label`, or the table default when the label is unknown.
    pub fn lookup(&self, label: &str) -> u32 {
        self.entries.get(label).copied().unwrap_or(self.default)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
