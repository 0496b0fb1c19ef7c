use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

pub const REPORT_FILE: &str = "cwas_report.json";

/// Accumulating run-level report. Stages merge their summaries into the same
/// JSON object on disk; existing keys from earlier stages are preserved
/// unless a later stage writes the same key.
#[derive(Debug, Clone)]
pub struct RunReport {
    path: PathBuf,
}

impl RunReport {
    pub fn new(out_dir: &Path) -> Self {
        Self {
            path: out_dir.join(REPORT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Merges `summary` into the on-disk report, creating the file if needed.
    pub fn merge(&self, summary: &Map<String, Value>) -> Result<()> {
        let mut existing = if self.path.exists() {
            let text = fs::read_to_string(&self.path)
                .with_context(|| format!("read report {}", self.path.display()))?;
            serde_json::from_str::<Map<String, Value>>(&text)
                .with_context(|| format!("parse report {}", self.path.display()))?
        } else {
            Map::new()
        };
        for (key, value) in summary {
            existing.insert(key.clone(), value.clone());
        }
        let text = serde_json::to_string_pretty(&Value::Object(existing))?;
        fs::write(&self.path, text)
            .with_context(|| format!("write report {}", self.path.display()))?;
        Ok(())
    }
}

/// Shorthand for building a report section from key-value pairs.
pub fn summary(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
