use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::codec::EdgeMask;

/// ROI labels plus the edge mask they induce. Built once at startup from the
/// atlas label file and read-only thereafter.
#[derive(Debug, Clone)]
pub struct Atlas {
    pub labels: Vec<String>,
    pub mask: EdgeMask,
}

impl Atlas {
    pub fn n_rois(&self) -> usize {
        self.labels.len()
    }
}

/// Reads a headerless two-column TSV (numeric index, ROI label). Row order
/// defines ROI order and therefore edge order everywhere downstream.
pub fn read_atlas(path: &Path) -> Result<Atlas> {
    let file = File::open(path).with_context(|| format!("open atlas file {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut labels = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.splitn(2, '\t');
        let _index = parts.next().unwrap_or_default();
        let label = parts.next().ok_or_else(|| {
            anyhow::anyhow!(
                "atlas file {} line {}: expected two tab-separated columns",
                path.display(),
                lineno + 1
            )
        })?;
        labels.push(label.trim().to_string());
    }
    if labels.is_empty() {
        return Err(anyhow::anyhow!("atlas file {} is empty", path.display()));
    }

    let mask = EdgeMask::lower_triangular(labels.len());
    info!(
        "Atlas {} defines {} ROIs ({} edges)",
        path.display(),
        labels.len(),
        mask.n_edges()
    );
    Ok(Atlas { labels, mask })
}
