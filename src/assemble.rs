use std::path::{Path, PathBuf};

use anyhow::Result;
use polars::prelude::*;
use tracing::info;

use crate::atlas::Atlas;
use crate::codec::vector_to_matrix;
use crate::io::{write_dataframe, write_labeled_matrix};
use crate::types::{AssembledResults, CorrectedResult};

/// Maps the corrected per-edge vectors back into labeled ROI x ROI matrices
/// and builds the flat per-edge table. Row `i` of the table is the `i`-th
/// masked cell of the atlas in row-major order.
pub fn assemble(corrected: &CorrectedResult, atlas: &Atlas) -> Result<AssembledResults> {
    let stand_beta_matrix = vector_to_matrix(corrected.stand_betas.view(), &atlas.mask)?;
    let qval_matrix = vector_to_matrix(corrected.qvals.view(), &atlas.mask)?;

    let table = df!(
        "betas" => corrected.betas.to_vec(),
        "stand_betas" => corrected.stand_betas.to_vec(),
        "pvals" => corrected.pvals.to_vec(),
        "qval" => corrected.qvals.to_vec(),
    )?;

    Ok(AssembledResults {
        roi_labels: atlas.labels.clone(),
        stand_beta_matrix,
        qval_matrix,
        table,
    })
}

/// Output paths share the original naming scheme:
/// `cwas_{case}_{control}_rsfmri_{feature}_{atlas}`.
#[derive(Debug, Clone)]
pub struct OutputNaming {
    pub case_label: String,
    pub control_label: String,
    pub feature: String,
    pub atlas_name: String,
}

impl OutputNaming {
    fn base(&self) -> String {
        format!(
            "cwas_{}_{}_rsfmri_{}_{}",
            self.case_label, self.control_label, self.feature, self.atlas_name
        )
    }

    pub fn table_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}.tsv", self.base()))
    }

    pub fn stand_beta_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}_standardized_betas.tsv", self.base()))
    }

    pub fn qval_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}_fdr_corrected_pvalues.tsv", self.base()))
    }
}

/// Persists the flat edge table and the two labeled matrices the plotting
/// collaborator consumes.
pub fn save_results(
    results: &AssembledResults,
    out_dir: &Path,
    naming: &OutputNaming,
) -> Result<()> {
    write_dataframe(&results.table, &naming.table_path(out_dir))?;
    write_labeled_matrix(
        &results.stand_beta_matrix,
        &results.roi_labels,
        &naming.stand_beta_path(out_dir),
    )?;
    write_labeled_matrix(
        &results.qval_matrix,
        &results.roi_labels,
        &naming.qval_path(out_dir),
    )?;
    info!(
        "Results saved to {}",
        naming.table_path(out_dir).display()
    );
    Ok(())
}
