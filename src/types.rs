use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;

/// Phenotype table with canonical column names, one row per subject, row
/// order matching the subject axis of the connectivity stack.
#[derive(Debug, Clone)]
pub struct PhenotypeTable {
    pub df: DataFrame,
}

/// Result of cohort selection over a phenotype column.
///
/// `selection` is indexed over the full table; each entry of `label_masks`
/// is indexed over the selected rows only, in table order. Requested labels
/// absent from the data keep an all-false mask and are listed in
/// `missing_labels` so the run report can surface the partial availability.
#[derive(Debug, Clone)]
pub struct Cohort {
    pub selection: Vec<bool>,
    pub label_masks: Vec<(String, Vec<bool>)>,
    pub missing_labels: Vec<String>,
}

impl Cohort {
    pub fn n_selected(&self) -> usize {
        self.selection.iter().filter(|&&b| b).count()
    }

    pub fn mask_for(&self, label: &str) -> Option<&[bool]> {
        self.label_masks
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, mask)| mask.as_slice())
    }
}

/// Per-edge GLM output, aligned positionally with edge-mask order.
#[derive(Debug, Clone)]
pub struct GlmResult {
    pub betas: Array1<f64>,
    pub stand_betas: Array1<f64>,
    pub pvals: Array1<f64>,
}

/// `GlmResult` extended with Benjamini-Hochberg q-values, same order.
#[derive(Debug, Clone)]
pub struct CorrectedResult {
    pub betas: Array1<f64>,
    pub stand_betas: Array1<f64>,
    pub pvals: Array1<f64>,
    pub qvals: Array1<f64>,
    pub fdr_pass: Vec<bool>,
}

impl CorrectedResult {
    pub fn n_edges(&self) -> usize {
        self.pvals.len()
    }
}

/// Corrected results mapped back to labeled ROI x ROI matrices, plus the flat
/// per-edge table handed to tabular persistence.
#[derive(Debug, Clone)]
pub struct AssembledResults {
    pub roi_labels: Vec<String>,
    pub stand_beta_matrix: Array2<f64>,
    pub qval_matrix: Array2<f64>,
    pub table: DataFrame,
}
