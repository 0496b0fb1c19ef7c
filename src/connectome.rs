use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array2;
use tracing::{info, warn};

use crate::codec::{EdgeMask, matrix_to_vector};
use crate::df_utils::{filter_rows, str_column};
use crate::error::CwasError;
use crate::io::{frame_to_array2, read_table};
use crate::qc::resolve_template;
use crate::types::PhenotypeTable;

#[derive(Debug, Clone, Default)]
pub struct StackSummary {
    pub n_candidates: usize,
    pub n_stacked: usize,
    pub missing_connectome: Vec<String>,
}

/// The half-vectorized connectivity stack (subjects x edges) together with
/// the phenotype rows that contributed to it, in the same order.
#[derive(Debug, Clone)]
pub struct ConnectomeStack {
    pub data: Array2<f64>,
    pub pheno: PhenotypeTable,
}

/// Reads each subject's connectivity matrix, projects it through the edge
/// mask, and stacks the half-vectors. A missing file skips the subject
/// rather than erroring, but every skip is recorded; a matrix whose shape
/// disagrees with the mask is fatal.
pub fn stack_connectomes(
    pheno: &PhenotypeTable,
    root: &Path,
    connectome_template: &str,
    mask: &EdgeMask,
) -> Result<(ConnectomeStack, StackSummary)> {
    let subjects = str_column(&pheno.df, "participant_id")?;
    let n_rois = mask.n_rois();
    let n_edges = mask.n_edges();

    let mut summary = StackSummary {
        n_candidates: subjects.len(),
        ..Default::default()
    };
    let mut keep = Vec::with_capacity(subjects.len());
    let mut flat: Vec<f64> = Vec::new();

    for subject in &subjects {
        let Some(id) = subject.as_deref() else {
            keep.push(false);
            continue;
        };
        let path = root.join(resolve_template(connectome_template, id));
        if !path.exists() {
            summary.missing_connectome.push(id.to_string());
            keep.push(false);
            continue;
        }
        let df = read_table(&path)?;
        let matrix = frame_to_array2(&df)
            .with_context(|| format!("connectivity matrix {}", path.display()))?;
        if matrix.nrows() != n_rois || matrix.ncols() != n_rois {
            return Err(CwasError::InvalidArgument(format!(
                "connectivity matrix {} is {}x{} but the atlas defines {n_rois} ROIs",
                path.display(),
                matrix.nrows(),
                matrix.ncols()
            ))
            .into());
        }
        let vector = matrix_to_vector(matrix.view(), mask)?;
        flat.extend(vector.iter());
        keep.push(true);
    }

    summary.n_stacked = keep.iter().filter(|&&k| k).count();
    if !summary.missing_connectome.is_empty() {
        warn!(
            "{} subject(s) have no connectivity file and are skipped: {:?}",
            summary.missing_connectome.len(),
            summary.missing_connectome
        );
    }
    if summary.n_stacked == 0 {
        return Err(CwasError::InvalidArgument(
            "no subject has a connectivity file; nothing to analyze".to_string(),
        )
        .into());
    }

    let data = Array2::from_shape_vec((summary.n_stacked, n_edges), flat)
        .context("assemble connectivity stack")?;
    let df = filter_rows(&pheno.df, &keep)?;
    info!(
        "Stacked {} connectome(s) of {} edge(s)",
        summary.n_stacked, n_edges
    );
    Ok((
        ConnectomeStack {
            data,
            pheno: PhenotypeTable { df },
        },
        summary,
    ))
}
