use anyhow::Result;
use ndarray::Array2;
use tracing::warn;

use crate::error::CwasError;

#[derive(Debug, Clone, Default)]
pub struct StandardizeSummary {
    /// Edge columns whose reference subgroup had zero variance; their
    /// standardized values are non-finite.
    pub degenerate_edges: Vec<usize>,
}

/// Scales every edge column by the standard deviation computed over the
/// reference-subgroup rows only (population SD). The transform divides; it
/// never subtracts the mean, so only the scale is corrected.
///
/// A reference subgroup with zero variance in a column makes that column's
/// scale zero and the standardized values non-finite. Those columns are
/// counted and surfaced, never silently propagated.
pub fn standardize(
    data: &Array2<f64>,
    reference: &[bool],
) -> Result<(Array2<f64>, StandardizeSummary)> {
    if reference.len() != data.nrows() {
        return Err(CwasError::InvalidArgument(format!(
            "reference mask has {} entries but data has {} rows",
            reference.len(),
            data.nrows()
        ))
        .into());
    }
    let n_ref = reference.iter().filter(|&&r| r).count();
    if n_ref == 0 {
        return Err(
            CwasError::InvalidArgument("reference subgroup is empty".to_string()).into(),
        );
    }

    let mut out = data.clone();
    let mut summary = StandardizeSummary::default();
    for (j, mut column) in out.columns_mut().into_iter().enumerate() {
        let mut mean = 0.0;
        for (i, &keep) in reference.iter().enumerate() {
            if keep {
                mean += column[i];
            }
        }
        mean /= n_ref as f64;
        let mut var = 0.0;
        for (i, &keep) in reference.iter().enumerate() {
            if keep {
                let d = column[i] - mean;
                var += d * d;
            }
        }
        var /= n_ref as f64;
        let scale = var.sqrt();
        if scale == 0.0 {
            summary.degenerate_edges.push(j);
        }
        column.mapv_inplace(|v| v / scale);
    }

    if !summary.degenerate_edges.is_empty() {
        warn!(
            "{} edge column(s) have zero variance in the reference subgroup; \
             their standardized values are undefined",
            summary.degenerate_edges.len()
        );
    }
    Ok((out, summary))
}
