use ndarray::Array1;

use crate::types::{CorrectedResult, GlmResult};

pub const DEFAULT_ALPHA: f64 = 0.05;

/// Benjamini-Hochberg step-up correction.
///
/// Sorts p-values ascending with a stable sort (ties keep their relative
/// edge order), computes q_i = min over j >= i of p_j * m / (j + 1) clamped
/// to 1, and scatters the q-values back into input order. Non-finite
/// p-values are left out of m and receive a NaN q-value.
pub fn fdr_bh(pvals: &[f64], alpha: f64) -> (Vec<f64>, Vec<bool>) {
    let mut order: Vec<usize> = (0..pvals.len()).filter(|&i| pvals[i].is_finite()).collect();
    order.sort_by(|&a, &b| pvals[a].total_cmp(&pvals[b]));
    let m = order.len();

    let mut qvals = vec![f64::NAN; pvals.len()];
    let mut running_min = f64::INFINITY;
    for (rank, &idx) in order.iter().enumerate().rev() {
        let q = (pvals[idx] * m as f64 / (rank + 1) as f64).min(1.0);
        running_min = running_min.min(q);
        qvals[idx] = running_min;
    }

    let fdr_pass = qvals
        .iter()
        .map(|&q| q.is_finite() && q <= alpha)
        .collect();
    (qvals, fdr_pass)
}

/// Extends a GLM result with q-values over its raw p-values, preserving edge
/// order end to end.
pub fn correct(glm: &GlmResult, alpha: f64) -> CorrectedResult {
    let (qvals, fdr_pass) = fdr_bh(&glm.pvals.to_vec(), alpha);
    CorrectedResult {
        betas: glm.betas.clone(),
        stand_betas: glm.stand_betas.clone(),
        pvals: glm.pvals.clone(),
        qvals: Array1::from_vec(qvals),
        fdr_pass,
    }
}
