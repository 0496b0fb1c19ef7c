use anyhow::{Context, Result};
use ndarray::{Array1, Array2, ArrayView1};
use ndarray_linalg::{Eigh, UPLO};
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::info;

use crate::design::DesignMatrix;
use crate::error::CwasError;
use crate::parallel::{resolve_threads, run_in_pool};
use crate::types::GlmResult;

#[derive(Debug, Clone, Default)]
pub struct GlmConfig {
    pub parallel: bool,
    pub cores: Option<usize>,
}

/// Shared OLS factorization of the design matrix. Computed once and reused
/// for every edge; the per-edge work is two matrix-vector products.
struct DesignFactor {
    x: Array2<f64>,
    /// (X'X)^+ X', p x n.
    pinv: Array2<f64>,
    /// [(X'X)^+]_cc for the contrast column.
    contrast_var: f64,
    contrast_index: usize,
    df_resid: f64,
}

fn factor_design(design: &DesignMatrix) -> Result<DesignFactor> {
    let x = design.matrix.clone();
    let n = x.nrows();
    let p = x.ncols();
    if n <= p {
        return Err(CwasError::InvalidArgument(format!(
            "design matrix has {n} row(s) for {p} column(s); no residual degrees of freedom"
        ))
        .into());
    }

    let xtx = x.t().dot(&x);
    let (eigvals, eigvecs) = xtx.eigh(UPLO::Lower).context("eigendecompose X'X")?;
    let max_eig = eigvals.iter().cloned().fold(0.0_f64, f64::max);
    let threshold = max_eig * 1e-12;
    let rank = eigvals.iter().filter(|&&v| v > threshold).count();
    let inv_vals: Vec<f64> = eigvals
        .iter()
        .map(|&v| if v > threshold { 1.0 / v } else { 0.0 })
        .collect();
    let inv_diag = Array2::from_diag(&Array1::from_vec(inv_vals));
    let xtx_inv = eigvecs.dot(&inv_diag).dot(&eigvecs.t());

    let df_resid = (n - rank) as f64;
    if df_resid <= 0.0 {
        return Err(CwasError::InvalidArgument(
            "design matrix leaves no residual degrees of freedom".to_string(),
        )
        .into());
    }

    let pinv = xtx_inv.dot(&x.t());
    let contrast_index = design.contrast_index;
    Ok(DesignFactor {
        x,
        pinv,
        contrast_var: xtx_inv[[contrast_index, contrast_index]],
        contrast_index,
        df_resid,
    })
}

/// Closed-form OLS for one edge: contrast coefficient and its two-sided
/// p-value under Student's t with the shared residual degrees of freedom.
fn fit_edge(factor: &DesignFactor, t_dist: &StudentsT, y: ArrayView1<'_, f64>) -> (f64, f64) {
    let beta = factor.pinv.dot(&y);
    let fitted = factor.x.dot(&beta);
    let mut rss = 0.0;
    for (obs, fit) in y.iter().zip(fitted.iter()) {
        let r = obs - fit;
        rss += r * r;
    }
    let sigma2 = rss / factor.df_resid;
    let se = (sigma2 * factor.contrast_var).sqrt();
    let b = beta[factor.contrast_index];

    let pval = if se > 0.0 && se.is_finite() {
        let t = b / se;
        if t.is_finite() {
            2.0 * (1.0 - t_dist.cdf(t.abs()))
        } else {
            f64::NAN
        }
    } else if b == 0.0 {
        // Perfect fit with a null contrast effect.
        1.0
    } else {
        f64::NAN
    };
    (b, pval)
}

fn fit_all_edges(
    factor: &DesignFactor,
    data: &Array2<f64>,
    config: &GlmConfig,
) -> Result<(Array1<f64>, Array1<f64>)> {
    let n_edges = data.ncols();
    let t_dist = StudentsT::new(0.0, 1.0, factor.df_resid).context("Student's t distribution")?;

    let results: Vec<(f64, f64)> = if config.parallel {
        let run = || {
            (0..n_edges)
                .into_par_iter()
                .map(|j| fit_edge(factor, &t_dist, data.column(j)))
                .collect::<Vec<(f64, f64)>>()
        };
        let threads = resolve_threads(config.cores, n_edges);
        run_in_pool(threads, "build glm thread pool", run)?
    } else {
        (0..n_edges)
            .map(|j| fit_edge(factor, &t_dist, data.column(j)))
            .collect()
    };

    let betas = Array1::from_iter(results.iter().map(|&(b, _)| b));
    let pvals = Array1::from_iter(results.iter().map(|&(_, p)| p));
    Ok((betas, pvals))
}

/// Fits one OLS model per edge for both the raw and the standardized stacks,
/// sharing a single design factorization. The raw run supplies betas and the
/// authoritative p-values; the standardized run supplies only the
/// standardized betas.
pub fn fit_mass_glm(
    raw: &Array2<f64>,
    standardized: &Array2<f64>,
    design: &DesignMatrix,
    config: &GlmConfig,
) -> Result<GlmResult> {
    if raw.nrows() != design.n_rows() {
        return Err(CwasError::InvalidArgument(format!(
            "connectivity stack has {} row(s) but design matrix has {}",
            raw.nrows(),
            design.n_rows()
        ))
        .into());
    }
    if standardized.dim() != raw.dim() {
        return Err(CwasError::InvalidArgument(format!(
            "standardized stack shape {:?} does not match raw stack shape {:?}",
            standardized.dim(),
            raw.dim()
        ))
        .into());
    }

    let factor = factor_design(design)?;
    info!(
        "Mass-univariate GLM over {} edge(s), {} residual df",
        raw.ncols(),
        factor.df_resid
    );
    let (betas, pvals) = fit_all_edges(&factor, raw, config)?;
    let (stand_betas, _) = fit_all_edges(&factor, standardized, config)?;

    Ok(GlmResult {
        betas,
        stand_betas,
        pvals,
    })
}
