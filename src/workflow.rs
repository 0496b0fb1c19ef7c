use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ndarray::Axis;
use serde_json::json;
use tracing::info;

use crate::assemble::{OutputNaming, assemble, save_results};
use crate::atlas::read_atlas;
use crate::cohort::select_cohort;
use crate::connectome::stack_connectomes;
use crate::design::{DesignConfig, build_design};
use crate::df_utils::{ensure_f64, filter_rows};
use crate::error::CwasError;
use crate::fdr::correct;
use crate::glm::{GlmConfig, fit_mass_glm};
use crate::logging::{log_line, open_run_log, warn_line};
use crate::phenotype::{PhenotypeConfig, load_phenotype};
use crate::qc::{filter_by_fd, filter_by_ratings};
use crate::report::{RunReport, summary};
use crate::standardize::standardize;
use crate::types::{AssembledResults, PhenotypeTable};

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root under which per-subject connectome and confounds files live.
    pub bids_dir: PathBuf,
    pub out_dir: PathBuf,
    pub phenotype: PhenotypeConfig,
    pub atlas_file: PathBuf,
    pub atlas_name: String,
    pub feature: String,
    /// Path template for per-subject connectivity files, relative to
    /// `bids_dir`, with `{participant}` insertion points.
    pub connectome_template: String,
    /// Template for per-subject confounds JSON. When absent the phenotype
    /// file must already carry a `mean_fd` column.
    pub confounds_template: Option<String>,
    /// Visual-QC ratings JSON; optional.
    pub ratings_file: Option<PathBuf>,
    pub fd_threshold: f64,
    pub design: DesignConfig,
    pub glm: GlmConfig,
    pub alpha: f64,
}

/// Runs the full CWAS: phenotype -> QC -> connectome stack -> cohort ->
/// design -> standardize -> mass GLM -> FDR -> assembly. Diagnostics
/// accumulate in the run report as stages complete; the statistical result
/// files are only written once every stage has succeeded.
pub fn run_pipeline(config: &RunConfig) -> Result<AssembledResults> {
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("create output directory {}", config.out_dir.display()))?;
    let report = RunReport::new(&config.out_dir);
    let mut log = open_run_log(&config.out_dir)?;
    log_line(
        &mut log,
        &format!(
            "CWAS run: feature {}, atlas {}",
            config.feature, config.atlas_name
        ),
        true,
    )?;

    let (pheno, pheno_summary) = load_phenotype(&config.phenotype)?;
    report.merge(&summary(&[
        ("phenotype_rows_read", json!(pheno_summary.n_read)),
        (
            "dropped_unexpected_diagnosis",
            json!(pheno_summary.dropped_diagnosis),
        ),
        ("dropped_unexpected_sex", json!(pheno_summary.dropped_sex)),
        (
            "subjects_with_invalid_age",
            json!(pheno_summary.invalid_age_subjects),
        ),
    ]))?;

    let pheno = match &config.ratings_file {
        Some(path) => {
            let (pheno, ratings) = filter_by_ratings(&pheno, path)?;
            report.merge(&summary(&[
                ("subjects_with_bad_ratings", json!(ratings.bad_subjects)),
                (
                    "subjects_with_uncertain_ratings",
                    json!(ratings.uncertain_subjects),
                ),
                ("subjects_after_qc_ratings", json!(ratings.n_after)),
            ]))?;
            pheno
        }
        None => pheno,
    };

    let pheno = match &config.confounds_template {
        Some(template) => {
            let (pheno, fd) =
                filter_by_fd(&pheno, &config.bids_dir, template, config.fd_threshold)?;
            report.merge(&summary(&[
                ("subjects_missing_confounds", json!(fd.missing_confounds)),
                (
                    "subjects_rejected_mean_fd",
                    json!({
                        "threshold": config.fd_threshold,
                        "subjects": fd.rejected,
                    }),
                ),
                ("subjects_after_fd_rejection", json!(fd.n_after)),
            ]))?;
            pheno
        }
        None => {
            if pheno.df.column("mean_fd").is_err() {
                return Err(CwasError::MissingColumn(
                    "mean_fd (no confounds template given)".to_string(),
                )
                .into());
            }
            PhenotypeTable {
                df: ensure_f64(pheno.df, &["mean_fd"])?,
            }
        }
    };

    let atlas = read_atlas(&config.atlas_file)?;
    let (stack, stack_summary) = stack_connectomes(
        &pheno,
        &config.bids_dir,
        &config.connectome_template,
        &atlas.mask,
    )?;
    report.merge(&summary(&[
        (
            "subjects_missing_connectome",
            json!(stack_summary.missing_connectome),
        ),
        ("subjects_stacked", json!(stack_summary.n_stacked)),
        ("edges", json!(atlas.mask.n_edges())),
    ]))?;

    let case = config.phenotype.case_label.clone();
    let control = config.phenotype.control_label.clone();
    let cohort = select_cohort(
        &stack.pheno,
        &config.design.group_column,
        &[case.clone(), control.clone()],
    )?;
    let selected: Vec<usize> = cohort
        .selection
        .iter()
        .enumerate()
        .filter(|&(_, &s)| s)
        .map(|(i, _)| i)
        .collect();
    let sub_conn = stack.data.select(Axis(0), &selected);
    let sub_pheno = PhenotypeTable {
        df: filter_rows(&stack.pheno.df, &cohort.selection)?,
    };
    let n_case = count_true(cohort.mask_for(&case));
    let n_control = count_true(cohort.mask_for(&control));
    log_line(
        &mut log,
        &format!(
            "Cohort: {} case(s) ({case}), {} control(s) ({control}), {} edge(s)",
            n_case,
            n_control,
            sub_conn.ncols()
        ),
        true,
    )?;
    report.merge(&summary(&[
        ("group_variable", json!(config.design.group_column)),
        ("cases", json!({ "label": case, "n": n_case })),
        ("controls", json!({ "label": control, "n": n_control })),
        ("analysis_sample", json!(cohort.n_selected())),
        ("standardization_reference", json!(control)),
    ]))?;
    if !cohort.missing_labels.is_empty() {
        warn_line(
            &mut log,
            &format!(
                "Requested group label(s) absent from the data: {:?}",
                cohort.missing_labels
            ),
        )?;
        report.merge(&summary(&[(
            "requested_labels_missing",
            json!(cohort.missing_labels),
        )]))?;
    }

    let control_mask = cohort
        .mask_for(&control)
        .ok_or_else(|| CwasError::InvalidArgument(format!("no membership mask for {control}")))?
        .to_vec();
    let (stand_conn, stand_summary) = standardize(&sub_conn, &control_mask)?;
    if !stand_summary.degenerate_edges.is_empty() {
        warn_line(
            &mut log,
            &format!(
                "{} edge(s) have zero variance among controls; their standardized betas are undefined",
                stand_summary.degenerate_edges.len()
            ),
        )?;
        report.merge(&summary(&[(
            "edges_with_zero_reference_variance",
            json!(stand_summary.degenerate_edges.len()),
        )]))?;
    }

    let design = build_design(&sub_pheno, &config.design)?;
    report.merge(&summary(&[(
        "regressors",
        json!(design.column_names()),
    )]))?;

    let glm = fit_mass_glm(&sub_conn, &stand_conn, &design, &config.glm)?;
    let corrected = correct(&glm, config.alpha);
    let results = assemble(&corrected, &atlas)?;

    let naming = OutputNaming {
        case_label: case,
        control_label: control,
        feature: config.feature.clone(),
        atlas_name: config.atlas_name.clone(),
    };
    save_results(&results, &config.out_dir, &naming)?;
    let n_pass = corrected.fdr_pass.iter().filter(|&&p| p).count();
    report.merge(&summary(&[(
        "edges_passing_fdr",
        json!({ "alpha": config.alpha, "n": n_pass }),
    )]))?;
    info!(
        "CWAS complete: {n_pass} of {} edge(s) pass FDR at alpha {}",
        corrected.n_edges(),
        config.alpha
    );
    Ok(results)
}

fn count_true(mask: Option<&[bool]>) -> usize {
    mask.map(|m| m.iter().filter(|&&b| b).count()).unwrap_or(0)
}
