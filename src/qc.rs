use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};

use crate::df_utils::{filter_rows, str_column};
use crate::types::PhenotypeTable;

/// One visual-QC rating. Ratings files key subjects without the BIDS `sub-`
/// prefix; phenotype participant ids carry it.
#[derive(Debug, Clone, Deserialize)]
pub struct RatingEntry {
    pub sub: String,
    pub rating: String,
}

#[derive(Debug, Clone, Default)]
pub struct RatingSummary {
    pub n_before: usize,
    pub n_after: usize,
    pub bad_subjects: Vec<String>,
    pub uncertain_subjects: Vec<String>,
}

/// Drops subjects carrying any "bad" rating. Subjects whose worst rating is
/// "uncertain" are reported but deliberately kept in the cohort; only "bad"
/// excludes.
pub fn filter_by_ratings(
    pheno: &PhenotypeTable,
    ratings_path: &Path,
) -> Result<(PhenotypeTable, RatingSummary)> {
    info!("Reading QC ratings from {}", ratings_path.display());
    let text = fs::read_to_string(ratings_path)
        .with_context(|| format!("read ratings {}", ratings_path.display()))?;
    let entries: Vec<RatingEntry> = serde_json::from_str(&text)
        .with_context(|| format!("parse ratings {}", ratings_path.display()))?;

    let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for entry in &entries {
        let slot = counts.entry(entry.sub.clone()).or_default();
        match entry.rating.to_ascii_lowercase().as_str() {
            "bad" => slot.0 += 1,
            "uncertain" => slot.1 += 1,
            _ => {}
        }
    }

    let mut summary = RatingSummary {
        n_before: pheno.df.height(),
        ..Default::default()
    };
    for (sub, (bad, uncertain)) in &counts {
        if *bad > 0 {
            summary.bad_subjects.push(format!("sub-{sub}"));
        } else if *uncertain > 0 {
            summary.uncertain_subjects.push(format!("sub-{sub}"));
        }
    }

    let subjects = str_column(&pheno.df, "participant_id")?;
    let keep: Vec<bool> = subjects
        .iter()
        .map(|s| match s {
            Some(id) => !summary.bad_subjects.iter().any(|bad| bad == id),
            None => false,
        })
        .collect();
    let df = filter_rows(&pheno.df, &keep)?;
    summary.n_after = df.height();

    if !summary.bad_subjects.is_empty() {
        warn!(
            "Excluding {} subject(s) with bad QC ratings: {:?}",
            summary.bad_subjects.len(),
            summary.bad_subjects
        );
    }
    if !summary.uncertain_subjects.is_empty() {
        info!(
            "{} subject(s) have only uncertain ratings and stay in the cohort",
            summary.uncertain_subjects.len()
        );
    }
    Ok((PhenotypeTable { df }, summary))
}

#[derive(Debug, Clone, Deserialize)]
struct ConfoundsFile {
    #[serde(rename = "MeanFramewiseDisplacement")]
    mean_framewise_displacement: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FdSummary {
    pub n_before: usize,
    pub n_after: usize,
    pub missing_confounds: Vec<String>,
    pub rejected: Vec<String>,
}

/// Substitutes the participant id into a path template. The template marks
/// the insertion points with `{participant}`.
pub fn resolve_template(template: &str, participant: &str) -> String {
    template.replace("{participant}", participant)
}

/// Reads each subject's mean framewise displacement from its confounds JSON,
/// stores it as the `mean_fd` covariate, and drops subjects at or above the
/// threshold. Subjects without a confounds file do not participate and are
/// reported as such.
pub fn filter_by_fd(
    pheno: &PhenotypeTable,
    root: &Path,
    confounds_template: &str,
    threshold: f64,
) -> Result<(PhenotypeTable, FdSummary)> {
    let subjects = str_column(&pheno.df, "participant_id")?;
    let mut summary = FdSummary {
        n_before: pheno.df.height(),
        ..Default::default()
    };

    let mut mean_fd: Vec<Option<f64>> = Vec::with_capacity(subjects.len());
    let mut keep: Vec<bool> = Vec::with_capacity(subjects.len());
    for subject in &subjects {
        let Some(id) = subject.as_deref() else {
            mean_fd.push(None);
            keep.push(false);
            continue;
        };
        let path = root.join(resolve_template(confounds_template, id));
        if !path.exists() {
            summary.missing_confounds.push(id.to_string());
            mean_fd.push(None);
            keep.push(false);
            continue;
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("read confounds {}", path.display()))?;
        let confounds: ConfoundsFile = serde_json::from_str(&text)
            .with_context(|| format!("parse confounds {}", path.display()))?;
        let fd = confounds.mean_framewise_displacement;
        mean_fd.push(Some(fd));
        if fd < threshold {
            keep.push(true);
        } else {
            summary.rejected.push(id.to_string());
            keep.push(false);
        }
    }

    let mut df = pheno.df.clone();
    df.with_column(Series::new("mean_fd".into(), mean_fd))?;
    let df = filter_rows(&df, &keep)?;
    summary.n_after = df.height();

    if !summary.missing_confounds.is_empty() {
        warn!(
            "{} subject(s) have no confounds file and are skipped: {:?}",
            summary.missing_confounds.len(),
            summary.missing_confounds
        );
    }
    if !summary.rejected.is_empty() {
        info!(
            "Rejected {} subject(s) with mean FD >= {threshold}: {:?}",
            summary.rejected.len(),
            summary.rejected
        );
    }
    Ok((PhenotypeTable { df }, summary))
}
