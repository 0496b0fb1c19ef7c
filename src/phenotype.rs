use std::path::PathBuf;

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{info, warn};

use crate::df_utils::{ensure_f64, ensure_utf8, f64_column, filter_missing, filter_rows, str_column};
use crate::error::CwasError;
use crate::io::read_table;
use crate::types::PhenotypeTable;

/// Caller-supplied mapping of the two accepted sex labels onto {0, 1}.
/// Encoding is fixed by this enumeration, never by the order labels happen to
/// appear in the data.
#[derive(Debug, Clone)]
pub struct SexEncoding {
    pub zero: String,
    pub one: String,
}

#[derive(Debug, Clone)]
pub struct PhenotypeConfig {
    pub path: PathBuf,
    pub subject_col: String,
    pub diagnosis_col: String,
    pub age_col: String,
    pub sex_col: String,
    pub scanner_col: Option<String>,
    pub sequence_col: Option<String>,
    pub medication_col: Option<String>,
    pub case_label: String,
    pub control_label: String,
    pub sex_encoding: SexEncoding,
}

/// Data-quality findings surfaced to the run report. None of these abort the
/// run; rows with unusable diagnosis or sex values are dropped, odd ages are
/// only flagged.
#[derive(Debug, Clone, Default)]
pub struct PhenotypeSummary {
    pub n_read: usize,
    pub dropped_diagnosis: Vec<String>,
    pub dropped_sex: Vec<String>,
    pub invalid_age_subjects: Vec<String>,
}

/// Loads the phenotype file, renames caller-named columns to the canonical
/// schema (`participant_id`, `diagnosis`, `age`, `sex`, optional `scanner`,
/// `sequence`, `medication`) and applies the deterministic sex encoding.
pub fn load_phenotype(config: &PhenotypeConfig) -> Result<(PhenotypeTable, PhenotypeSummary)> {
    info!("Reading phenotype file {}", config.path.display());
    let mut df = read_table(&config.path)?;
    let n_read = df.height();

    let mut renames: Vec<(&str, &str)> = vec![
        (config.subject_col.as_str(), "participant_id"),
        (config.diagnosis_col.as_str(), "diagnosis"),
        (config.age_col.as_str(), "age"),
        (config.sex_col.as_str(), "sex"),
    ];
    if let Some(col) = &config.scanner_col {
        renames.push((col.as_str(), "scanner"));
    }
    if let Some(col) = &config.sequence_col {
        renames.push((col.as_str(), "sequence"));
    }
    if let Some(col) = &config.medication_col {
        renames.push((col.as_str(), "medication"));
    }
    for (from, to) in renames {
        if df.column(from).is_err() {
            return Err(CwasError::MissingColumn(from.to_string()).into());
        }
        if from != to {
            df.rename(from, to.into())
                .with_context(|| format!("rename {from} -> {to}"))?;
        }
    }

    let mut string_cols = vec!["participant_id", "diagnosis", "sex"];
    for col in ["scanner", "sequence", "medication"] {
        if df.column(col).is_ok() {
            string_cols.push(col);
        }
    }
    df = ensure_utf8(df, &string_cols)?;
    df = ensure_f64(df, &["age"])?;

    // A row without a participant id can never be matched to a connectome.
    let (filtered, n_no_id) = filter_missing(df, "participant_id")?;
    df = filtered;
    if n_no_id > 0 {
        warn!("Dropped {n_no_id} row(s) with a missing participant id");
    }

    let subjects = str_column(&df, "participant_id")?;
    let mut summary = PhenotypeSummary {
        n_read,
        ..Default::default()
    };

    // Diagnosis vocabulary check: values outside {case, control} are dropped
    // with a warning, not an error.
    let diagnosis = str_column(&df, "diagnosis")?;
    let allowed = [config.case_label.as_str(), config.control_label.as_str()];
    let diagnosis_ok: Vec<bool> = diagnosis
        .iter()
        .map(|v| matches!(v.as_deref(), Some(d) if allowed.contains(&d)))
        .collect();

    let (sex_values, sex_ok) = encode_sex(&str_column(&df, "sex")?, &config.sex_encoding);

    let keep: Vec<bool> = diagnosis_ok
        .iter()
        .zip(&sex_ok)
        .map(|(&d, &s)| d && s)
        .collect();
    for (i, subject) in subjects.iter().enumerate() {
        let id = subject.clone().unwrap_or_else(|| format!("row {i}"));
        if !diagnosis_ok[i] {
            summary.dropped_diagnosis.push(id);
        } else if !sex_ok[i] {
            summary.dropped_sex.push(id);
        }
    }
    if !summary.dropped_diagnosis.is_empty() {
        warn!(
            "Unexpected diagnosis values outside {allowed:?}; dropping {} subject(s): {:?}",
            summary.dropped_diagnosis.len(),
            summary.dropped_diagnosis
        );
    }
    if !summary.dropped_sex.is_empty() {
        warn!(
            "Sex values outside {{{}, {}}}; dropping {} subject(s): {:?}",
            config.sex_encoding.zero,
            config.sex_encoding.one,
            summary.dropped_sex.len(),
            summary.dropped_sex
        );
    }

    let sex_series = Series::new("sex".into(), sex_values);
    df.with_column(sex_series)?;
    df = filter_rows(&df, &keep)?;

    // Out-of-range ages are flagged but kept.
    let ages = f64_column(&df, "age")?;
    let kept_subjects = str_column(&df, "participant_id")?;
    for (subject, age) in kept_subjects.iter().zip(&ages) {
        if !age.is_finite() || *age <= 0.0 {
            let id = subject.clone().unwrap_or_default();
            warn!("Possible invalid age {age} for subject {id}");
            summary.invalid_age_subjects.push(id);
        }
    }

    info!(
        "Phenotype table: {} of {} subject(s) retained",
        df.height(),
        n_read
    );
    Ok((PhenotypeTable { df }, summary))
}

fn encode_sex(values: &[Option<String>], encoding: &SexEncoding) -> (Vec<Option<f64>>, Vec<bool>) {
    let mut encoded = Vec::with_capacity(values.len());
    let mut ok = Vec::with_capacity(values.len());
    for value in values {
        match value.as_deref() {
            Some(v) if v == encoding.zero => {
                encoded.push(Some(0.0));
                ok.push(true);
            }
            Some(v) if v == encoding.one => {
                encoded.push(Some(1.0));
                ok.push(true);
            }
            _ => {
                encoded.push(None);
                ok.push(false);
            }
        }
    }
    (encoded, ok)
}
