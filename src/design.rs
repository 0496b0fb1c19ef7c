use anyhow::Result;
use ndarray::Array2;
use tracing::info;

use crate::df_utils::{f64_column, str_column};
use crate::error::CwasError;
use crate::types::PhenotypeTable;

/// Provenance of one design-matrix column.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Intercept,
    Continuous(String),
    /// Treatment-coded covariate level (indicator vs. the reference level).
    Categorical { column: String, level: String },
    /// Treatment-coded contrast level (indicator vs. the control label).
    Contrast { column: String, level: String },
}

impl Term {
    pub fn name(&self) -> String {
        match self {
            Term::Intercept => "intercept".to_string(),
            Term::Continuous(column) => column.clone(),
            Term::Categorical { column, level } | Term::Contrast { column, level } => {
                format!("{column}[{level}]")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DesignConfig {
    /// Phenotype column holding the group contrast (e.g. "diagnosis").
    pub group_column: String,
    /// Reference level of the contrast; the contrast coefficient is then
    /// case-minus-control by construction.
    pub control_label: String,
    pub scanner: bool,
    pub sequence: bool,
    pub medication: bool,
}

/// Numeric design matrix with per-column term provenance and the index of
/// the single contrast-of-interest column.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub matrix: Array2<f64>,
    pub terms: Vec<Term>,
    pub contrast_index: usize,
}

impl DesignMatrix {
    pub fn n_rows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.terms.iter().map(Term::name).collect()
    }
}

/// Builds the design matrix for the selected cohort: intercept, `age`, the
/// dummy-coded `sex` (which must arrive 0/1-encoded), `mean_fd`, any
/// requested categorical covariates, and the treatment-coded contrast. No formula strings; every column's term is
/// enumerated explicitly.
pub fn build_design(pheno: &PhenotypeTable, config: &DesignConfig) -> Result<DesignMatrix> {
    let n = pheno.df.height();
    if n == 0 {
        return Err(CwasError::InvalidArgument("design matrix has no rows".to_string()).into());
    }

    let mut terms: Vec<Term> = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    terms.push(Term::Intercept);
    columns.push(vec![1.0; n]);

    for name in ["age", "sex", "mean_fd"] {
        let values = f64_column(&pheno.df, name)?;
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(CwasError::InvalidArgument(format!(
                "covariate \"{name}\" has a missing or non-finite value at cohort row {pos}"
            ))
            .into());
        }
        // Phenotype loading maps sex labels to 0/1, so the column is already
        // its own treatment-coded dummy with the 0-mapped label as reference.
        if name == "sex" {
            if let Some(pos) = values.iter().position(|&v| v != 0.0 && v != 1.0) {
                return Err(CwasError::InvalidArgument(format!(
                    "covariate \"sex\" must be 0/1-encoded; found {} at cohort row {pos}",
                    values[pos]
                ))
                .into());
            }
            terms.push(Term::Categorical {
                column: "sex".to_string(),
                level: "1".to_string(),
            });
        } else {
            terms.push(Term::Continuous(name.to_string()));
        }
        columns.push(values);
    }

    for (name, requested) in [
        ("scanner", config.scanner),
        ("sequence", config.sequence),
        ("medication", config.medication),
    ] {
        if !requested {
            continue;
        }
        let values = complete_str_column(pheno, name)?;
        let levels = observed_levels(&values);
        // First observed level is the reference; remaining levels get
        // indicator columns.
        for level in levels.iter().skip(1) {
            terms.push(Term::Categorical {
                column: name.to_string(),
                level: level.clone(),
            });
            columns.push(indicator(&values, level));
        }
    }

    let group = complete_str_column(pheno, &config.group_column)?;
    let group_levels = observed_levels(&group);
    if group_levels.len() < 2 {
        return Err(CwasError::TooFewContrastLevels {
            column: config.group_column.clone(),
            found: group_levels.len(),
        }
        .into());
    }
    if !group_levels.iter().any(|l| l == &config.control_label) {
        return Err(CwasError::InvalidArgument(format!(
            "control label \"{}\" is not present in column \"{}\" (levels: {group_levels:?})",
            config.control_label, config.group_column
        ))
        .into());
    }
    for level in &group_levels {
        if level == &config.control_label {
            continue;
        }
        terms.push(Term::Contrast {
            column: config.group_column.clone(),
            level: level.clone(),
        });
        columns.push(indicator(&group, level));
    }

    let contrast_index = find_contrast(&terms, &config.group_column)?;

    let p = columns.len();
    let mut matrix = Array2::<f64>::zeros((n, p));
    for (j, column) in columns.iter().enumerate() {
        for (i, &value) in column.iter().enumerate() {
            matrix[[i, j]] = value;
        }
    }

    let design = DesignMatrix {
        matrix,
        terms,
        contrast_index,
    };
    info!(
        "Design matrix: {} row(s), columns {:?}, contrast column \"{}\"",
        n,
        design.column_names(),
        design.terms[contrast_index].name()
    );
    Ok(design)
}

/// Exactly one column may carry the contrast term; zero or several is a
/// fatal configuration error.
fn find_contrast(terms: &[Term], group_column: &str) -> Result<usize> {
    let matches: Vec<usize> = terms
        .iter()
        .enumerate()
        .filter(|(_, term)| matches!(term, Term::Contrast { column, .. } if column == group_column))
        .map(|(idx, _)| idx)
        .collect();
    if matches.len() != 1 {
        return Err(CwasError::AmbiguousContrast {
            contrast: group_column.to_string(),
            candidates: matches.iter().map(|&i| terms[i].name()).collect(),
        }
        .into());
    }
    Ok(matches[0])
}

fn complete_str_column(pheno: &PhenotypeTable, name: &str) -> Result<Vec<String>> {
    let values = str_column(&pheno.df, name)?;
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.ok_or_else(|| {
                CwasError::InvalidArgument(format!(
                    "covariate \"{name}\" has a missing value at cohort row {i}"
                ))
                .into()
            })
        })
        .collect()
}

fn observed_levels(values: &[String]) -> Vec<String> {
    let mut levels: Vec<String> = Vec::new();
    for value in values {
        if !levels.contains(value) {
            levels.push(value.clone());
        }
    }
    levels
}

fn indicator(values: &[String], level: &str) -> Vec<f64> {
    values
        .iter()
        .map(|v| if v == level { 1.0 } else { 0.0 })
        .collect()
}
