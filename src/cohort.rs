use anyhow::Result;
use tracing::warn;

use crate::df_utils::str_column;
use crate::error::CwasError;
use crate::types::{Cohort, PhenotypeTable};

/// Selects the analysis cohort from a categorical phenotype column.
///
/// With requested labels, the selection is the union of the per-label
/// equality masks (rows with a missing value never match). Requesting labels
/// of which none are present is fatal; a partial match warns and proceeds
/// with the labels that exist. With no labels, the selection is simply the
/// non-null mask.
pub fn select_cohort(pheno: &PhenotypeTable, column: &str, labels: &[String]) -> Result<Cohort> {
    let values = str_column(&pheno.df, column)?;
    let non_null: Vec<bool> = values.iter().map(|v| v.is_some()).collect();

    if labels.is_empty() {
        return Ok(Cohort {
            selection: non_null,
            label_masks: Vec::new(),
            missing_labels: Vec::new(),
        });
    }

    let available: Vec<&str> = values.iter().flatten().map(String::as_str).collect();
    let present: Vec<bool> = labels
        .iter()
        .map(|label| available.iter().any(|v| v == label))
        .collect();
    if !present.iter().any(|&p| p) {
        return Err(CwasError::CohortUnavailable {
            column: column.to_string(),
            labels: labels.to_vec(),
        }
        .into());
    }
    let missing_labels: Vec<String> = labels
        .iter()
        .zip(&present)
        .filter(|&(_, &p)| !p)
        .map(|(label, _)| label.clone())
        .collect();
    if !missing_labels.is_empty() {
        let availability: Vec<(&str, bool)> = labels
            .iter()
            .map(String::as_str)
            .zip(present.iter().copied())
            .collect();
        warn!("Not all requested labels of \"{column}\" are available: {availability:?}");
    }

    let full_masks: Vec<Vec<bool>> = labels
        .iter()
        .map(|label| {
            values
                .iter()
                .map(|v| v.as_deref() == Some(label.as_str()))
                .collect()
        })
        .collect();
    let selection: Vec<bool> = (0..values.len())
        .map(|i| full_masks.iter().any(|mask| mask[i]))
        .collect();

    // Membership masks restricted to the selected rows, in table order.
    let label_masks = labels
        .iter()
        .zip(&full_masks)
        .map(|(label, mask)| {
            let restricted: Vec<bool> = mask
                .iter()
                .zip(&selection)
                .filter(|&(_, &selected)| selected)
                .map(|(&m, _)| m)
                .collect();
            (label.clone(), restricted)
        })
        .collect();

    Ok(Cohort {
        selection,
        label_masks,
        missing_labels,
    })
}
