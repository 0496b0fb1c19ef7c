use cwas_rsfmri::cohort::select_cohort;
use cwas_rsfmri::design::{DesignConfig, Term, build_design};
use cwas_rsfmri::error::CwasError;
use cwas_rsfmri::fdr::fdr_bh;
use cwas_rsfmri::standardize::standardize;
use cwas_rsfmri::types::PhenotypeTable;
use ndarray::Array2;
use polars::prelude::*;

fn pheno_with_diagnosis(values: &[&str]) -> PhenotypeTable {
    let df = df!("diagnosis" => values).expect("frame");
    PhenotypeTable { df }
}

#[test]
fn cohort_partial_availability_warns_and_proceeds() {
    let pheno = pheno_with_diagnosis(&["NDD", "NDD", "NDD", "NDD", "NDD"]);
    let cohort = select_cohort(&pheno, "diagnosis", &["NDD".into(), "HC".into()])
        .expect("partial availability is not fatal");

    assert_eq!(cohort.n_selected(), 5);
    assert!(cohort.selection.iter().all(|&s| s));
    let ndd = cohort.mask_for("NDD").expect("NDD mask");
    assert!(ndd.iter().all(|&m| m));
    let hc = cohort.mask_for("HC").expect("HC mask");
    assert_eq!(hc.len(), 5);
    assert!(hc.iter().all(|&m| !m), "absent label mask must be all-false");
    assert_eq!(cohort.missing_labels, vec!["HC".to_string()]);
}

#[test]
fn cohort_with_all_labels_present_reports_none_missing() {
    let pheno = pheno_with_diagnosis(&["NDD", "HC", "NDD"]);
    let cohort = select_cohort(&pheno, "diagnosis", &["NDD".into(), "HC".into()]).expect("select");
    assert!(cohort.missing_labels.is_empty());
}

#[test]
fn cohort_unavailable_labels_fail() {
    let pheno = pheno_with_diagnosis(&["NDD", "HC"]);
    let err = select_cohort(&pheno, "diagnosis", &["X".into(), "Y".into()]).unwrap_err();
    let err = err.downcast_ref::<CwasError>().expect("typed error");
    assert!(matches!(err, CwasError::CohortUnavailable { .. }));
}

#[test]
fn cohort_excludes_missing_values() {
    let df = df!("diagnosis" => [Some("NDD"), None, Some("HC"), Some("NDD")]).expect("frame");
    let cohort = select_cohort(
        &PhenotypeTable { df },
        "diagnosis",
        &["NDD".into(), "HC".into()],
    )
    .expect("select");
    assert_eq!(cohort.selection, vec![true, false, true, true]);
    assert_eq!(cohort.mask_for("NDD").unwrap(), &[true, false, true]);
    assert_eq!(cohort.mask_for("HC").unwrap(), &[false, true, false]);
}

#[test]
fn bh_correction_is_deterministic() {
    let pvals = [0.001, 0.2, 0.5, 0.03, 0.04];
    let (qvals, pass) = fdr_bh(&pvals, 0.05);

    // Step-up by hand: sorted [.001, .03, .04, .2, .5] with m = 5 gives raw
    // criticals [.005, .075, .0667, .25, .5]; the monotone pass pulls the
    // .03 entry down to .04 * 5/3.
    let expected = [0.005, 0.25, 0.5, 0.2 / 3.0, 0.2 / 3.0];
    for (q, e) in qvals.iter().zip(expected) {
        assert!((q - e).abs() < 1e-12, "q {q} vs expected {e}");
    }
    assert_eq!(pass, vec![true, false, false, false, false]);
    for (q, p) in qvals.iter().zip(pvals) {
        assert!(q >= &p, "q-values dominate their p-values");
    }
}

#[test]
fn bh_ties_keep_relative_order() {
    let pvals = [0.02, 0.02, 0.02, 0.9];
    let (qvals, _) = fdr_bh(&pvals, 0.05);
    assert!((qvals[0] - qvals[1]).abs() < 1e-15);
    assert!((qvals[1] - qvals[2]).abs() < 1e-15);
}

fn design_pheno() -> PhenotypeTable {
    let df = df!(
        "diagnosis" => ["ASD", "HC", "ASD", "HC", "ASD", "HC"],
        "age" => [10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
        "sex" => [0.0, 1.0, 0.0, 1.0, 1.0, 0.0],
        "mean_fd" => [0.1, 0.2, 0.15, 0.12, 0.3, 0.22],
    )
    .expect("frame");
    PhenotypeTable { df }
}

#[test]
fn design_contrast_is_case_vs_control() {
    let config = DesignConfig {
        group_column: "diagnosis".into(),
        control_label: "HC".into(),
        scanner: false,
        sequence: false,
        medication: false,
    };
    let design = build_design(&design_pheno(), &config).expect("design");

    assert_eq!(design.matrix.nrows(), 6);
    // intercept, age, sex[1], mean_fd, diagnosis[ASD]
    assert_eq!(design.matrix.ncols(), 5);
    // The 0/1-encoded sex column enters the ledger as a dummy, not as a
    // continuous covariate.
    assert_eq!(
        design.terms[2],
        Term::Categorical {
            column: "sex".into(),
            level: "1".into()
        }
    );
    assert_eq!(design.column_names()[2], "sex[1]");
    assert_eq!(
        design.terms[design.contrast_index],
        Term::Contrast {
            column: "diagnosis".into(),
            level: "ASD".into()
        }
    );
    for (i, expected) in [1.0, 0.0, 1.0, 0.0, 1.0, 0.0].into_iter().enumerate() {
        assert_eq!(design.matrix[[i, design.contrast_index]], expected);
    }
    // Intercept column is all ones.
    for i in 0..6 {
        assert_eq!(design.matrix[[i, 0]], 1.0);
    }
}

#[test]
fn design_rejects_single_contrast_level() {
    let df = df!(
        "diagnosis" => ["HC", "HC", "HC"],
        "age" => [10.0, 11.0, 12.0],
        "sex" => [0.0, 1.0, 0.0],
        "mean_fd" => [0.1, 0.2, 0.15],
    )
    .expect("frame");
    let config = DesignConfig {
        group_column: "diagnosis".into(),
        control_label: "HC".into(),
        scanner: false,
        sequence: false,
        medication: false,
    };
    let err = build_design(&PhenotypeTable { df }, &config).unwrap_err();
    let err = err.downcast_ref::<CwasError>().expect("typed error");
    assert!(matches!(
        err,
        CwasError::TooFewContrastLevels { found: 1, .. }
    ));
}

#[test]
fn design_rejects_multiple_contrast_levels() {
    // Three group levels against control "HC" produce two treatment-coded
    // contrast columns; no single column carries the contrast of interest.
    let df = df!(
        "diagnosis" => ["ASD", "ADHD", "HC", "ASD", "ADHD", "HC"],
        "age" => [10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
        "sex" => [0.0, 1.0, 0.0, 1.0, 1.0, 0.0],
        "mean_fd" => [0.1, 0.2, 0.15, 0.12, 0.3, 0.22],
    )
    .expect("frame");
    let config = DesignConfig {
        group_column: "diagnosis".into(),
        control_label: "HC".into(),
        scanner: false,
        sequence: false,
        medication: false,
    };
    let err = build_design(&PhenotypeTable { df }, &config).unwrap_err();
    let err = err.downcast_ref::<CwasError>().expect("typed error");
    match err {
        CwasError::AmbiguousContrast {
            contrast,
            candidates,
        } => {
            assert_eq!(contrast, "diagnosis");
            assert_eq!(candidates.len(), 2);
            assert!(candidates.contains(&"diagnosis[ASD]".to_string()));
            assert!(candidates.contains(&"diagnosis[ADHD]".to_string()));
        }
        other => panic!("expected AmbiguousContrast, got {other:?}"),
    }
}

#[test]
fn design_with_categorical_covariate() {
    let df = df!(
        "diagnosis" => ["ASD", "HC", "ASD", "HC", "ASD", "HC"],
        "age" => [10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
        "sex" => [0.0, 1.0, 0.0, 1.0, 1.0, 0.0],
        "mean_fd" => [0.1, 0.2, 0.15, 0.12, 0.3, 0.22],
        "scanner" => ["siemens", "siemens", "ge", "ge", "siemens", "ge"],
    )
    .expect("frame");
    let config = DesignConfig {
        group_column: "diagnosis".into(),
        control_label: "HC".into(),
        scanner: true,
        sequence: false,
        medication: false,
    };
    let design = build_design(&PhenotypeTable { df }, &config).expect("design");

    // One dummy for scanner (reference = first observed level "siemens").
    assert_eq!(design.matrix.ncols(), 6);
    let scanner_col = design
        .terms
        .iter()
        .position(|t| matches!(t, Term::Categorical { column, level } if column == "scanner" && level == "ge"))
        .expect("scanner dummy");
    for (i, expected) in [0.0, 0.0, 1.0, 1.0, 0.0, 1.0].into_iter().enumerate() {
        assert_eq!(design.matrix[[i, scanner_col]], expected);
    }
    // The contrast column is still unique.
    assert_eq!(
        design
            .terms
            .iter()
            .filter(|t| matches!(t, Term::Contrast { .. }))
            .count(),
        1
    );
}

#[test]
fn standardize_uses_reference_scale_only() {
    // Two edges; reference rows are the last two. First edge has reference
    // SD 1 (values 1 and 3, population SD 1), second has reference SD 2.
    let data = Array2::from_shape_vec(
        (4, 2),
        vec![
            2.0, 4.0, //
            6.0, 8.0, //
            1.0, 2.0, //
            3.0, 6.0,
        ],
    )
    .expect("shape");
    let reference = [false, false, true, true];
    let (out, summary) = standardize(&data, &reference).expect("standardize");

    assert!(summary.degenerate_edges.is_empty());
    // No centering: values are divided, never shifted.
    assert!((out[[0, 0]] - 2.0).abs() < 1e-12);
    assert!((out[[1, 0]] - 6.0).abs() < 1e-12);
    assert!((out[[0, 1]] - 2.0).abs() < 1e-12);
    assert!((out[[3, 1]] - 3.0).abs() < 1e-12);
}

#[test]
fn standardize_flags_zero_variance_reference() {
    let data = Array2::from_shape_vec((3, 2), vec![1.0, 2.0, 1.0, 3.0, 1.0, 4.0]).expect("shape");
    let reference = [true, true, true];
    let (out, summary) = standardize(&data, &reference).expect("standardize");

    assert_eq!(summary.degenerate_edges, vec![0]);
    assert!(!out[[0, 0]].is_finite());
    assert!(out[[0, 1]].is_finite());
}
