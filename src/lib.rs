//! Connectome-wide association study (CWAS) engine.
//!
//! Turns a stack of per-subject resting-state connectivity matrices and a
//! phenotype table into per-edge GLM contrast statistics, FDR-corrected and
//! reassembled into labeled ROI x ROI matrices.

pub mod error;
pub mod logging;
pub mod types;

pub mod df_utils;
pub mod io;
pub mod parallel;
pub mod report;

pub mod atlas;
pub mod codec;
pub mod connectome;
pub mod phenotype;
pub mod qc;

pub mod assemble;
pub mod cohort;
pub mod design;
pub mod fdr;
pub mod glm;
pub mod standardize;
pub mod workflow;
