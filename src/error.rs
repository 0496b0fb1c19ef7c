use thiserror::Error;

/// Fatal configuration errors. Any of these aborts the run before any output
/// file is written.
#[derive(Debug, Error)]
pub enum CwasError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error(
        "none of the requested labels {labels:?} of column \"{column}\" are present in the data"
    )]
    CohortUnavailable { column: String, labels: Vec<String> },

    #[error("no single design column matches contrast \"{contrast}\"; candidates: {candidates:?}")]
    AmbiguousContrast {
        contrast: String,
        candidates: Vec<String>,
    },

    #[error("contrast column \"{column}\" has {found} level(s); at least 2 are required")]
    TooFewContrastLevels { column: String, found: usize },

    #[error("edge mask selects {mask_edges} cells but connectivity vector has {vector_len} values")]
    MaskMismatch { mask_edges: usize, vector_len: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CwasError>;
