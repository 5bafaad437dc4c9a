use thiserror::Error;

/// Structural failures that abort a run before any output is written.
///
/// Extraction misses and malformed dates are *not* errors — the pattern
/// engine represents them as unset fields.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("No input tables given")]
    EmptyInput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
