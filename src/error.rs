use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run. Per-record problems are never errors, see
/// `normalizer::SkipReason`.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Reference file unreadable: {path}: {source}")]
    ReferenceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fact file unreadable: {path}: {source}")]
    FactsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output not writable: {path}: {source}")]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file unreadable: {path}: {source}")]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Summary serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
