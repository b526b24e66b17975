//! Error types for the signflow pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feature vector length mismatch: expected {expected}, got {actual}")]
    FeatureLength { expected: usize, actual: usize },

    #[error("No open segment: call start_segment before pushing frames")]
    NoOpenSegment,

    #[error("Operation `{operation}` is not available in {mode} mode")]
    ModeMismatch {
        operation: &'static str,
        mode: &'static str,
    },

    #[error("NPY format error: {0}")]
    Npy(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("No valid sequences found under {0}")]
    EmptyDataset(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<::config::ConfigError> for Error {
    fn from(e: ::config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
