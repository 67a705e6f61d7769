//! Engine error types.
//!
//! Expected data-sparsity conditions (`InsufficientData`, `EmptyPortfolio`)
//! are returned as values so callers can tell "no data" apart from a
//! computed zero. Entity-resolution misses are not errors at all; they are
//! reported through the quote book diagnostics.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Portfolio is empty")]
    EmptyPortfolio,

    #[error("Invalid stat type: {0}")]
    InvalidStatType(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Classifier returned probability outside [0, 1]: {0}")]
    InvalidProbability(f64),

    #[error("Data source failed: {0}")]
    Source(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl EngineError {
    pub fn insufficient(required: usize, available: usize) -> Self {
        Self::InsufficientData {
            required,
            available,
        }
    }

    /// Whether this error describes missing data rather than a failure.
    pub fn is_data_sparsity(&self) -> bool {
        matches!(self, Self::InsufficientData { .. } | Self::EmptyPortfolio)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
