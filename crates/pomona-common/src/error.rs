//! Error types for the Pomona platform
//!
//! Provides a unified error type and domain-specific variants.
//!
//! Note that data absence (no cached climate series, no live price quote,
//! unknown variety or region) is deliberately NOT an error anywhere in this
//! workspace: those conditions are modelled as `Option` values or default
//! substitutions. The variants below cover genuine faults only.

use thiserror::Error;

/// Result type alias using PomonaError
pub type Result<T> = std::result::Result<T, PomonaError>;

/// Unified error type for Pomona operations
#[derive(Debug, Error)]
pub enum PomonaError {
    // Storage errors (document store / append log)
    #[error("Storage error: {0}")]
    Storage(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Model training errors
    #[error("Training error: {0}")]
    Training(#[from] TrainingError),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Regression model training errors
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Insufficient training data: {samples} samples, at least {required} required")]
    InsufficientData { samples: usize, required: usize },

    #[error("Degenerate feature matrix: {0}")]
    DegenerateFeatures(String),
}

impl From<serde_json::Error> for PomonaError {
    fn from(err: serde_json::Error) -> Self {
        PomonaError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for PomonaError {
    fn from(err: std::io::Error) -> Self {
        PomonaError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for PomonaError {
    fn from(err: anyhow::Error) -> Self {
        PomonaError::Internal(err.to_string())
    }
}
