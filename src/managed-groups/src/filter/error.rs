//! Error types for filter expressions

use thiserror::Error;

/// Filter compilation and evaluation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("{0}")]
    Compilation(String),

    #[error("filter evaluation failed: {0}")]
    Evaluation(String),

    #[error("filter did not return a boolean result")]
    NonBooleanResult,
}

/// Result type for filter operations
pub type Result<T> = std::result::Result<T, FilterError>;
