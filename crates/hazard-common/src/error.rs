//! Error types for hazard grid processing.

use thiserror::Error;

/// Result type alias using HazardError.
pub type HazardResult<T> = Result<T, HazardError>;

/// Primary error type for grid construction and processing.
///
/// Every variant is fatal to a processing run; callers own any retry
/// around whole-run invocation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HazardError {
    /// No data left after filtering, or an empty grid/series was supplied.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    /// An interpolation target falls outside the source coverage.
    #[error("Requested point {requested} is outside source coverage {coverage}")]
    OutOfBounds { requested: String, coverage: String },

    /// Two grids were combined with different shapes or coordinates.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

impl HazardError {
    /// Create an EmptyInput error.
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create an OutOfBounds error.
    pub fn out_of_bounds(requested: impl Into<String>, coverage: impl Into<String>) -> Self {
        Self::OutOfBounds {
            requested: requested.into(),
            coverage: coverage.into(),
        }
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Short machine-readable name for the error kind, logged as the
    /// `kind` field when a run fails.
    pub fn kind(&self) -> &'static str {
        match self {
            HazardError::EmptyInput(_) => "EmptyInputError",
            HazardError::InvalidParameter { .. } => "InvalidParameterError",
            HazardError::OutOfBounds { .. } => "OutOfBoundsError",
            HazardError::ShapeMismatch { .. } => "ShapeMismatchError",
        }
    }
}
