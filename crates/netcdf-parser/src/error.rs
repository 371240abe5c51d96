//! Error types for NetCDF reading and writing.

use hazard_common::HazardError;
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable, coordinate, attribute or level
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Error reported by libnetcdf
    #[error("NetCDF library error: {0}")]
    Netcdf(#[from] netcdf::Error),

    /// The data read does not form a valid grid or series
    #[error(transparent)]
    Grid(#[from] HazardError),
}

impl NetCdfError {
    /// Create a MissingData error.
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }

    /// Create an InvalidFormat error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }
}
