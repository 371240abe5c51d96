//! NetCDF input and output for hazard grids.
//!
//! Reads CF-convention model output (any dimension order, packed or
//! unpacked, with or without a vertical axis) into [`TimeSeriesGrid`]s, and
//! writes hazard fields back out as CF-1.6 files.
//!
//! # Implementation Notes
//!
//! Uses libnetcdf through the `netcdf` crate. System requirements:
//! `libhdf5-dev libnetcdf-dev`.
//!
//! [`TimeSeriesGrid`]: hazard_common::TimeSeriesGrid

pub mod error;
mod native;
pub mod reader;
pub mod writer;

pub use error::{NetCdfError, NetCdfResult};
pub use native::silence_hdf5_errors;
pub use reader::{read_series, read_variable, ReadOptions};
pub use writer::{write_fields, write_grid, write_series, FieldData, OutputField, FILL_VALUE};
