//! Numerical kernels for hazard grid products.
//!
//! Every operation is a pure function from immutable inputs to a new value:
//!
//! - **Temporal reduction**: event maxima and totals, rolling windows, daily
//!   aggregation ([`temporal`])
//! - **Neighbourhood filter**: maximum within a fixed radius of each cell
//!   ([`neighbourhood`])
//! - **Regrid**: bilinear alignment of one field onto another's coordinates
//!   ([`regrid`])
//! - **Series cleaning**: joining multi-file series, accumulation increments
//!   ([`series`])
//! - **Derived fields**: wind speed from components ([`derive`])
//!
//! # Pipeline
//!
//! ```text
//! NetCDF files
//!      │
//!      ▼
//! concatenate() ──► TimeSeriesGrid
//!      │
//!      ├─► regrid_series() / wind_speed_series()
//!      │
//!      ├─► reduce_time()        event max / total
//!      ├─► rolling()            1 h / 6 h totals
//!      ├─► aggregate_daily()    daily max
//!      │
//!      └─► neighbourhood_max()  spatial max within D
//!               │
//!               ▼
//!          NetCDF output
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{neighbourhood_max, reduce_time, ReduceOp};
//! use hazard_common::NeighbourhoodSpec;
//!
//! let event_max = reduce_time(&gusts, ReduceOp::Max, None)?;
//! let spec = NeighbourhoodSpec::new(0.36)?;
//! let nbhd = neighbourhood_max(&event_max, &spec)?;
//! ```

pub mod config;
pub mod derive;
pub mod neighbourhood;
pub mod reduce;
pub mod regrid;
pub mod series;
pub mod temporal;

// Re-export commonly used items at crate root
pub use config::ProcessorConfig;
pub use derive::{wind_speed, wind_speed_series};
pub use neighbourhood::{
    neighbourhood_max, neighbourhood_max_naive, NaiveNeighbourhoodMax, NeighbourhoodMax,
    SpatialFilter,
};
pub use reduce::{reduce_slices, ReduceOp};
pub use regrid::{
    regrid_linear, regrid_linear_with_tolerance, regrid_series, regrid_series_with_tolerance,
    REGRID_TOLERANCE,
};
pub use series::{accumulation_to_increments, concatenate, drop_leading};
pub use temporal::{
    aggregate_daily, reduce_grids, reduce_time, rolling, rolling_duration, steps_for_duration,
};
