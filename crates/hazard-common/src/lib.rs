//! Common types shared across the hazard-grids workspace.
//!
//! Grids, time series of grids, the neighbourhood definition, CF time
//! handling and the error type every processing stage returns.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod neighbourhood;
pub mod time;

pub use bbox::{BboxParseError, BoundingBox};
pub use error::{HazardError, HazardResult};
pub use grid::{Grid, TimeSeriesGrid, COORD_TOLERANCE};
pub use neighbourhood::{NeighbourhoodSpec, DEFAULT_RADIUS_DEG};
pub use time::{day_start, parse_compact_hour, CfTimeUnits, TimeUnit, TimeWindow};
