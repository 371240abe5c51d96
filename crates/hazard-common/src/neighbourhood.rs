//! Neighbourhood definition for the spatial-maximum filter.

use serde::{Deserialize, Serialize};

use crate::error::{HazardError, HazardResult};

/// Default neighbourhood radius in degrees (roughly 40 km at mid latitudes).
pub const DEFAULT_RADIUS_DEG: f64 = 0.36;

/// A fixed-radius disk in coordinate-space degrees.
///
/// A cell `(lat', lon')` is in the neighbourhood of `(lat, lon)` when
/// `sqrt(dlat² + dlon²) <= radius`. This planar distance approximates the
/// great-circle distance over the small domains the filter is used on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighbourhoodSpec {
    radius_deg: f64,
}

impl NeighbourhoodSpec {
    /// Create a spec, rejecting non-positive or non-finite radii.
    pub fn new(radius_deg: f64) -> HazardResult<Self> {
        if !radius_deg.is_finite() || radius_deg <= 0.0 {
            return Err(HazardError::invalid_parameter(
                "radius",
                format!("must be > 0, got {}", radius_deg),
            ));
        }
        Ok(Self { radius_deg })
    }

    pub fn radius(&self) -> f64 {
        self.radius_deg
    }

    /// Planar distance between two points in degrees.
    #[inline]
    pub fn distance(dlat: f64, dlon: f64) -> f64 {
        (dlat * dlat + dlon * dlon).sqrt()
    }

    /// Whether an offset lies inside the disk.
    ///
    /// Both filter implementations go through this one predicate so their
    /// results agree exactly.
    #[inline]
    pub fn contains(&self, dlat: f64, dlon: f64) -> bool {
        Self::distance(dlat, dlon) <= self.radius_deg
    }
}

impl Default for NeighbourhoodSpec {
    fn default() -> Self {
        Self {
            radius_deg: DEFAULT_RADIUS_DEG,
        }
    }
}
