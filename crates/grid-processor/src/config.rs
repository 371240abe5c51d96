//! Configuration for the grid processor.

use serde::{Deserialize, Serialize};

use hazard_common::{HazardResult, NeighbourhoodSpec, DEFAULT_RADIUS_DEG};

use crate::neighbourhood::NeighbourhoodMax;
use crate::regrid::REGRID_TOLERANCE;

/// Configuration for the numerical kernels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Neighbourhood radius in degrees.
    pub neighbourhood_radius_deg: f64,

    /// Compute neighbourhood rows in parallel.
    pub parallel: bool,

    /// Tolerance in degrees when testing regrid targets against the source
    /// coverage.
    pub coord_tolerance: f64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            neighbourhood_radius_deg: DEFAULT_RADIUS_DEG,
            parallel: true,
            coord_tolerance: REGRID_TOLERANCE,
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from `HAZARD_*` environment variables that are set.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("HAZARD_NEIGHBOURHOOD_RADIUS") {
            if let Ok(radius) = val.parse() {
                self.neighbourhood_radius_deg = radius;
            }
        }

        if let Ok(val) = std::env::var("HAZARD_PARALLEL") {
            self.parallel = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("HAZARD_COORD_TOLERANCE") {
            if let Ok(tol) = val.parse() {
                self.coord_tolerance = tol;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.neighbourhood_radius_deg.is_finite() || self.neighbourhood_radius_deg <= 0.0 {
            return Err("neighbourhood_radius_deg must be > 0".to_string());
        }

        if !self.coord_tolerance.is_finite() || self.coord_tolerance < 0.0 {
            return Err("coord_tolerance must be >= 0".to_string());
        }

        Ok(())
    }

    /// The neighbourhood disk described by this configuration.
    pub fn neighbourhood(&self) -> HazardResult<NeighbourhoodSpec> {
        NeighbourhoodSpec::new(self.neighbourhood_radius_deg)
    }

    /// A neighbourhood filter honouring the `parallel` setting.
    pub fn neighbourhood_filter(&self) -> HazardResult<NeighbourhoodMax> {
        Ok(NeighbourhoodMax::new(self.neighbourhood()?).parallel(self.parallel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ProcessorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.neighbourhood_radius_deg, 0.36);
        assert!(config.neighbourhood().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ProcessorConfig {
            neighbourhood_radius_deg: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(config.neighbourhood().is_err());

        let config = ProcessorConfig {
            coord_tolerance: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ProcessorConfig = serde_json::from_str(r#"{"parallel": false}"#).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.neighbourhood_radius_deg, DEFAULT_RADIUS_DEG);
    }
}
