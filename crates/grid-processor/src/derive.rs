//! Derived fields computed from model variables.

use hazard_common::{Grid, HazardResult, TimeSeriesGrid};

/// Wind speed magnitude `sqrt(u² + v²)` from the wind components.
///
/// Components on different grids must be regridded first; mismatched
/// coordinates fail with `ShapeMismatch`.
pub fn wind_speed(u: &Grid, v: &Grid) -> HazardResult<Grid> {
    let speed = u.zip_with(v, |a, b| (a * a + b * b).sqrt())?;
    Ok(speed.with_name("wind_speed").with_units("m s-1"))
}

/// Wind speed for every step of two component series.
pub fn wind_speed_series(u: &TimeSeriesGrid, v: &TimeSeriesGrid) -> HazardResult<TimeSeriesGrid> {
    let series = u.zip_with(v, wind_speed)?;
    Ok(series.with_name("wind_speed").with_units("m s-1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use hazard_common::HazardError;

    #[test]
    fn test_wind_speed() {
        let u = Grid::new(vec![0.0], vec![0.0, 1.0], vec![3.0, -6.0]).unwrap();
        let v = Grid::new(vec![0.0], vec![0.0, 1.0], vec![4.0, 8.0]).unwrap();
        let speed = wind_speed(&u, &v).unwrap();
        assert_eq!(speed.data(), &[5.0, 10.0]);
        assert_eq!(speed.units(), Some("m s-1"));
    }

    #[test]
    fn test_wind_speed_shape_mismatch() {
        let u = Grid::filled(vec![0.0], vec![0.0, 1.0], 1.0).unwrap();
        let v = Grid::filled(vec![0.0], vec![0.0, 2.0], 1.0).unwrap();
        assert!(matches!(
            wind_speed(&u, &v),
            Err(HazardError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_wind_speed_series_time_mismatch() {
        let t0 = Utc.with_ymd_and_hms(2019, 10, 21, 0, 0, 0).unwrap();
        let g = Grid::filled(vec![0.0], vec![0.0], 1.0).unwrap();
        let u = TimeSeriesGrid::from_pairs(vec![(t0, g.clone())]).unwrap();
        let v = TimeSeriesGrid::from_pairs(vec![(t0 + Duration::hours(1), g)]).unwrap();
        assert!(matches!(
            wind_speed_series(&u, &v),
            Err(HazardError::ShapeMismatch { .. })
        ));
    }
}
