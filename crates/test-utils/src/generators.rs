//! Synthetic field generators.
//!
//! Raw generators return row-major `Vec<f32>` values; the grid builders wrap
//! values with coordinates so they can be fed straight into the kernels.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use hazard_common::{Grid, TimeSeriesGrid};

/// Values encoding their own position: `col * 1000 + row`.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let values = create_test_grid(10, 5);
/// assert_eq!(values[1], 1000.0);  // col=1, row=0
/// assert_eq!(values[10], 1.0);    // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    (0..height)
        .flat_map(|row| (0..width).map(move |col| (col * 1000 + row) as f32))
        .collect()
}

/// Eastward wind component varying with row, -20 to +20 m/s.
pub fn create_u_wind_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let u = (row as f32 / height as f32 - 0.5) * 40.0;
        data.extend(std::iter::repeat(u).take(width));
    }
    data
}

/// Northward wind component varying with column, -15 to +15 m/s.
pub fn create_v_wind_grid(width: usize, height: usize) -> Vec<f32> {
    let row: Vec<f32> = (0..width)
        .map(|col| (col as f32 / width as f32 - 0.5) * 30.0)
        .collect();
    row.repeat(height)
}

/// Sparse, deterministic rain amounts in mm (about a quarter of cells wet).
pub fn create_precipitation_grid(width: usize, height: usize, seed: u32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let hash = mix(col as u32, row as u32, seed);
            data.push(if hash % 4 == 0 {
                (hash % 5000) as f32 / 100.0
            } else {
                0.0
            });
        }
    }
    data
}

fn mix(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^ (h >> 16)
}

/// `n` evenly spaced coordinates from `start`.
pub fn regular_axis(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Grid on unit-spaced coordinates: `lat = row`, `lon = col`.
///
/// # Panics
///
/// Panics if `values.len() != rows * cols`.
pub fn regular_grid(rows: usize, cols: usize, values: Vec<f32>) -> Grid {
    Grid::new(regular_axis(0.0, 1.0, rows), regular_axis(0.0, 1.0, cols), values)
        .expect("values must match rows * cols")
}

/// Zero grid with a single spike at `(row, col)`.
pub fn spike_grid(rows: usize, cols: usize, row: usize, col: usize, value: f32) -> Grid {
    let mut grid = regular_grid(rows, cols, vec![0.0; rows * cols]);
    grid.set(row, col, value);
    grid
}

/// Strictly monotonic axis with random, uneven spacing.
pub fn random_axis<R: Rng>(rng: &mut R, n: usize, descending: bool) -> Vec<f64> {
    let mut value: f64 = rng.gen_range(-40.0..-10.0);
    let mut axis = Vec::with_capacity(n);
    for _ in 0..n {
        axis.push(value);
        value += rng.gen_range(0.05..0.4);
    }
    if descending {
        axis.reverse();
    }
    axis
}

/// Random field in `[0, 50)` on the given axes; each cell is NaN with
/// probability `nan_fraction`.
pub fn random_grid<R: Rng>(rng: &mut R, lats: Vec<f64>, lons: Vec<f64>, nan_fraction: f64) -> Grid {
    let data = (0..lats.len() * lons.len())
        .map(|_| {
            if rng.gen_bool(nan_fraction) {
                f32::NAN
            } else {
                rng.gen_range(0.0..50.0)
            }
        })
        .collect();
    Grid::new(lats, lons, data).expect("random axes are monotonic")
}

/// Series with steps `step` apart starting at `start`.
pub fn make_series(start: DateTime<Utc>, step: Duration, grids: Vec<Grid>) -> TimeSeriesGrid {
    let times = (0..grids.len()).map(|i| start + step * i as i32).collect();
    TimeSeriesGrid::new(times, grids).expect("generated series is well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(10, 5);
        assert_eq!(grid.len(), 50);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[11], 1001.0);
    }

    #[test]
    fn test_wind_components_shape() {
        let u = create_u_wind_grid(8, 4);
        let v = create_v_wind_grid(8, 4);
        assert_eq!(u.len(), 32);
        assert_eq!(v.len(), 32);
        assert_eq!(u[0], -20.0);
        assert_eq!(v[0], -15.0);
    }

    #[test]
    fn test_precipitation_deterministic() {
        let a = create_precipitation_grid(100, 100, 42);
        assert_eq!(a, create_precipitation_grid(100, 100, 42));
        assert_ne!(a, create_precipitation_grid(100, 100, 43));
        assert!(a.iter().all(|&v| (0.0..50.0).contains(&v)));
    }

    #[test]
    fn test_spike_grid() {
        let grid = spike_grid(5, 5, 2, 2, 10.0);
        assert_eq!(grid.get(2, 2), Some(10.0));
        assert_eq!(grid.data().iter().filter(|&&v| v != 0.0).count(), 1);
    }

    #[test]
    fn test_random_axis_is_monotonic() {
        let mut rng = StdRng::seed_from_u64(7);
        let up = random_axis(&mut rng, 20, false);
        let down = random_axis(&mut rng, 20, true);
        assert!(up.windows(2).all(|w| w[1] > w[0]));
        assert!(down.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_make_series() {
        let start = chrono::TimeZone::with_ymd_and_hms(&Utc, 2015, 4, 20, 0, 0, 0).unwrap();
        let grids = vec![regular_grid(1, 1, vec![1.0]); 3];
        let series = make_series(start, Duration::minutes(10), grids);
        assert_eq!(series.len(), 3);
        assert_eq!(series.times()[2], start + Duration::minutes(20));
    }
}
