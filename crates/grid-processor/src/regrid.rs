//! Bilinear regridding of one field onto another field's coordinates.
//!
//! Used to align fields that come from different model grids (for example
//! u and v wind components on staggered grids) before combining them.
//!
//! Out-of-coverage policy: every target coordinate must lie within the
//! source axis range, widened by a small tolerance to absorb rounding in
//! stored coordinates. Any target point beyond that fails the whole regrid
//! with `OutOfBounds`; no extrapolation is performed.

use tracing::debug;

use hazard_common::{Grid, HazardError, HazardResult, TimeSeriesGrid};

/// Default tolerance (degrees) when testing target points against the
/// source coverage.
pub const REGRID_TOLERANCE: f64 = 1e-9;

/// Interpolation weights along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisWeight {
    i0: usize,
    i1: usize,
    /// Weight of `i1`; `i0` gets `1 - frac`.
    frac: f64,
}

/// Locate `x` on a strictly monotonic axis.
///
/// Returns `None` when `x` lies outside the axis range by more than
/// `tolerance`. A single-point axis only admits its own coordinate.
fn axis_weight(axis: &[f64], x: f64, tolerance: f64) -> Option<AxisWeight> {
    let n = axis.len();
    let first = *axis.first()?;
    let last = axis[n - 1];
    let (lo, hi) = (first.min(last), first.max(last));

    if x < lo - tolerance || x > hi + tolerance {
        return None;
    }
    if n == 1 {
        return Some(AxisWeight {
            i0: 0,
            i1: 0,
            frac: 0.0,
        });
    }

    let x = x.clamp(lo, hi);
    let idx = if last > first {
        axis.partition_point(|&v| v <= x)
    } else {
        axis.partition_point(|&v| v >= x)
    };
    let i0 = idx.saturating_sub(1).min(n - 2);
    let i1 = i0 + 1;
    let frac = ((x - axis[i0]) / (axis[i1] - axis[i0])).clamp(0.0, 1.0);

    Some(AxisWeight { i0, i1, frac })
}

/// Bilinear interpolation at one point.
///
/// Corners with zero weight do not contribute, so a point sitting exactly on
/// a source node returns that node's value even next to missing data. A NaN
/// in any contributing corner gives NaN.
fn bilinear_at(data: &[f32], cols: usize, row: AxisWeight, col: AxisWeight) -> f32 {
    let corners = [
        (row.i0, col.i0, (1.0 - row.frac) * (1.0 - col.frac)),
        (row.i0, col.i1, (1.0 - row.frac) * col.frac),
        (row.i1, col.i0, row.frac * (1.0 - col.frac)),
        (row.i1, col.i1, row.frac * col.frac),
    ];

    let mut sum = 0.0f64;
    for (r, c, w) in corners {
        if w == 0.0 {
            continue;
        }
        let v = data[r * cols + c];
        if v.is_nan() {
            return f32::NAN;
        }
        sum += v as f64 * w;
    }
    sum as f32
}

/// Interpolate `source` onto the coordinates of `target_coords`.
///
/// Only the coordinates of `target_coords` are used; the output keeps the
/// source's name and units.
pub fn regrid_linear(target_coords: &Grid, source: &Grid) -> HazardResult<Grid> {
    regrid_linear_with_tolerance(target_coords, source, REGRID_TOLERANCE)
}

/// [`regrid_linear`] with an explicit coverage tolerance.
pub fn regrid_linear_with_tolerance(
    target_coords: &Grid,
    source: &Grid,
    tolerance: f64,
) -> HazardResult<Grid> {
    if source.is_empty() {
        return Err(HazardError::empty_input("cannot regrid an empty source grid"));
    }
    if target_coords.is_empty() {
        return Err(HazardError::empty_input("cannot regrid onto an empty grid"));
    }

    let row_weights = axis_weights(source.lats(), target_coords.lats(), tolerance, source)?;
    let col_weights = axis_weights(source.lons(), target_coords.lons(), tolerance, source)?;

    let cols = source.cols();
    let mut out = Vec::with_capacity(row_weights.len() * col_weights.len());
    for &rw in &row_weights {
        for &cw in &col_weights {
            out.push(bilinear_at(source.data(), cols, rw, cw));
        }
    }

    debug!(
        from = %source.describe_coords(),
        to = %target_coords.describe_coords(),
        "Regridded field"
    );

    let mut grid = Grid::new(
        target_coords.lats().to_vec(),
        target_coords.lons().to_vec(),
        out,
    )?;
    if let Some(name) = source.name() {
        grid = grid.with_name(name);
    }
    if let Some(units) = source.units() {
        grid = grid.with_units(units);
    }
    Ok(grid)
}

/// Regrid every step of a series onto `target_coords`.
pub fn regrid_series(target_coords: &Grid, source: &TimeSeriesGrid) -> HazardResult<TimeSeriesGrid> {
    regrid_series_with_tolerance(target_coords, source, REGRID_TOLERANCE)
}

/// [`regrid_series`] with an explicit coverage tolerance.
pub fn regrid_series_with_tolerance(
    target_coords: &Grid,
    source: &TimeSeriesGrid,
    tolerance: f64,
) -> HazardResult<TimeSeriesGrid> {
    source.map_steps(|g| regrid_linear_with_tolerance(target_coords, g, tolerance))
}

fn axis_weights(
    axis: &[f64],
    targets: &[f64],
    tolerance: f64,
    source: &Grid,
) -> HazardResult<Vec<AxisWeight>> {
    targets
        .iter()
        .map(|&x| {
            axis_weight(axis, x, tolerance).ok_or_else(|| {
                HazardError::out_of_bounds(
                    format!("coordinate {}", x),
                    source.describe_coords(),
                )
            })
        })
        .collect()
}
