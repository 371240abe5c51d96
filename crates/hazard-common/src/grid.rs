//! Gridded fields on a regular latitude/longitude coordinate system.
//!
//! A [`Grid`] is one 2-D field, a [`TimeSeriesGrid`] is an ordered stack of
//! grids sharing coordinates. Both validate their invariants at construction
//! so downstream reductions can index without re-checking.

use chrono::{DateTime, Utc};

use crate::bbox::BoundingBox;
use crate::error::{HazardError, HazardResult};
use crate::time::TimeWindow;

/// Absolute tolerance (degrees) when comparing coordinate arrays.
pub const COORD_TOLERANCE: f64 = 1e-6;

/// A 2-D scalar field indexed by latitude (rows) and longitude (columns).
///
/// Values are stored row-major: `data[row * lons.len() + col]`.
/// Missing values are represented as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    name: Option<String>,
    units: Option<String>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    data: Vec<f32>,
}

impl Grid {
    /// Create a grid, validating coordinate lengths and monotonicity.
    pub fn new(lats: Vec<f64>, lons: Vec<f64>, data: Vec<f32>) -> HazardResult<Self> {
        validate_axis("latitude", &lats)?;
        validate_axis("longitude", &lons)?;

        if lats.len() * lons.len() != data.len() {
            return Err(HazardError::shape_mismatch(
                format!("{} values ({}x{})", lats.len() * lons.len(), lats.len(), lons.len()),
                format!("{} values", data.len()),
            ));
        }

        Ok(Self {
            name: None,
            units: None,
            lats,
            lons,
            data,
        })
    }

    /// Create a grid with every cell set to `value`.
    pub fn filled(lats: Vec<f64>, lons: Vec<f64>, value: f32) -> HazardResult<Self> {
        let len = lats.len() * lons.len();
        Self::new(lats, lons, vec![value; len])
    }

    /// Attach a descriptive variable name (e.g. `event_max_windspeed`).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach physical units (e.g. `m s-1`).
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Replace the values, keeping coordinates and tags.
    pub fn with_data(&self, data: Vec<f32>) -> HazardResult<Self> {
        if data.len() != self.data.len() {
            return Err(HazardError::shape_mismatch(
                format!("{} values", self.data.len()),
                format!("{} values", data.len()),
            ));
        }
        Ok(Self {
            name: self.name.clone(),
            units: self.units.clone(),
            lats: self.lats.clone(),
            lons: self.lons.clone(),
            data,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Number of latitude rows.
    pub fn rows(&self) -> usize {
        self.lats.len()
    }

    /// Number of longitude columns.
    pub fn cols(&self) -> usize {
        self.lons.len()
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at `(row, col)`, or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        self.data.get(row * self.cols() + col).copied()
    }

    /// Set the value at `(row, col)`. Returns false outside the grid.
    pub fn set(&mut self, row: usize, col: usize, value: f32) -> bool {
        if row >= self.rows() || col >= self.cols() {
            return false;
        }
        let cols = self.cols();
        self.data[row * cols + col] = value;
        true
    }

    /// One latitude row of values.
    pub fn row(&self, row: usize) -> &[f32] {
        let cols = self.cols();
        &self.data[row * cols..(row + 1) * cols]
    }

    /// Geographic coverage of the cell centres, `None` for an empty grid.
    pub fn bbox(&self) -> Option<BoundingBox> {
        let (lat_min, lat_max) = axis_range(&self.lats)?;
        let (lon_min, lon_max) = axis_range(&self.lons)?;
        Some(BoundingBox::new(lon_min, lat_min, lon_max, lat_max))
    }

    /// Whether two grids share shape and coordinates within `tolerance`.
    pub fn same_coords(&self, other: &Grid, tolerance: f64) -> bool {
        axes_match(&self.lats, &other.lats, tolerance) && axes_match(&self.lons, &other.lons, tolerance)
    }

    /// Fail with `ShapeMismatch` unless `other` shares these coordinates.
    pub fn ensure_same_coords(&self, other: &Grid) -> HazardResult<()> {
        if self.same_coords(other, COORD_TOLERANCE) {
            return Ok(());
        }
        Err(HazardError::shape_mismatch(
            self.describe_coords(),
            other.describe_coords(),
        ))
    }

    /// Short description of the coordinate system for error messages.
    pub fn describe_coords(&self) -> String {
        match self.bbox() {
            Some(bbox) => format!("{}x{} grid over {}", self.rows(), self.cols(), bbox),
            None => format!("{}x{} grid", self.rows(), self.cols()),
        }
    }

    /// Apply `f` to every cell.
    pub fn map<F>(&self, f: F) -> Grid
    where
        F: Fn(f32) -> f32,
    {
        Grid {
            name: self.name.clone(),
            units: self.units.clone(),
            lats: self.lats.clone(),
            lons: self.lons.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combine two grids cell by cell. Coordinates must match.
    pub fn zip_with<F>(&self, other: &Grid, f: F) -> HazardResult<Grid>
    where
        F: Fn(f32, f32) -> f32,
    {
        self.ensure_same_coords(other)?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        self.with_data(data)
    }

    /// Extract the cells whose centres fall inside `bbox`.
    pub fn subset(&self, bbox: &BoundingBox) -> HazardResult<Grid> {
        let rows: Vec<usize> = (0..self.rows())
            .filter(|&r| bbox.contains_lat(self.lats[r]))
            .collect();
        let cols: Vec<usize> = (0..self.cols())
            .filter(|&c| bbox.contains_lon(self.lons[c]))
            .collect();

        if rows.is_empty() || cols.is_empty() {
            return Err(HazardError::empty_input(format!(
                "no grid cells inside {} (grid covers {})",
                bbox,
                self.describe_coords()
            )));
        }

        let mut data = Vec::with_capacity(rows.len() * cols.len());
        for &r in &rows {
            for &c in &cols {
                data.push(self.data[r * self.cols() + c]);
            }
        }

        Ok(Grid {
            name: self.name.clone(),
            units: self.units.clone(),
            lats: rows.iter().map(|&r| self.lats[r]).collect(),
            lons: cols.iter().map(|&c| self.lons[c]).collect(),
            data,
        })
    }
}

/// An ordered sequence of grids on one coordinate system.
///
/// Times are strictly increasing; every step shares the first step's
/// coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesGrid {
    name: Option<String>,
    units: Option<String>,
    times: Vec<DateTime<Utc>>,
    steps: Vec<Grid>,
}

impl TimeSeriesGrid {
    /// Create a series, validating ordering and shared coordinates.
    pub fn new(times: Vec<DateTime<Utc>>, steps: Vec<Grid>) -> HazardResult<Self> {
        if times.len() != steps.len() {
            return Err(HazardError::shape_mismatch(
                format!("{} time steps", times.len()),
                format!("{} grids", steps.len()),
            ));
        }

        if let Some(pair) = times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(HazardError::invalid_parameter(
                "time",
                format!("times must be strictly increasing: {} then {}", pair[0], pair[1]),
            ));
        }

        if let Some(first) = steps.first() {
            for step in &steps[1..] {
                first.ensure_same_coords(step)?;
            }
        }

        let name = steps.first().and_then(|g| g.name.clone());
        let units = steps.first().and_then(|g| g.units.clone());

        Ok(Self {
            name,
            units,
            times,
            steps,
        })
    }

    /// Create a series from `(time, grid)` pairs.
    pub fn from_pairs(pairs: Vec<(DateTime<Utc>, Grid)>) -> HazardResult<Self> {
        let (times, steps) = pairs.into_iter().unzip();
        Self::new(times, steps)
    }

    /// Attach a descriptive variable name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach physical units.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn steps(&self) -> &[Grid] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Grid> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn first_time(&self) -> Option<DateTime<Utc>> {
        self.times.first().copied()
    }

    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.times.last().copied()
    }

    /// `(rows, cols)` of each step, `None` for an empty series.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.steps.first().map(Grid::shape)
    }

    /// Iterate over `(time, grid)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, &Grid)> {
        self.times.iter().zip(self.steps.iter())
    }

    pub fn into_parts(self) -> (Vec<DateTime<Utc>>, Vec<Grid>) {
        (self.times, self.steps)
    }

    /// Steps `range.start..range.end`, clamped to the series length.
    pub fn slice(&self, range: std::ops::Range<usize>) -> TimeSeriesGrid {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        TimeSeriesGrid {
            name: self.name.clone(),
            units: self.units.clone(),
            times: self.times[start..end].to_vec(),
            steps: self.steps[start..end].to_vec(),
        }
    }

    /// Steps whose time lies in the closed window.
    pub fn filter_window(&self, window: &TimeWindow) -> TimeSeriesGrid {
        let (times, steps) = self
            .iter()
            .filter(|(t, _)| window.contains(t))
            .map(|(t, g)| (*t, g.clone()))
            .unzip();
        TimeSeriesGrid {
            name: self.name.clone(),
            units: self.units.clone(),
            times,
            steps,
        }
    }

    /// Restrict every step to the cells inside `bbox`.
    pub fn subset(&self, bbox: &BoundingBox) -> HazardResult<TimeSeriesGrid> {
        self.map_steps(|g| g.subset(bbox))
    }

    /// Apply a fallible per-step transform, keeping times and tags.
    pub fn map_steps<F>(&self, f: F) -> HazardResult<TimeSeriesGrid>
    where
        F: Fn(&Grid) -> HazardResult<Grid>,
    {
        let steps = self.steps.iter().map(f).collect::<HazardResult<Vec<_>>>()?;
        let mut series = TimeSeriesGrid::new(self.times.clone(), steps)?;
        series.name = self.name.clone();
        series.units = self.units.clone();
        Ok(series)
    }

    /// Combine two series step by step. Time axes and coordinates must match.
    pub fn zip_with<F>(&self, other: &TimeSeriesGrid, f: F) -> HazardResult<TimeSeriesGrid>
    where
        F: Fn(&Grid, &Grid) -> HazardResult<Grid>,
    {
        if self.times != other.times {
            return Err(HazardError::shape_mismatch(
                format!("{} steps from {:?}", self.len(), self.first_time()),
                format!("{} steps from {:?}", other.len(), other.first_time()),
            ));
        }
        let steps = self
            .steps
            .iter()
            .zip(other.steps.iter())
            .map(|(a, b)| f(a, b))
            .collect::<HazardResult<Vec<_>>>()?;
        TimeSeriesGrid::new(self.times.clone(), steps)
    }
}

/// Coordinates must be finite and strictly monotonic (either direction).
fn validate_axis(name: &str, axis: &[f64]) -> HazardResult<()> {
    if let Some(v) = axis.iter().find(|v| !v.is_finite()) {
        return Err(HazardError::invalid_parameter(
            name,
            format!("non-finite coordinate {}", v),
        ));
    }

    if axis.len() < 2 {
        return Ok(());
    }

    let increasing = axis.windows(2).all(|w| w[1] > w[0]);
    let decreasing = axis.windows(2).all(|w| w[1] < w[0]);
    if !increasing && !decreasing {
        return Err(HazardError::invalid_parameter(
            name,
            "coordinates must be strictly monotonic",
        ));
    }
    Ok(())
}

fn axis_range(axis: &[f64]) -> Option<(f64, f64)> {
    let first = *axis.first()?;
    let last = *axis.last()?;
    Some((first.min(last), first.max(last)))
}

fn axes_match(a: &[f64], b: &[f64], tolerance: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance)
}
