//! Reading gridded variables from CF-style NetCDF files.
//!
//! A variable may have any dimension order; dimensions are classified by
//! their coordinate variables as time, vertical level, latitude or
//! longitude, and values are gathered into row-major `(lat, lon)` grids.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use grid_processor::{concatenate, drop_leading};
use hazard_common::{BoundingBox, CfTimeUnits, Grid, TimeSeriesGrid};

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{get_f64_attr, get_str_attr, open, read_f64_values};

/// Values at or above this magnitude are the netCDF default fill for
/// floating point variables.
const DEFAULT_FILL_THRESHOLD: f64 = 9.0e36;

/// Tolerance when matching a requested vertical level.
const LEVEL_TOLERANCE: f64 = 1e-6;

/// Options controlling what part of a variable is read.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Vertical level to select by coordinate value (e.g. 900 hPa).
    pub level: Option<f64>,
    /// Keep only cells whose centres fall inside this box.
    pub bbox: Option<BoundingBox>,
    /// Drop this many leading time steps from each file.
    pub skip_leading: usize,
    /// Stamp each step with the upper end of its CF time bounds when the
    /// time coordinate has a `bounds` variable.
    pub upper_time_bounds: bool,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: f64) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn skip_leading(mut self, n: usize) -> Self {
        self.skip_leading = n;
        self
    }

    pub fn upper_time_bounds(mut self) -> Self {
        self.upper_time_bounds = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisRole {
    Time,
    Level,
    Latitude,
    Longitude,
}

/// Classify a dimension from its name and its coordinate variable's
/// `standard_name`, `units` and `axis` attributes.
fn classify(file: &netcdf::File, dim_name: &str) -> AxisRole {
    let name = dim_name.to_lowercase();
    let coord = file.variable(dim_name);
    let attr = |key: &str| {
        coord
            .as_ref()
            .and_then(|v| get_str_attr(v, key))
            .map(|s| s.to_lowercase())
            .unwrap_or_default()
    };
    let standard_name = attr("standard_name");
    let units = attr("units");
    let axis = attr("axis");

    if matches!(name.as_str(), "latitude" | "lat")
        || standard_name == "latitude"
        || units.starts_with("degrees_north")
        || units.starts_with("degree_north")
        || axis == "y"
    {
        AxisRole::Latitude
    } else if matches!(name.as_str(), "longitude" | "lon")
        || standard_name == "longitude"
        || units.starts_with("degrees_east")
        || units.starts_with("degree_east")
        || axis == "x"
    {
        AxisRole::Longitude
    } else if name == "time" || standard_name == "time" || units.contains(" since ") || axis == "t" {
        AxisRole::Time
    } else {
        AxisRole::Level
    }
}

/// Packing and missing-value attributes of a variable.
#[derive(Debug, Clone, Copy)]
struct Packing {
    scale: f64,
    offset: f64,
    fill: Option<f64>,
    missing: Option<f64>,
}

impl Packing {
    fn from_variable(var: &netcdf::Variable) -> Self {
        Self {
            scale: get_f64_attr(var, "scale_factor").unwrap_or(1.0),
            offset: get_f64_attr(var, "add_offset").unwrap_or(0.0),
            fill: get_f64_attr(var, "_FillValue"),
            missing: get_f64_attr(var, "missing_value"),
        }
    }

    fn is_missing(&self, raw: f64) -> bool {
        let matches = |m: Option<f64>| m.is_some_and(|m| raw == m || raw as f32 == m as f32);
        !raw.is_finite()
            || matches(self.fill)
            || matches(self.missing)
            || (self.fill.is_none() && raw.abs() >= DEFAULT_FILL_THRESHOLD)
    }

    #[inline]
    fn unpack(&self, raw: f64) -> f32 {
        if self.is_missing(raw) {
            f32::NAN
        } else {
            (raw * self.scale + self.offset) as f32
        }
    }
}

fn read_coord(file: &netcdf::File, name: &str, expected_len: usize) -> NetCdfResult<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::missing(format!("coordinate variable '{}'", name)))?;
    let values = read_f64_values(&var)?;
    if values.len() != expected_len {
        return Err(NetCdfError::invalid(format!(
            "coordinate '{}' has {} values for a dimension of {}",
            name,
            values.len(),
            expected_len
        )));
    }
    Ok(values)
}

fn read_times(file: &netcdf::File, name: &str, expected_len: usize) -> NetCdfResult<Vec<DateTime<Utc>>> {
    let values = read_coord(file, name, expected_len)?;
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::missing(format!("time variable '{}'", name)))?;
    let units_str = get_str_attr(&var, "units")
        .ok_or_else(|| NetCdfError::missing(format!("units of time variable '{}'", name)))?;
    let units = CfTimeUnits::parse(&units_str)?;

    values
        .iter()
        .map(|&v| units.to_datetime(v).map_err(NetCdfError::from))
        .collect()
}

/// Upper ends of the cells named by the time coordinate's `bounds`
/// attribute, or `None` when it has no bounds. The bounds variable uses
/// its own `units` if present, otherwise the coordinate's.
fn read_upper_time_bounds(
    file: &netcdf::File,
    name: &str,
    expected_len: usize,
) -> NetCdfResult<Option<Vec<DateTime<Utc>>>> {
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::missing(format!("time variable '{}'", name)))?;
    let Some(bounds_name) = get_str_attr(&var, "bounds") else {
        return Ok(None);
    };
    let bounds = file
        .variable(&bounds_name)
        .ok_or_else(|| NetCdfError::missing(format!("time bounds variable '{}'", bounds_name)))?;

    let units_str = get_str_attr(&bounds, "units")
        .or_else(|| get_str_attr(&var, "units"))
        .ok_or_else(|| NetCdfError::missing(format!("units of time bounds '{}'", bounds_name)))?;
    let units = CfTimeUnits::parse(&units_str)?;

    let values = read_f64_values(&bounds)?;
    if values.len() != expected_len * 2 {
        return Err(NetCdfError::invalid(format!(
            "time bounds '{}' has {} values for {} steps",
            bounds_name,
            values.len(),
            expected_len
        )));
    }

    values
        .chunks_exact(2)
        .map(|pair| units.to_datetime(pair[1]).map_err(NetCdfError::from))
        .collect::<NetCdfResult<Vec<_>>>()
        .map(Some)
}

/// Time of a variable without a time dimension: the first value of the
/// file's `time` variable if there is one, otherwise the epoch.
fn fallback_time(file: &netcdf::File) -> NetCdfResult<DateTime<Utc>> {
    let Some(var) = file.variable("time") else {
        return Ok(DateTime::<Utc>::default());
    };
    let len = var.dimensions().iter().map(|d| d.len()).product();
    if len == 0 {
        return Ok(DateTime::<Utc>::default());
    }
    Ok(read_times(file, "time", len)?[0])
}

fn select_level(
    file: &netcdf::File,
    dim: Option<&(String, usize)>,
    level: Option<f64>,
) -> NetCdfResult<usize> {
    match (dim, level) {
        (None, None) => Ok(0),
        (None, Some(level)) => Err(NetCdfError::missing(format!(
            "no vertical coordinate to select level {} from",
            level
        ))),
        (Some((_, 1)), None) => Ok(0),
        (Some((name, len)), None) => Err(NetCdfError::invalid(format!(
            "'{}' has {} levels; select one",
            name, len
        ))),
        (Some((name, len)), Some(level)) => {
            let values = read_coord(file, name, *len)?;
            values
                .iter()
                .position(|v| (v - level).abs() < LEVEL_TOLERANCE)
                .ok_or_else(|| {
                    NetCdfError::missing(format!(
                        "level {} not in '{}' (available: {:?})",
                        level, name, values
                    ))
                })
        }
    }
}

/// Read one variable from one file as a time series of grids.
///
/// Packed values are unpacked with `scale_factor`/`add_offset`; cells equal
/// to `_FillValue` or `missing_value` become NaN. A variable without a time
/// dimension reads as a single step.
pub fn read_variable(
    path: impl AsRef<Path>,
    variable: &str,
    options: &ReadOptions,
) -> NetCdfResult<TimeSeriesGrid> {
    let path = path.as_ref();
    let file = open(path)?;
    let var = file.variable(variable).ok_or_else(|| {
        NetCdfError::missing(format!("variable '{}' in {}", variable, path.display()))
    })?;

    let dims: Vec<(String, usize)> = var
        .dimensions()
        .iter()
        .map(|d| (d.name().to_string(), d.len()))
        .collect();
    let roles: Vec<AxisRole> = dims.iter().map(|(name, _)| classify(&file, name)).collect();
    let find = |role: AxisRole| roles.iter().position(|r| *r == role);

    let lat_axis = find(AxisRole::Latitude)
        .ok_or_else(|| NetCdfError::missing(format!("latitude dimension of '{}'", variable)))?;
    let lon_axis = find(AxisRole::Longitude)
        .ok_or_else(|| NetCdfError::missing(format!("longitude dimension of '{}'", variable)))?;
    let time_axis = find(AxisRole::Time);

    let level_axes: Vec<usize> = (0..roles.len()).filter(|&i| roles[i] == AxisRole::Level).collect();
    if level_axes.len() > 1 {
        return Err(NetCdfError::invalid(format!(
            "'{}' has more than one vertical dimension: {:?}",
            variable, dims
        )));
    }
    let level_axis = level_axes.first().copied();

    let lats = read_coord(&file, &dims[lat_axis].0, dims[lat_axis].1)?;
    let lons = read_coord(&file, &dims[lon_axis].0, dims[lon_axis].1)?;
    let times = match time_axis {
        Some(a) => {
            let (name, len) = &dims[a];
            let bounded = if options.upper_time_bounds {
                read_upper_time_bounds(&file, name, *len)?
            } else {
                None
            };
            match bounded {
                Some(times) => times,
                None => read_times(&file, name, *len)?,
            }
        }
        None => vec![fallback_time(&file)?],
    };
    let level_index = select_level(&file, level_axis.map(|a| &dims[a]), options.level)?;

    let raw = read_f64_values(&var)?;
    let total: usize = dims.iter().map(|(_, len)| len).product();
    if raw.len() != total {
        return Err(NetCdfError::invalid(format!(
            "'{}' returned {} values for shape {:?}",
            variable,
            raw.len(),
            dims
        )));
    }

    let mut strides = vec![1usize; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1].1;
    }

    let packing = Packing::from_variable(&var);
    let units = get_str_attr(&var, "units");
    let base = level_axis.map_or(0, |a| level_index * strides[a]);

    let mut steps = Vec::with_capacity(times.len());
    for t in 0..times.len() {
        let offset = base + time_axis.map_or(0, |a| t * strides[a]);
        let mut data = Vec::with_capacity(lats.len() * lons.len());
        for r in 0..lats.len() {
            let row_offset = offset + r * strides[lat_axis];
            for c in 0..lons.len() {
                data.push(packing.unpack(raw[row_offset + c * strides[lon_axis]]));
            }
        }
        let mut grid = Grid::new(lats.clone(), lons.clone(), data)?.with_name(variable);
        if let Some(units) = &units {
            grid = grid.with_units(units.clone());
        }
        steps.push(grid);
    }

    let mut series = TimeSeriesGrid::new(times, steps)?;
    if options.skip_leading > 0 {
        series = drop_leading(&series, options.skip_leading);
    }
    if let Some(bbox) = &options.bbox {
        if !series.is_empty() {
            series = series.subset(bbox)?;
        }
    }

    debug!(
        path = %path.display(),
        variable,
        steps = series.len(),
        shape = ?series.shape(),
        "Read variable"
    );

    Ok(series)
}

/// Read one variable from several files and join them into one series.
///
/// Files may be given in any order; overlaps are resolved by
/// [`grid_processor::concatenate`].
pub fn read_series<P: AsRef<Path>>(
    paths: &[P],
    variable: &str,
    options: &ReadOptions,
) -> NetCdfResult<TimeSeriesGrid> {
    let parts = paths
        .iter()
        .map(|p| read_variable(p, variable, options))
        .collect::<NetCdfResult<Vec<_>>>()?;

    let series = concatenate(parts)?;

    info!(
        variable,
        files = paths.len(),
        steps = series.len(),
        "Loaded series"
    );

    Ok(series)
}
