//! Writing hazard fields to CF-1.6 NetCDF files.
//!
//! All fields written to one file share a latitude/longitude grid. Series
//! fields also share a `time` dimension, encoded as seconds since the epoch.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::info;

use hazard_common::{CfTimeUnits, Grid, HazardError, TimeSeriesGrid, COORD_TOLERANCE};

use crate::error::NetCdfResult;
use crate::native::silence_hdf5_errors;

/// netCDF default fill for `float` variables; NaN cells are written as this.
pub const FILL_VALUE: f32 = 9.969_209_968_386_869e36;

/// Payload of an output field.
#[derive(Debug, Clone)]
pub enum FieldData {
    /// A single `(latitude, longitude)` field.
    Grid(Grid),
    /// A `(time, latitude, longitude)` field.
    Series(TimeSeriesGrid),
}

/// A named variable to write.
#[derive(Debug, Clone)]
pub struct OutputField {
    pub name: String,
    pub long_name: String,
    pub units: Option<String>,
    pub data: FieldData,
}

impl OutputField {
    /// A 2-D field. Units default to the grid's own.
    pub fn grid(name: impl Into<String>, grid: Grid) -> Self {
        let name = name.into();
        Self {
            long_name: name.clone(),
            units: grid.units().map(str::to_string),
            name,
            data: FieldData::Grid(grid),
        }
    }

    /// A time-varying field. Units default to the series' own.
    pub fn series(name: impl Into<String>, series: TimeSeriesGrid) -> Self {
        let name = name.into();
        Self {
            long_name: name.clone(),
            units: series.units().map(str::to_string),
            name,
            data: FieldData::Series(series),
        }
    }

    pub fn with_long_name(mut self, long_name: impl Into<String>) -> Self {
        self.long_name = long_name.into();
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Grid whose coordinates this field is laid out on.
    fn coords(&self) -> Option<&Grid> {
        match &self.data {
            FieldData::Grid(grid) => Some(grid),
            FieldData::Series(series) => series.steps().first(),
        }
    }

    fn times(&self) -> Option<&[DateTime<Utc>]> {
        match &self.data {
            FieldData::Grid(_) => None,
            FieldData::Series(series) => Some(series.times()),
        }
    }

    /// Values in `(time, lat, lon)` order with NaN replaced by the fill value.
    fn flat_values(&self) -> Vec<f32> {
        let fill = |v: &f32| if v.is_nan() { FILL_VALUE } else { *v };
        match &self.data {
            FieldData::Grid(grid) => grid.data().iter().map(fill).collect(),
            FieldData::Series(series) => series
                .steps()
                .iter()
                .flat_map(|g| g.data().iter().map(fill))
                .collect(),
        }
    }
}

/// Check that the fields can share one file and return the common grid and
/// time axis.
fn layout(fields: &[OutputField]) -> NetCdfResult<(&Grid, Option<&[DateTime<Utc>]>)> {
    let first = fields
        .first()
        .ok_or_else(|| HazardError::empty_input("no fields to write"))?;
    let coords = first
        .coords()
        .ok_or_else(|| HazardError::empty_input(format!("field '{}' has no time steps", first.name)))?;

    let mut names = HashSet::new();
    let mut times: Option<&[DateTime<Utc>]> = None;

    for field in fields {
        if !names.insert(field.name.as_str()) {
            return Err(HazardError::invalid_parameter(
                "name",
                format!("field '{}' given twice", field.name),
            )
            .into());
        }

        let field_coords = field.coords().ok_or_else(|| {
            HazardError::empty_input(format!("field '{}' has no time steps", field.name))
        })?;
        if !field_coords.same_coords(coords, COORD_TOLERANCE) {
            return Err(HazardError::shape_mismatch(
                coords.describe_coords(),
                format!("{} for field '{}'", field_coords.describe_coords(), field.name),
            )
            .into());
        }

        if let Some(field_times) = field.times() {
            match times {
                None => times = Some(field_times),
                Some(t) if t != field_times => {
                    return Err(HazardError::shape_mismatch(
                        format!("{} time steps from {:?}", t.len(), t.first()),
                        format!(
                            "{} time steps from {:?} for field '{}'",
                            field_times.len(),
                            field_times.first(),
                            field.name
                        ),
                    )
                    .into());
                }
                Some(_) => {}
            }
        }
    }

    Ok((coords, times))
}

/// Write several fields to one NetCDF file, replacing any existing file.
///
/// Fails without creating the file if the fields do not share coordinates
/// and time steps.
pub fn write_fields(path: impl AsRef<Path>, fields: &[OutputField]) -> NetCdfResult<()> {
    let path = path.as_ref();
    let (coords, times) = layout(fields)?;

    silence_hdf5_errors();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = netcdf::create(path)?;
    file.add_attribute("Conventions", "CF-1.6")?;
    file.add_attribute("source", "hazard-grids")?;

    file.add_dimension("latitude", coords.rows())?;
    file.add_dimension("longitude", coords.cols())?;
    if let Some(times) = times {
        file.add_dimension("time", times.len())?;
    }

    {
        let mut var = file.add_variable::<f64>("latitude", &["latitude"])?;
        var.put_attribute("standard_name", "latitude")?;
        var.put_attribute("long_name", "latitude")?;
        var.put_attribute("units", "degrees_north")?;
        var.put_values(coords.lats(), ..)?;
    }
    {
        let mut var = file.add_variable::<f64>("longitude", &["longitude"])?;
        var.put_attribute("standard_name", "longitude")?;
        var.put_attribute("long_name", "longitude")?;
        var.put_attribute("units", "degrees_east")?;
        var.put_values(coords.lons(), ..)?;
    }
    if let Some(times) = times {
        let units = CfTimeUnits::epoch_seconds();
        let values: Vec<f64> = times.iter().map(|t| units.from_datetime(t)).collect();
        let mut var = file.add_variable::<f64>("time", &["time"])?;
        var.put_attribute("standard_name", "time")?;
        var.put_attribute("long_name", "time")?;
        var.put_attribute("units", units.to_cf_string().as_str())?;
        var.put_attribute("calendar", "standard")?;
        var.put_values(&values, ..)?;
    }

    for field in fields {
        let dims: &[&str] = match field.data {
            FieldData::Grid(_) => &["latitude", "longitude"],
            FieldData::Series(_) => &["time", "latitude", "longitude"],
        };
        let mut var = file.add_variable::<f32>(&field.name, dims)?;
        var.put_attribute("_FillValue", FILL_VALUE)?;
        var.put_attribute("long_name", field.long_name.as_str())?;
        if let Some(units) = &field.units {
            var.put_attribute("units", units.as_str())?;
        }
        var.put_values(&field.flat_values(), ..)?;
    }

    info!(
        path = %path.display(),
        fields = fields.len(),
        steps = times.map_or(0, |t| t.len()),
        "Wrote NetCDF file"
    );

    Ok(())
}

/// Write a single 2-D field.
pub fn write_grid(path: impl AsRef<Path>, name: &str, long_name: &str, grid: &Grid) -> NetCdfResult<()> {
    let field = OutputField::grid(name, grid.clone()).with_long_name(long_name);
    write_fields(path, &[field])
}

/// Write a single time-varying field.
pub fn write_series(
    path: impl AsRef<Path>,
    name: &str,
    long_name: &str,
    series: &TimeSeriesGrid,
) -> NetCdfResult<()> {
    let field = OutputField::series(name, series.clone()).with_long_name(long_name);
    write_fields(path, &[field])
}
