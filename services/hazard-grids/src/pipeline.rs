//! Hazard product pipelines.
//!
//! Each pipeline loads its inputs, computes every product in memory and
//! returns the files to write. Nothing is written until all products of a
//! run have been computed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use tracing::{info, warn};

use grid_processor::{
    accumulation_to_increments, aggregate_daily, concatenate, reduce_time, regrid_series_with_tolerance,
    rolling_duration, wind_speed_series, ReduceOp, SpatialFilter,
};
use hazard_common::{Grid, HazardError, TimeSeriesGrid, COORD_TOLERANCE};
use netcdf_parser::{read_series, read_variable, write_fields, NetCdfError, OutputField, ReadOptions};

use crate::config::HazardConfig;
use crate::sources::find_files;

/// Extra margin, in degrees, when loading a field that is regridded onto
/// another, so that staggered grids still cover the target cells.
pub const REGRID_MARGIN_DEG: f64 = 0.5;

/// One output file and the fields it holds.
#[derive(Debug, Clone)]
pub struct Product {
    pub path: PathBuf,
    pub fields: Vec<OutputField>,
}

impl Product {
    fn new(dir: &Path, file_name: String, fields: Vec<OutputField>) -> Self {
        Self {
            path: dir.join(file_name),
            fields,
        }
    }

    /// A file holding a single 2-D hazard grid named by its product code.
    fn code(dir: &Path, file_name: String, code: &str, long_name: &str, grid: Grid) -> Self {
        Self::new(
            dir,
            file_name,
            vec![OutputField::grid(code, grid).with_long_name(long_name)],
        )
    }
}

/// Write every product, creating the output directory as needed.
pub fn write_products(products: &[Product]) -> Result<()> {
    for product in products {
        write_fields(&product.path, &product.fields)
            .with_context(|| format!("Failed to write {}", product.path.display()))?;
        info!(path = %product.path.display(), "Data written");
    }
    Ok(())
}

/// Kind of the processing error behind a failed run, for the `kind` log
/// field. Errors that did not come from grid processing or NetCDF access
/// report `"Error"`.
pub fn failure_kind(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<HazardError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<NetCdfError>() {
            return match e {
                NetCdfError::Grid(inner) => inner.kind(),
                _ => "NetCdfError",
            };
        }
    }
    "Error"
}

fn base_options(config: &HazardConfig) -> ReadOptions {
    ReadOptions {
        bbox: config.bbox,
        ..ReadOptions::default()
    }
}

/// Options for a field that will be regridded: the bbox grows by
/// [`REGRID_MARGIN_DEG`].
fn padded(options: &ReadOptions) -> ReadOptions {
    ReadOptions {
        bbox: options.bbox.map(|b| b.expand(REGRID_MARGIN_DEG)),
        ..options.clone()
    }
}

fn load_series(paths: &[PathBuf], variable: &str, options: &ReadOptions) -> Result<TimeSeriesGrid> {
    info!(variable, files = paths.len(), "Loading series");
    read_series(paths, variable, options).with_context(|| format!("Failed to load {}", variable))
}

/// Wind speed on the grid of `u`, regridding `v` onto it when needed.
fn wind_speed_on_u(
    config: &HazardConfig,
    u: &TimeSeriesGrid,
    v: &TimeSeriesGrid,
) -> Result<TimeSeriesGrid> {
    let (Some(u_grid), Some(v_grid)) = (u.steps().first(), v.steps().first()) else {
        anyhow::bail!("wind components have no time steps");
    };

    let v_on_u = if v_grid.same_coords(u_grid, COORD_TOLERANCE) {
        v.clone()
    } else {
        info!("Regridding v onto u (so they align in space)");
        regrid_series_with_tolerance(u_grid, v, config.processor.coord_tolerance)
            .context("Failed to regrid v onto u")?
    };

    info!("Calculating wind speed");
    wind_speed_series(u, &v_on_u).context("Wind components do not align")
}

/// Daily and event maxima of 10 m wind speed and gust.
///
/// Writes `max_speed_{label}.nc` (`max_windspeed`, `event_max_windspeed`)
/// and `max_gust_{label}.nc` (`max_gust`, `event_max_gust` and optionally
/// `neighbourhood_max_gust`).
pub fn wind_products(config: &HazardConfig) -> Result<Vec<Product>> {
    let wind = &config.wind;
    let options = ReadOptions {
        skip_leading: wind.skip_leading,
        ..base_options(config)
    };

    let u_files = find_files(config, &wind.u_variable)?;
    let v_files = find_files(config, &wind.v_variable)?;
    let gust_files = find_files(config, &wind.gust_variable)?;

    let u = load_series(&u_files, &wind.u_variable, &options)?;
    let v = load_series(&v_files, &wind.v_variable, &padded(&options))?;
    let gust = load_series(&gust_files, &wind.gust_variable, &options)?;

    let speed = wind_speed_on_u(config, &u, &v)?;

    info!("Calculating daily and event maxima");
    let daily_speed = aggregate_daily(&speed, ReduceOp::Max)?;
    let event_speed = reduce_time(&daily_speed, ReduceOp::Max, None)?;
    let daily_gust = aggregate_daily(&gust, ReduceOp::Max)?;
    let event_gust = reduce_time(&daily_gust, ReduceOp::Max, None)?;

    let mut gust_fields = vec![
        OutputField::series("max_gust", daily_gust).with_long_name("Daily maximum 10 m wind gust"),
        OutputField::grid("event_max_gust", event_gust.clone())
            .with_long_name("Event maximum 10 m wind gust"),
    ];
    if wind.neighbourhood {
        info!(radius = config.processor.neighbourhood_radius_deg, "Calculating neighbourhood maximum gust");
        let filter = config.processor.neighbourhood_filter()?;
        gust_fields.push(
            OutputField::grid("neighbourhood_max_gust", filter.apply(&event_gust)?)
                .with_long_name("Neighbourhood event maximum 10 m wind gust"),
        );
    }

    let label = config.run_label();
    Ok(vec![
        Product::new(
            &config.output_dir,
            format!("max_speed_{}.nc", label),
            vec![
                OutputField::series("max_windspeed", daily_speed)
                    .with_long_name("Daily maximum 10 m wind speed"),
                OutputField::grid("event_max_windspeed", event_speed)
                    .with_long_name("Event maximum 10 m wind speed"),
            ],
        ),
        Product::new(&config.output_dir, format!("max_gust_{}.nc", label), gust_fields),
    ])
}

/// Rain increments from running accumulation files.
///
/// Each file is differenced on its own, which drops its first step, and
/// the increments are then joined. Steps are stamped with the end of their
/// time bounds when the files carry them.
pub fn load_rain_increments(config: &HazardConfig) -> Result<TimeSeriesGrid> {
    let variable = &config.rain.variable;
    let files = find_files(config, variable)?;
    let options = base_options(config).upper_time_bounds();

    let mut parts = Vec::with_capacity(files.len());
    for path in &files {
        let accumulation = read_variable(path, variable, &options)
            .with_context(|| format!("Failed to load {} from {}", variable, path.display()))?;
        if accumulation.len() < 2 {
            warn!(path = %path.display(), steps = accumulation.len(), "Skipping file with too few steps to difference");
            continue;
        }
        parts.push(accumulation_to_increments(&accumulation)?);
    }

    let rain = concatenate(parts).with_context(|| format!("No usable {} data", variable))?;
    info!(steps = rain.len(), "Built rain increment series");
    Ok(rain)
}

/// PIRR, PTEA, P1RR, P6RR and N1RR from rain accumulations.
pub fn rain_products(config: &HazardConfig) -> Result<Vec<Product>> {
    let rain_config = &config.rain;
    let rain = load_rain_increments(config)?;

    info!("Calculating rain hazard grids");
    let pirr = reduce_time(&rain, ReduceOp::Max, None)?;

    let window = config.rain_event_window()?;
    let ptea = reduce_time(&rain, ReduceOp::Sum, window.as_ref())
        .context("No rain steps inside the event window")?;

    let short = rolling_duration(&rain, Duration::minutes(rain_config.short_window_minutes), ReduceOp::Sum)
        .context("Failed to compute short rolling totals")?;
    let p1rr = reduce_time(&short, ReduceOp::Max, None)?;

    let long = rolling_duration(&rain, Duration::minutes(rain_config.long_window_minutes), ReduceOp::Sum)
        .context("Failed to compute long rolling totals")?;
    let p6rr = reduce_time(&long, ReduceOp::Max, None)?;

    let n1rr = config.processor.neighbourhood_filter()?.apply(&p1rr)?;

    let dir = &config.output_dir;
    let label = config.run_label();
    let name = |code: &str| format!("{}_{}.nc", code, label);

    Ok(vec![
        Product::new(
            dir,
            format!("rain_{}.nc", label),
            vec![OutputField::series("rain", rain).with_long_name("Rainfall per time step")],
        ),
        Product::code(dir, name("PIRR"), "PIRR", "Point event maximum instantaneous rain rate", pirr),
        Product::code(dir, name("PTEA"), "PTEA", "Point total event rainfall accumulation", ptea),
        Product::code(dir, name("P1RR"), "P1RR", "Point event maximum 1 hour rain rate", p1rr),
        Product::code(dir, name("P6RR"), "P6RR", "Point event maximum 6 hour rain rate", p6rr),
        Product::code(dir, name("N1RR"), "N1RR", "Neighbourhood event maximum 1 hour rain rate", n1rr),
    ])
}

/// PSMW, PSWG, NSWG and (with a pressure-level file) PGWS from a single
/// forecast.
pub fn forecast_products(config: &HazardConfig) -> Result<Vec<Product>> {
    let fc = &config.forecast;
    let surface = fc
        .surface_file
        .as_ref()
        .context("The forecast products need a surface file")?;
    let options = base_options(config);

    let read = |path: &Path, variable: &str, options: &ReadOptions| {
        read_variable(path, variable, options)
            .with_context(|| format!("Failed to load {} from {}", variable, path.display()))
    };

    info!(path = %surface.display(), "Loading surface fields");
    let u10 = read(surface.as_path(), &fc.u10_variable, &options)?;
    let v10 = read(surface.as_path(), &fc.v10_variable, &padded(&options))?;
    let gust = read(surface.as_path(), &fc.gust_variable, &options)?;

    let ws10 = wind_speed_on_u(config, &u10, &v10)?;
    let psmw = reduce_time(&ws10, ReduceOp::Max, None)?;
    let pswg = reduce_time(&gust, ReduceOp::Max, None)?;
    let nswg = config.processor.neighbourhood_filter()?.apply(&pswg)?;

    let dir = &config.output_dir;
    let name = |code: &str| format!("{}_{}.nc", fc.output_prefix, code);

    let mut products = Vec::with_capacity(4);

    match &fc.pressure_file {
        Some(pressure) => {
            info!(path = %pressure.display(), level = fc.level, "Loading pressure-level winds");
            let level_options = options.clone().with_level(fc.level);
            let u = read(pressure.as_path(), &fc.u_level_variable, &level_options)?;
            let v = read(pressure.as_path(), &fc.v_level_variable, &padded(&level_options))?;
            let pgws = reduce_time(&wind_speed_on_u(config, &u, &v)?, ReduceOp::Max, None)?;
            products.push(Product::code(
                dir,
                name("PGWS"),
                "PGWS",
                "Point gradient wind speed event maximum",
                pgws,
            ));
        }
        None => warn!("No pressure-level file given; skipping PGWS"),
    }

    products.push(Product::code(dir, name("PSMW"), "PSMW", "Point surface mean wind speed event maximum", psmw));
    products.push(Product::code(dir, name("PSWG"), "PSWG", "Point surface wind gust event maximum", pswg));
    products.push(Product::code(
        dir,
        name("NSWG"),
        "NSWG",
        "Neighbourhood surface wind gust event maximum",
        nswg,
    ));

    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazard_common::BoundingBox;

    #[test]
    fn test_padded_grows_bbox_only() {
        let options = ReadOptions::new()
            .with_bbox(BoundingBox::new(150.5, -34.0, 153.0, -31.5))
            .with_level(900.0)
            .skip_leading(1);
        let grown = padded(&options);
        assert_eq!(grown.bbox, Some(BoundingBox::new(150.0, -34.5, 153.5, -31.0)));
        assert_eq!(grown.level, Some(900.0));
        assert_eq!(grown.skip_leading, 1);

        assert!(padded(&ReadOptions::new()).bbox.is_none());
    }

    #[test]
    fn test_failure_kind() {
        let err = anyhow::Error::from(HazardError::empty_input("no steps")).context("PTEA");
        assert_eq!(failure_kind(&err), "EmptyInputError");

        let err = anyhow::Error::from(NetCdfError::from(HazardError::shape_mismatch("3x3", "2x2")))
            .context("Failed to load uwnd10m");
        assert_eq!(failure_kind(&err), "ShapeMismatchError");

        let err = anyhow::Error::from(NetCdfError::missing("variable 'x'"));
        assert_eq!(failure_kind(&err), "NetCdfError");

        assert_eq!(failure_kind(&anyhow::anyhow!("No input files found")), "Error");
    }

    #[test]
    fn test_forecast_requires_surface_file() {
        let config = HazardConfig::default();
        assert!(forecast_products(&config).is_err());
    }

    #[test]
    fn test_product_code_names_field() {
        let grid = Grid::filled(vec![0.0], vec![0.0], 1.0).unwrap();
        let product = Product::code(Path::new("out"), "op_PSWG.nc".to_string(), "PSWG", "gust", grid);
        assert_eq!(product.path, PathBuf::from("out/op_PSWG.nc"));
        assert_eq!(product.fields[0].name, "PSWG");
        assert_eq!(product.fields[0].long_name, "gust");
    }
}
