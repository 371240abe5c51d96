//! Writing hazard fields and reading them (and model-style files) back.

use std::path::Path;

use chrono::{Duration, TimeZone, Utc};
use hazard_common::{BoundingBox, Grid};
use netcdf_parser::{
    read_series, read_variable, write_fields, write_series, NetCdfError, OutputField, ReadOptions,
};
use test_utils::{assert_values_approx_eq, event_start, make_series, scratch_dir};

fn gust_grid(values: Vec<f32>) -> Grid {
    Grid::new(vec![-34.0, -33.5, -33.0], vec![151.0, 151.5], values)
        .unwrap()
        .with_units("m s-1")
}

/// Model-style file: packed shorts on (time, pressure, lat, lon).
fn write_model_file(path: &Path) {
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("time", 2).unwrap();
    file.add_dimension("pressure", 2).unwrap();
    file.add_dimension("lat", 3).unwrap();
    file.add_dimension("lon", 2).unwrap();

    {
        let mut var = file.add_variable::<f64>("time", &["time"]).unwrap();
        var.put_attribute("units", "hours since 2015-04-20 00:00:00").unwrap();
        var.put_values(&[0.0, 1.0], ..).unwrap();
    }
    {
        let mut var = file.add_variable::<f32>("pressure", &["pressure"]).unwrap();
        var.put_attribute("units", "hPa").unwrap();
        var.put_values(&[1000.0f32, 900.0], ..).unwrap();
    }
    {
        let mut var = file.add_variable::<f32>("lat", &["lat"]).unwrap();
        var.put_attribute("units", "degrees_north").unwrap();
        var.put_values(&[-34.0f32, -33.5, -33.0], ..).unwrap();
    }
    {
        let mut var = file.add_variable::<f32>("lon", &["lon"]).unwrap();
        var.put_attribute("units", "degrees_east").unwrap();
        var.put_values(&[151.0f32, 151.5], ..).unwrap();
    }

    let mut raw = Vec::new();
    for t in 0..2i16 {
        for p in 0..2i16 {
            for r in 0..3i16 {
                for c in 0..2i16 {
                    raw.push(t * 1000 + p * 100 + r * 10 + c);
                }
            }
        }
    }
    // time 1, 900 hPa, row 2, col 1
    raw[23] = -32767;

    let mut var = file
        .add_variable::<i16>("wndgust10m", &["time", "pressure", "lat", "lon"])
        .unwrap();
    var.put_attribute("_FillValue", -32767i16).unwrap();
    var.put_attribute("scale_factor", 0.1f32).unwrap();
    var.put_attribute("add_offset", 0.0f32).unwrap();
    var.put_attribute("units", "m s-1").unwrap();
    var.put_values(&raw, ..).unwrap();
}

#[test]
fn test_series_and_grid_round_trip() {
    let dir = scratch_dir();
    let path = dir.path().join("out").join("gust.nc");

    let series = make_series(
        event_start(),
        Duration::hours(1),
        vec![
            gust_grid(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            gust_grid(vec![7.0, f32::NAN, 9.0, 10.0, 11.0, 12.0]),
        ],
    );
    let max = gust_grid(vec![7.0, 2.0, 9.0, 10.0, 11.0, 12.0]);

    write_fields(
        &path,
        &[
            OutputField::series("gust", series.clone()).with_long_name("Wind gust"),
            OutputField::grid("max_gust", max.clone()).with_long_name("Maximum wind gust"),
        ],
    )
    .unwrap();

    let read = read_variable(&path, "gust", &ReadOptions::new()).unwrap();
    assert_eq!(read.times(), series.times());
    assert_eq!(read.units(), Some("m s-1"));
    for (a, b) in read.steps().iter().zip(series.steps()) {
        assert_eq!(a.lats(), b.lats());
        assert_eq!(a.lons(), b.lons());
        assert_values_approx_eq!(a.data(), b.data(), 0.0);
    }

    let read_max = read_variable(&path, "max_gust", &ReadOptions::new()).unwrap();
    assert_eq!(read_max.len(), 1);
    assert_eq!(read_max.first_time(), Some(event_start()));
    assert_values_approx_eq!(read_max.steps()[0].data(), max.data(), 0.0);
}

#[test]
fn test_packed_model_file_with_levels() {
    let dir = scratch_dir();
    let path = dir.path().join("model.nc");
    write_model_file(&path);

    let series = read_variable(&path, "wndgust10m", &ReadOptions::new().with_level(900.0)).unwrap();
    let t0 = Utc.with_ymd_and_hms(2015, 4, 20, 0, 0, 0).unwrap();
    assert_eq!(series.times(), &[t0, t0 + Duration::hours(1)]);
    assert_eq!(series.shape(), Some((3, 2)));

    let expected_t0: Vec<f32> = [100.0, 101.0, 110.0, 111.0, 120.0, 121.0]
        .iter()
        .map(|v| v * 0.1)
        .collect();
    assert_values_approx_eq!(series.steps()[0].data(), expected_t0, 1e-3);

    let second = series.steps()[1].data();
    assert!((second[0] - 110.0).abs() < 1e-3);
    assert!(second[5].is_nan());
}

#[test]
fn test_level_selection_errors() {
    let dir = scratch_dir();
    let path = dir.path().join("model.nc");
    write_model_file(&path);

    assert!(matches!(
        read_variable(&path, "wndgust10m", &ReadOptions::new()),
        Err(NetCdfError::InvalidFormat(_))
    ));
    assert!(matches!(
        read_variable(&path, "wndgust10m", &ReadOptions::new().with_level(850.0)),
        Err(NetCdfError::MissingData(_))
    ));
    assert!(matches!(
        read_variable(&path, "not_there", &ReadOptions::new()),
        Err(NetCdfError::MissingData(_))
    ));
    assert!(matches!(
        read_variable(dir.path().join("absent.nc"), "wndgust10m", &ReadOptions::new()),
        Err(NetCdfError::MissingData(_))
    ));
}

#[test]
fn test_bbox_subset_on_read() {
    let dir = scratch_dir();
    let path = dir.path().join("model.nc");
    write_model_file(&path);

    let options = ReadOptions::new()
        .with_level(1000.0)
        .with_bbox(BoundingBox::new(150.0, -33.6, 151.2, -32.0));
    let series = read_variable(&path, "wndgust10m", &options).unwrap();

    assert_eq!(series.shape(), Some((2, 1)));
    assert_values_approx_eq!(series.steps()[0].data(), vec![1.0f32, 2.0], 1e-3);
}

#[test]
fn test_read_series_drops_repeated_first_step() {
    let dir = scratch_dir();
    let a_path = dir.path().join("a.nc");
    let b_path = dir.path().join("b.nc");
    let step = Duration::minutes(30);

    let a = make_series(
        event_start(),
        step,
        vec![gust_grid(vec![1.0; 6]), gust_grid(vec![2.0; 6]), gust_grid(vec![3.0; 6])],
    );
    // Starts with a's last time
    let b = make_series(
        event_start() + Duration::hours(1),
        step,
        vec![gust_grid(vec![99.0; 6]), gust_grid(vec![4.0; 6])],
    );
    write_series(&a_path, "gust", "Wind gust", &a).unwrap();
    write_series(&b_path, "gust", "Wind gust", &b).unwrap();

    // Reversed file order must not matter.
    let joined = read_series(&[&b_path, &a_path], "gust", &ReadOptions::new().skip_leading(1)).unwrap();
    let firsts: Vec<f32> = joined.steps().iter().map(|g| g.data()[0]).collect();
    assert_eq!(firsts, vec![2.0, 3.0, 4.0]);
    assert_eq!(joined.first_time(), Some(event_start() + step));
}

/// Accumulation file whose time points sit mid-interval, with bounds.
fn write_bounded_accumulation(path: &Path, with_bounds: bool) {
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("time", 2).unwrap();
    file.add_dimension("bnds", 2).unwrap();
    file.add_dimension("latitude", 1).unwrap();
    file.add_dimension("longitude", 1).unwrap();

    {
        let mut var = file.add_variable::<f64>("time", &["time"]).unwrap();
        var.put_attribute("units", "minutes since 2015-04-20 00:00:00").unwrap();
        if with_bounds {
            var.put_attribute("bounds", "time_bnds").unwrap();
        }
        var.put_values(&[5.0, 15.0], ..).unwrap();
    }
    {
        let mut var = file.add_variable::<f64>("time_bnds", &["time", "bnds"]).unwrap();
        var.put_values(&[0.0, 10.0, 10.0, 20.0], ..).unwrap();
    }
    {
        let mut var = file.add_variable::<f64>("latitude", &["latitude"]).unwrap();
        var.put_values(&[-33.9], ..).unwrap();
    }
    {
        let mut var = file.add_variable::<f64>("longitude", &["longitude"]).unwrap();
        var.put_values(&[151.2], ..).unwrap();
    }

    let mut var = file
        .add_variable::<f32>("accum_prcp", &["time", "latitude", "longitude"])
        .unwrap();
    var.put_values(&[1.0f32, 3.0], ..).unwrap();
}

#[test]
fn test_upper_time_bounds() {
    let dir = scratch_dir();
    let t0 = Utc.with_ymd_and_hms(2015, 4, 20, 0, 0, 0).unwrap();

    let bounded = dir.path().join("bounded.nc");
    write_bounded_accumulation(&bounded, true);

    let points = read_variable(&bounded, "accum_prcp", &ReadOptions::new()).unwrap();
    assert_eq!(points.times(), &[t0 + Duration::minutes(5), t0 + Duration::minutes(15)]);

    let ends = read_variable(&bounded, "accum_prcp", &ReadOptions::new().upper_time_bounds()).unwrap();
    assert_eq!(ends.times(), &[t0 + Duration::minutes(10), t0 + Duration::minutes(20)]);
    assert_values_approx_eq!(ends.steps()[1].data(), [3.0], 0.0);

    // Without a bounds attribute the point times are kept
    let plain = dir.path().join("plain.nc");
    write_bounded_accumulation(&plain, false);
    let read = read_variable(&plain, "accum_prcp", &ReadOptions::new().upper_time_bounds()).unwrap();
    assert_eq!(read.times(), points.times());
}

#[test]
fn test_fill_valued_time_is_an_error() {
    let dir = scratch_dir();
    let path = dir.path().join("unwritten.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_dimension("time", 1).unwrap();
        file.add_dimension("lat", 1).unwrap();
        file.add_dimension("lon", 1).unwrap();
        {
            let mut var = file.add_variable::<f64>("time", &["time"]).unwrap();
            var.put_attribute("units", "hours since 1970-01-01 00:00:00").unwrap();
            var.put_values(&[9.969_209_968_386_869e36], ..).unwrap();
        }
        {
            let mut var = file.add_variable::<f64>("lat", &["lat"]).unwrap();
            var.put_values(&[-33.9], ..).unwrap();
        }
        {
            let mut var = file.add_variable::<f64>("lon", &["lon"]).unwrap();
            var.put_values(&[151.2], ..).unwrap();
        }
        let mut var = file.add_variable::<f32>("gust", &["time", "lat", "lon"]).unwrap();
        var.put_values(&[10.0f32], ..).unwrap();
    }

    assert!(matches!(
        read_variable(&path, "gust", &ReadOptions::new()),
        Err(NetCdfError::Grid(_))
    ));
}
