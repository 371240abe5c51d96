//! Temporal aggregation of gridded time series.
//!
//! - [`reduce_time`]: collapse a series (optionally within a time window)
//!   into one grid, e.g. the event maximum gust or the event rain total.
//! - [`rolling`]: full-window rolling reductions, e.g. 1-hour and 6-hour rain
//!   totals from 10-minute increments.
//! - [`aggregate_daily`]: one reduction per UTC calendar day.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use hazard_common::{day_start, Grid, HazardError, HazardResult, TimeSeriesGrid, TimeWindow};

use crate::reduce::{reduce_slices, ReduceOp};

/// Collapse a series along time with `op`.
///
/// With a window, only steps whose time lies in the closed interval are
/// used; the selected dates need not be contiguous and no gaps are filled.
/// Fails with `EmptyInput` when nothing is selected.
pub fn reduce_time(
    series: &TimeSeriesGrid,
    op: ReduceOp,
    window: Option<&TimeWindow>,
) -> HazardResult<Grid> {
    let selected: Vec<&Grid> = series
        .iter()
        .filter(|(t, _)| window.map_or(true, |w| w.contains(t)))
        .map(|(_, g)| g)
        .collect();

    if selected.is_empty() {
        return Err(match window {
            Some(w) => HazardError::empty_input(format!(
                "no time steps between {} and {} ({} steps available)",
                w.start,
                w.end,
                series.len()
            )),
            None => HazardError::empty_input("cannot reduce an empty time series"),
        });
    }

    debug!(
        op = %op,
        steps = selected.len(),
        of = series.len(),
        "Reducing along time"
    );

    let grid = reduce_grids(&selected, op)?;
    Ok(tag_like_series(grid, series))
}

/// Reduce a non-empty list of grids on one coordinate system.
pub fn reduce_grids(grids: &[&Grid], op: ReduceOp) -> HazardResult<Grid> {
    let first = grids
        .first()
        .ok_or_else(|| HazardError::empty_input("no grids to reduce"))?;

    for g in &grids[1..] {
        first.ensure_same_coords(g)?;
    }

    let slices: Vec<&[f32]> = grids.iter().map(|g| g.data()).collect();
    first.with_data(reduce_slices(&slices, op))
}

/// Rolling reduction over `window_steps` consecutive time steps.
///
/// Only full windows are emitted, so a series of length `L` yields
/// `L - W + 1` entries. Entry `k` reduces source steps `k..k + W`; it is
/// centred on source index `i = k + W / 2`, covering
/// `[i - floor(W/2), i + ceil(W/2) - 1]`, and carries the time of step `i`.
pub fn rolling(
    series: &TimeSeriesGrid,
    window_steps: usize,
    op: ReduceOp,
) -> HazardResult<TimeSeriesGrid> {
    if window_steps == 0 {
        return Err(HazardError::invalid_parameter(
            "window_steps",
            "rolling window must span at least one time step",
        ));
    }
    if series.len() < window_steps {
        return Err(HazardError::empty_input(format!(
            "series of {} steps has no full {}-step window",
            series.len(),
            window_steps
        )));
    }

    let half = window_steps / 2;
    let count = series.len() - window_steps + 1;
    let steps = series.steps();

    let mut times = Vec::with_capacity(count);
    let mut grids = Vec::with_capacity(count);

    for k in 0..count {
        let slices: Vec<&[f32]> = steps[k..k + window_steps].iter().map(|g| g.data()).collect();
        grids.push(steps[k].with_data(reduce_slices(&slices, op))?);
        times.push(series.times()[k + half]);
    }

    debug!(
        op = %op,
        window_steps,
        input_steps = series.len(),
        output_steps = count,
        "Computed rolling windows"
    );

    let out = TimeSeriesGrid::new(times, grids)?;
    Ok(tag_series_like(out, series))
}

/// Rolling reduction over a window given as a duration.
///
/// The step count is `duration / spacing`, where the spacing is taken from
/// the first two time steps. The duration must be a whole multiple of that
/// spacing.
pub fn rolling_duration(
    series: &TimeSeriesGrid,
    duration: Duration,
    op: ReduceOp,
) -> HazardResult<TimeSeriesGrid> {
    let window_steps = steps_for_duration(series.times(), duration)?;
    rolling(series, window_steps, op)
}

/// Number of time steps covering `duration` at the series' step spacing.
pub fn steps_for_duration(times: &[DateTime<Utc>], duration: Duration) -> HazardResult<usize> {
    if times.len() < 2 {
        return Err(HazardError::empty_input(
            "at least two time steps are needed to determine the step spacing",
        ));
    }

    let spacing = (times[1] - times[0]).num_seconds();
    let total = duration.num_seconds();

    if spacing <= 0 {
        return Err(HazardError::invalid_parameter(
            "time",
            "time steps must be at least one second apart",
        ));
    }

    if total <= 0 || total % spacing != 0 {
        return Err(HazardError::invalid_parameter(
            "window",
            format!(
                "{}s is not a positive multiple of the {}s step spacing",
                total, spacing
            ),
        ));
    }

    Ok((total / spacing) as usize)
}

/// Reduce each UTC calendar day separately.
///
/// Output times are midnight UTC of each day present in the input.
pub fn aggregate_daily(series: &TimeSeriesGrid, op: ReduceOp) -> HazardResult<TimeSeriesGrid> {
    if series.is_empty() {
        return Err(HazardError::empty_input("cannot aggregate an empty time series"));
    }

    let mut times = Vec::new();
    let mut grids = Vec::new();
    let mut current: Option<DateTime<Utc>> = None;
    let mut group: Vec<&Grid> = Vec::new();

    for (t, g) in series.iter() {
        let day = day_start(t);
        if current.is_some_and(|c| c != day) {
            grids.push(reduce_grids(&group, op)?);
            times.extend(current);
            group.clear();
        }
        current = Some(day);
        group.push(g);
    }
    grids.push(reduce_grids(&group, op)?);
    times.extend(current);

    debug!(op = %op, days = times.len(), "Aggregated by day");

    let out = TimeSeriesGrid::new(times, grids)?;
    Ok(tag_series_like(out, series))
}

fn tag_like_series(mut grid: Grid, series: &TimeSeriesGrid) -> Grid {
    if let Some(name) = series.name() {
        grid = grid.with_name(name);
    }
    if let Some(units) = series.units() {
        grid = grid.with_units(units);
    }
    grid
}

fn tag_series_like(mut out: TimeSeriesGrid, series: &TimeSeriesGrid) -> TimeSeriesGrid {
    if let Some(name) = series.name() {
        out = out.with_name(name);
    }
    if let Some(units) = series.units() {
        out = out.with_units(units);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn series(values: &[[f32; 4]], step_minutes: i64) -> TimeSeriesGrid {
        let t0 = Utc.with_ymd_and_hms(2015, 4, 20, 22, 0, 0).unwrap();
        let pairs = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let grid = Grid::new(vec![0.0, 1.0], vec![0.0, 1.0], v.to_vec()).unwrap();
                (t0 + Duration::minutes(step_minutes * i as i64), grid)
            })
            .collect();
        TimeSeriesGrid::from_pairs(pairs).unwrap()
    }

    #[test]
    fn test_reduce_time_single_step_is_identity() {
        let s = series(&[[1.5, -2.0, f32::NAN, 7.25]], 10);
        let out = reduce_time(&s, ReduceOp::Max, None).unwrap();
        assert_eq!(out.data()[0], 1.5);
        assert_eq!(out.data()[1], -2.0);
        assert!(out.data()[2].is_nan());
        assert_eq!(out.data()[3], 7.25);
    }

    #[test]
    fn test_reduce_time_max_and_sum() {
        let s = series(&[[1.0, 2.0, 3.0, 4.0], [4.0, 0.0, 3.0, 1.0]], 10);
        assert_eq!(
            reduce_time(&s, ReduceOp::Max, None).unwrap().data(),
            &[4.0, 2.0, 3.0, 4.0]
        );
        assert_eq!(
            reduce_time(&s, ReduceOp::Sum, None).unwrap().data(),
            &[5.0, 2.0, 6.0, 5.0]
        );
    }

    #[test]
    fn test_reduce_time_empty_window() {
        let s = series(&[[1.0; 4], [2.0; 4]], 10);
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let window = TimeWindow::new(t, t + Duration::hours(1)).unwrap();
        assert!(matches!(
            reduce_time(&s, ReduceOp::Sum, Some(&window)),
            Err(HazardError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_reduce_time_window_is_closed() {
        let s = series(&[[1.0; 4], [2.0; 4], [4.0; 4], [8.0; 4]], 10);
        let window = TimeWindow::new(s.times()[1], s.times()[2]).unwrap();
        let out = reduce_time(&s, ReduceOp::Sum, Some(&window)).unwrap();
        assert_eq!(out.data(), &[6.0; 4]);
    }

    #[test]
    fn test_rolling_length_and_times() {
        let s = series(&[[1.0; 4], [2.0; 4], [3.0; 4], [4.0; 4], [5.0; 4]], 10);
        let out = rolling(&s, 2, ReduceOp::Sum).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out.step(0).unwrap().data(), &[3.0; 4]);
        assert_eq!(out.step(3).unwrap().data(), &[9.0; 4]);
        // W = 2: entry k is centred on source k + 1
        assert_eq!(out.times()[0], s.times()[1]);
    }

    #[test]
    fn test_rolling_rejects_bad_windows() {
        let s = series(&[[1.0; 4], [2.0; 4]], 10);
        assert!(matches!(
            rolling(&s, 0, ReduceOp::Sum),
            Err(HazardError::InvalidParameter { .. })
        ));
        assert!(matches!(
            rolling(&s, 3, ReduceOp::Sum),
            Err(HazardError::EmptyInput(_))
        ));
        assert_eq!(rolling(&s, 2, ReduceOp::Sum).unwrap().len(), 1);
    }

    #[test]
    fn test_rolling_duration_one_hour_of_ten_minute_data() {
        let values: Vec<[f32; 4]> = (0..12).map(|i| [i as f32; 4]).collect();
        let s = series(&values, 10);
        let out = rolling_duration(&s, Duration::hours(1), ReduceOp::Sum).unwrap();
        assert_eq!(out.len(), 12 - 6 + 1);
        // First window sums 0..=5
        assert_eq!(out.step(0).unwrap().data()[0], 15.0);
        assert_eq!(out.times()[0], s.times()[3]);

        assert!(rolling_duration(&s, Duration::minutes(25), ReduceOp::Sum).is_err());
    }

    #[test]
    fn test_aggregate_daily() {
        // 22:00, 23:00 on day one, then 00:00 .. 02:00 on day two
        let s = series(
            &[[1.0; 4], [5.0; 4], [2.0; 4], [9.0; 4], [3.0; 4]],
            60,
        );
        let out = aggregate_daily(&s, ReduceOp::Max).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(
            out.times()[0],
            Utc.with_ymd_and_hms(2015, 4, 20, 0, 0, 0).unwrap()
        );
        assert_eq!(out.step(0).unwrap().data(), &[5.0; 4]);
        assert_eq!(out.step(1).unwrap().data(), &[9.0; 4]);
    }
}
