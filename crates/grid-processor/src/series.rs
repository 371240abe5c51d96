//! Cleaning and joining of multi-file time series.
//!
//! Model output arrives split across many files whose time ranges may
//! overlap by a step (each sub-hourly file repeats the previous file's last
//! time). These helpers turn such pieces into one strictly increasing series.

use tracing::{debug, warn};

use hazard_common::{Grid, HazardError, HazardResult, TimeSeriesGrid};

/// Join several series into one.
///
/// Parts are ordered by their first time. Each part keeps only the steps
/// strictly before the next part's first time, where the next part takes
/// over; the result has no duplicate times. Empty parts are skipped. All
/// parts must share coordinates.
///
/// Sub-hourly files repeat the previous file's last step as their first
/// step; [`drop_leading`] those first so the earlier file's value is kept.
pub fn concatenate(parts: Vec<TimeSeriesGrid>) -> HazardResult<TimeSeriesGrid> {
    let total_parts = parts.len();
    let mut parts: Vec<TimeSeriesGrid> = parts.into_iter().filter(|p| !p.is_empty()).collect();

    if parts.is_empty() {
        return Err(HazardError::empty_input(format!(
            "no time steps in {} series parts",
            total_parts
        )));
    }
    if parts.len() < total_parts {
        warn!(
            skipped = total_parts - parts.len(),
            "Skipping empty series parts"
        );
    }

    parts.sort_by_key(|p| p.first_time());

    let name = parts[0].name().map(str::to_string);
    let units = parts[0].units().map(str::to_string);

    let next_starts: Vec<_> = parts
        .iter()
        .skip(1)
        .map(|p| p.first_time())
        .chain(std::iter::once(None))
        .collect();

    let mut times = Vec::new();
    let mut steps: Vec<Grid> = Vec::new();

    for (part, next_start) in parts.into_iter().zip(next_starts) {
        let before = times.len();
        let (part_times, part_steps) = part.into_parts();
        for (t, g) in part_times.into_iter().zip(part_steps) {
            if next_start.is_some_and(|n| t >= n) {
                break;
            }
            if let Some(first) = steps.first() {
                first.ensure_same_coords(&g)?;
            }
            times.push(t);
            steps.push(g);
        }
        debug!(kept = times.len() - before, "Appended series part");
    }

    let mut series = TimeSeriesGrid::new(times, steps)?;
    if let Some(name) = name {
        series = series.with_name(name);
    }
    if let Some(units) = units {
        series = series.with_units(units);
    }
    Ok(series)
}

/// Remove the first `n` steps.
pub fn drop_leading(series: &TimeSeriesGrid, n: usize) -> TimeSeriesGrid {
    series.slice(n..series.len())
}

/// Convert a running accumulation into per-step increments.
///
/// Increment `j` is `acc[j] - acc[j-1]` and carries the time of step `j`,
/// so the output is one step shorter than the input.
pub fn accumulation_to_increments(series: &TimeSeriesGrid) -> HazardResult<TimeSeriesGrid> {
    if series.len() < 2 {
        return Err(HazardError::empty_input(format!(
            "need at least two accumulation steps, got {}",
            series.len()
        )));
    }

    let steps = series.steps();
    let grids = steps
        .windows(2)
        .map(|w| w[1].zip_with(&w[0], |cur, prev| cur - prev))
        .collect::<HazardResult<Vec<_>>>()?;

    let mut out = TimeSeriesGrid::new(series.times()[1..].to_vec(), grids)?;
    if let Some(name) = series.name() {
        out = out.with_name(name);
    }
    if let Some(units) = series.units() {
        out = out.with_units(units);
    }
    Ok(out)
}
