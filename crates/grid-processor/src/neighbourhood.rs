//! Neighbourhood spatial-maximum filter.
//!
//! Each output cell takes the maximum of the input over a fixed-radius disk
//! around it:
//!
//! ```text
//! N[i,j] = max { G[i',j'] : sqrt((lat_i - lat_i')² + (lon_j - lon_j')²) <= D }
//! ```
//!
//! Cells outside the disk are masked out before the maximum is taken and NaN
//! cells count as missing, so a disk holding only NaN yields NaN.
//!
//! Two implementations share this definition:
//!
//! - [`NaiveNeighbourhoodMax`] visits every cell for every output cell,
//!   O((rows·cols)²). It is the reference used to check the fast filter.
//! - [`NeighbourhoodMax`] works row pair by row pair. For a fixed pair of
//!   rows the admissible columns of output column `j` form a contiguous
//!   interval, and both interval ends move monotonically with `j` because
//!   the distance only grows with |dlon| along a monotonic axis. A
//!   monotonic-deque sliding maximum then gives every column's row maximum
//!   in O(cols). Output rows are independent and run in parallel on rayon.
//!
//! The two agree exactly: both evaluate the same distance predicate
//! ([`NeighbourhoodSpec::contains`]) on the same coordinate differences and
//! the maximum of a set does not depend on visiting order.

use std::collections::VecDeque;

use rayon::prelude::*;
use tracing::debug;

use hazard_common::{Grid, HazardError, HazardResult, NeighbourhoodSpec};

/// A spatial filter producing a grid of the same shape as its input.
pub trait SpatialFilter: Send + Sync {
    /// Apply the filter, returning a new grid with the input's coordinates.
    fn apply(&self, grid: &Grid) -> HazardResult<Grid>;

    /// Short name used in log output.
    fn name(&self) -> &'static str;
}

/// Brute-force neighbourhood maximum, kept as the correctness reference.
#[derive(Debug, Clone, Copy)]
pub struct NaiveNeighbourhoodMax {
    spec: NeighbourhoodSpec,
}

impl NaiveNeighbourhoodMax {
    pub fn new(spec: NeighbourhoodSpec) -> Self {
        Self { spec }
    }
}

impl SpatialFilter for NaiveNeighbourhoodMax {
    fn apply(&self, grid: &Grid) -> HazardResult<Grid> {
        ensure_non_empty(grid)?;

        let (rows, cols) = grid.shape();
        let lats = grid.lats();
        let lons = grid.lons();
        let data = grid.data();
        let mut out = vec![f32::NAN; rows * cols];

        for i in 0..rows {
            for j in 0..cols {
                let mut best = f32::NAN;
                for (i2, &lat2) in lats.iter().enumerate() {
                    let dlat = lats[i] - lat2;
                    for (j2, &lon2) in lons.iter().enumerate() {
                        if !self.spec.contains(dlat, lons[j] - lon2) {
                            continue;
                        }
                        best = nan_max(best, data[i2 * cols + j2]);
                    }
                }
                out[i * cols + j] = best;
            }
        }

        grid.with_data(out)
    }

    fn name(&self) -> &'static str {
        "naive_neighbourhood_max"
    }
}

/// Sliding-window neighbourhood maximum.
#[derive(Debug, Clone, Copy)]
pub struct NeighbourhoodMax {
    spec: NeighbourhoodSpec,
    parallel: bool,
}

impl NeighbourhoodMax {
    /// Create a filter; rows are processed in parallel by default.
    pub fn new(spec: NeighbourhoodSpec) -> Self {
        Self {
            spec,
            parallel: true,
        }
    }

    /// Enable or disable row-parallel execution.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Compute one output row.
    fn row(&self, grid: &Grid, i: usize, out: &mut [f32], scratch: &mut RowScratch) {
        let lats = grid.lats();
        out.fill(f32::NAN);

        for (i2, &lat2) in lats.iter().enumerate() {
            let dlat = lats[i] - lat2;
            // Column j always admits j2 == j (dlon == 0), so a row either
            // contributes to every output column or to none.
            if !self.spec.contains(dlat, 0.0) {
                continue;
            }
            scratch.sliding_row_max(&self.spec, dlat, grid.lons(), grid.row(i2));
            for (o, &m) in out.iter_mut().zip(scratch.row_max.iter()) {
                *o = nan_max(*o, m);
            }
        }
    }
}

impl SpatialFilter for NeighbourhoodMax {
    fn apply(&self, grid: &Grid) -> HazardResult<Grid> {
        ensure_non_empty(grid)?;

        let (rows, cols) = grid.shape();
        let mut out = vec![f32::NAN; rows * cols];

        if self.parallel {
            out.par_chunks_mut(cols)
                .enumerate()
                .for_each_init(
                    || RowScratch::new(cols),
                    |scratch, (i, row_out)| self.row(grid, i, row_out, scratch),
                );
        } else {
            let mut scratch = RowScratch::new(cols);
            for (i, row_out) in out.chunks_mut(cols).enumerate() {
                self.row(grid, i, row_out, &mut scratch);
            }
        }

        debug!(
            rows,
            cols,
            radius = self.spec.radius(),
            parallel = self.parallel,
            "Computed neighbourhood maximum"
        );

        grid.with_data(out)
    }

    fn name(&self) -> &'static str {
        "neighbourhood_max"
    }
}

/// Per-thread buffers for the sliding maximum.
struct RowScratch {
    deque: VecDeque<usize>,
    row_max: Vec<f32>,
}

impl RowScratch {
    fn new(cols: usize) -> Self {
        Self {
            deque: VecDeque::with_capacity(cols),
            row_max: vec![f32::NAN; cols],
        }
    }

    /// For every column `j`, the maximum of `values[j2]` over the columns
    /// `j2` with `(dlat, lons[j] - lons[j2])` inside the disk.
    fn sliding_row_max(
        &mut self,
        spec: &NeighbourhoodSpec,
        dlat: f64,
        lons: &[f64],
        values: &[f32],
    ) {
        let cols = lons.len();
        self.deque.clear();

        let mut lo = 0usize;
        // One past the last column pushed into the window.
        let mut hi = 0usize;

        for j in 0..cols {
            while !spec.contains(dlat, lons[j] - lons[lo]) {
                lo += 1;
            }
            while hi < cols && spec.contains(dlat, lons[j] - lons[hi]) {
                let v = values[hi];
                if !v.is_nan() {
                    while self.deque.back().is_some_and(|&b| values[b] <= v) {
                        self.deque.pop_back();
                    }
                    self.deque.push_back(hi);
                }
                hi += 1;
            }
            while self.deque.front().is_some_and(|&f| f < lo) {
                self.deque.pop_front();
            }
            self.row_max[j] = self
                .deque
                .front()
                .map_or(f32::NAN, |&f| values[f]);
        }
    }
}

/// Maximum that treats NaN as missing.
#[inline]
fn nan_max(a: f32, b: f32) -> f32 {
    if a.is_nan() || b > a {
        b
    } else {
        a
    }
}

fn ensure_non_empty(grid: &Grid) -> HazardResult<()> {
    if grid.is_empty() {
        return Err(HazardError::empty_input(
            "neighbourhood filter needs at least one grid cell",
        ));
    }
    Ok(())
}

/// Neighbourhood maximum using the sliding-window filter.
pub fn neighbourhood_max(grid: &Grid, spec: &NeighbourhoodSpec) -> HazardResult<Grid> {
    NeighbourhoodMax::new(*spec).apply(grid)
}

/// Neighbourhood maximum using the brute-force reference filter.
pub fn neighbourhood_max_naive(grid: &Grid, spec: &NeighbourhoodSpec) -> HazardResult<Grid> {
    NaiveNeighbourhoodMax::new(*spec).apply(grid)
}
