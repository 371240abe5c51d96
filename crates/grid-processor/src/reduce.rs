//! Element-wise reduction operators.
//!
//! These are the building blocks of every temporal aggregation: event
//! maxima, event totals, rolling-window sums and daily maxima all fold a
//! stack of grids with one of these operators.

use serde::{Deserialize, Serialize};

/// Operator used to collapse several values into one.
///
/// NaN marks a missing cell and is skipped; a cell that is NaN in every
/// input stays NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReduceOp {
    /// Largest value - event maxima, peak gusts, peak rain rates
    #[default]
    Max,
    /// Sum of values - rainfall accumulation
    Sum,
    /// Smallest value
    Min,
    /// Arithmetic mean of valid values
    Mean,
}

impl ReduceOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Mean => "mean",
        }
    }
}

impl std::fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Running state for one output cell.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Accumulator {
    value: f64,
    count: u32,
}

impl Accumulator {
    pub(crate) const EMPTY: Accumulator = Accumulator {
        value: 0.0,
        count: 0,
    };

    #[inline]
    pub(crate) fn push(&mut self, op: ReduceOp, v: f32) {
        if v.is_nan() {
            return;
        }
        let v = v as f64;
        if self.count == 0 {
            self.value = v;
        } else {
            self.value = match op {
                ReduceOp::Max => self.value.max(v),
                ReduceOp::Min => self.value.min(v),
                ReduceOp::Sum | ReduceOp::Mean => self.value + v,
            };
        }
        self.count += 1;
    }

    #[inline]
    pub(crate) fn finish(&self, op: ReduceOp) -> f32 {
        if self.count == 0 {
            return f32::NAN;
        }
        match op {
            ReduceOp::Mean => (self.value / self.count as f64) as f32,
            _ => self.value as f32,
        }
    }
}

/// Reduce several equally sized value slices into one, cell by cell.
///
/// Sums are accumulated in `f64` so long rain series do not drift.
pub fn reduce_slices(slices: &[&[f32]], op: ReduceOp) -> Vec<f32> {
    let len = slices.first().map(|s| s.len()).unwrap_or(0);
    let mut acc = vec![Accumulator::EMPTY; len];

    for slice in slices {
        for (a, &v) in acc.iter_mut().zip(slice.iter()) {
            a.push(op, v);
        }
    }

    acc.iter().map(|a| a.finish(op)).collect()
}
