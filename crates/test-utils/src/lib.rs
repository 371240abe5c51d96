//! Shared test utilities for the hazard-grids workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic field generators (raw values and coordinate-tagged grids)
//! - Common test fixtures (domain boxes, reference times)
//! - Approximate equality assertions for floats and grids
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, regular_grid, fixtures};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro for cell-by-cell approximate equality of two value slices.
///
/// NaN only matches NaN.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_values_approx_eq;
///
/// assert_values_approx_eq!(out.data(), expected.data(), 1e-6);
/// ```
#[macro_export]
macro_rules! assert_values_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: &[f32] = &$left[..];
        let right: &[f32] = &$right[..];
        assert_eq!(left.len(), right.len(), "value counts differ");
        for (i, (&l, &r)) in left.iter().zip(right.iter()).enumerate() {
            if l.is_nan() || r.is_nan() {
                if !(l.is_nan() && r.is_nan()) {
                    panic!("assertion failed at index {}: `{:?}` vs `{:?}`", i, l, r);
                }
                continue;
            }
            let diff = ((l as f64) - (r as f64)).abs();
            if diff > ($epsilon as f64) {
                panic!(
                    "assertion failed at index {}: `{:?}` vs `{:?}`, diff `{:?}`",
                    i, l, r, diff
                );
            }
        }
    }};
}

/// Macro for approximate equality of two grids (coordinates and values).
#[macro_export]
macro_rules! assert_grid_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = &$left;
        let right = &$right;
        assert_eq!(left.shape(), right.shape(), "grid shapes differ");
        for (a, b) in left.lats().iter().zip(right.lats()) {
            $crate::assert_approx_eq!(*a, *b, 1e-9);
        }
        for (a, b) in left.lons().iter().zip(right.lons()) {
            $crate::assert_approx_eq!(*a, *b, 1e-9);
        }
        $crate::assert_values_approx_eq!(left.data(), right.data(), $epsilon);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_values_approx_eq_matches_nan() {
        let a = vec![1.0f32, f32::NAN];
        let b = vec![1.0000001f32, f32::NAN];
        assert_values_approx_eq!(a, b, 1e-5);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_values_approx_eq_nan_mismatch() {
        let a = vec![f32::NAN];
        let b = vec![0.0f32];
        assert_values_approx_eq!(a, b, 1e-5);
    }

    #[test]
    fn test_assert_grid_approx_eq() {
        let grid = regular_grid(3, 4, create_test_grid(4, 3));
        assert_grid_approx_eq!(grid, grid.clone(), 0.0);
    }
}
