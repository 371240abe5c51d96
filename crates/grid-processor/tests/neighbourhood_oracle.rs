//! The sliding-window neighbourhood filter must agree exactly with the
//! brute-force reference on arbitrary grids.

use grid_processor::{
    neighbourhood_max, neighbourhood_max_naive, NeighbourhoodMax, SpatialFilter,
};
use hazard_common::NeighbourhoodSpec;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_utils::{random_axis, random_grid, regular_axis, regular_grid, spike_grid};

fn assert_same(a: &[f32], b: &[f32]) {
    assert_eq!(a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!(
            (x.is_nan() && y.is_nan()) || x == y,
            "cell {} differs: {} vs {}",
            i,
            x,
            y
        );
    }
}

#[test]
fn test_random_grids_match_naive() {
    let mut rng = StdRng::seed_from_u64(20150420);

    for case in 0..40 {
        let rows = rng.gen_range(1..14);
        let cols = rng.gen_range(1..14);
        let lats = random_axis(&mut rng, rows, case % 2 == 0);
        let lons = random_axis(&mut rng, cols, case % 3 == 0);
        let grid = random_grid(&mut rng, lats, lons, 0.15);
        let spec = NeighbourhoodSpec::new(rng.gen_range(0.05..1.5)).unwrap();

        let fast = neighbourhood_max(&grid, &spec).unwrap();
        let naive = neighbourhood_max_naive(&grid, &spec).unwrap();
        assert_same(fast.data(), naive.data());
    }
}

#[test]
fn test_regular_grid_radius_on_node_distance() {
    // Radius equal to an exact node spacing is inclusive.
    let mut rng = StdRng::seed_from_u64(3);
    let grid = random_grid(
        &mut rng,
        regular_axis(-34.0, 0.25, 11),
        regular_axis(150.5, 0.25, 11),
        0.0,
    );
    for radius in [0.25, 0.5, 0.75, 1.0] {
        let spec = NeighbourhoodSpec::new(radius).unwrap();
        let serial = NeighbourhoodMax::new(spec).parallel(false).apply(&grid).unwrap();
        let naive = neighbourhood_max_naive(&grid, &spec).unwrap();
        assert_same(serial.data(), naive.data());
    }
}

#[test]
fn test_spike_reaches_exactly_the_disk() {
    let (rows, cols, r0, c0) = (9, 9, 4, 4);
    let grid = spike_grid(rows, cols, r0, c0, 10.0);
    let spec = NeighbourhoodSpec::new(2.5).unwrap();
    let out = neighbourhood_max(&grid, &spec).unwrap();

    for r in 0..rows {
        for c in 0..cols {
            let dist = NeighbourhoodSpec::distance(r as f64 - r0 as f64, c as f64 - c0 as f64);
            let expected = if dist <= 2.5 { 10.0 } else { 0.0 };
            assert_eq!(out.get(r, c), Some(expected), "cell ({}, {})", r, c);
        }
    }
}

#[test]
fn test_five_by_five_scenario() {
    #[rustfmt::skip]
    let grid = regular_grid(5, 5, vec![
        0.0, 0.0, 0.0,  0.0, 0.0,
        0.0, 0.0, 0.0,  0.0, 0.0,
        0.0, 0.0, 10.0, 0.0, 0.0,
        0.0, 0.0, 0.0,  0.0, 0.0,
        0.0, 0.0, 0.0,  0.0, 0.0,
    ]);
    let spec = NeighbourhoodSpec::new(1.5).unwrap();
    let out = neighbourhood_max(&grid, &spec).unwrap();

    #[rustfmt::skip]
    let expected = vec![
        0.0, 0.0,  0.0,  0.0,  0.0,
        0.0, 10.0, 10.0, 10.0, 0.0,
        0.0, 10.0, 10.0, 10.0, 0.0,
        0.0, 10.0, 10.0, 10.0, 0.0,
        0.0, 0.0,  0.0,  0.0,  0.0,
    ];
    assert_eq!(out.data(), expected.as_slice());
}

#[test]
fn test_output_dominates_input() {
    let mut rng = StdRng::seed_from_u64(11);
    let lats = random_axis(&mut rng, 12, true);
    let lons = random_axis(&mut rng, 15, false);
    let grid = random_grid(&mut rng, lats, lons, 0.0);
    let out = neighbourhood_max(&grid, &NeighbourhoodSpec::default()).unwrap();

    for (o, i) in out.data().iter().zip(grid.data()) {
        assert!(o >= i);
    }
    assert_eq!(out.lats(), grid.lats());
    assert_eq!(out.lons(), grid.lons());
}
