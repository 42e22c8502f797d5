/*
Copyright 2021 Jakub Lewandowski

This file is part of Ocean Model Skill Assessment (OMSA).

Ocean Model Skill Assessment (OMSA) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Ocean Model Skill Assessment (OMSA) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Ocean Model Skill Assessment (OMSA). If not, see https://www.gnu.org/licenses/.
*/

//! This is a module for integration tests of the comparison core,
//! but with access to crate-private test helpers.
//!
//! Scenarios below go through several modules at once
//! (grid, matching and skill), so they are kept here
//! instead of being spread over unit tests.

use crate::{
    errors::{GridError, MatchError, SubsetError},
    grid::{
        extract_surface, inspect_topology,
        subset::subset_bbox,
        tests::{rectilinear, time_coordinate},
        Attributes, AxisRole, BoundingBox, Coordinate, GriddedVariable, Topology,
    },
    matching::{is_water, nearest_series, nearest_water, GridIndex, SearchParams, SpatialIndex},
    skill::{skill_score, Statistic},
    Float,
};
use float_cmp::approx_eq;
use ndarray::{arr2, Array, Array1, IxDyn};
use rustc_hash::FxHashSet;

const STEPS: usize = 8;
const LAND: (usize, usize) = (5, 5);

/// 10x10 grid at 1 degree resolution. Land point has a constant
/// series, water points oscillate with standard deviation of 0.5.
fn coastal_grid(is_land: impl Fn(usize, usize) -> bool) -> GriddedVariable {
    let axis: Vec<Float> = (0..10).map(|i| i as Float).collect();

    let data = Array::from_shape_fn(IxDyn(&[STEPS, 10, 10]), |idx| {
        if is_land(idx[1], idx[2]) {
            10.0
        } else if idx[0] % 2 == 0 {
            10.5
        } else {
            9.5
        }
    });

    let coords = vec![
        time_coordinate(STEPS),
        Coordinate::new("lat", AxisRole::Y, vec![1], Array1::from(axis.clone()).into_dyn()),
        Coordinate::new("lon", AxisRole::X, vec![2], Array1::from(axis).into_dyn()),
    ];

    GriddedVariable::new("sea_water_temperature", data, coords, Attributes::default()).unwrap()
}

fn indexed(var: &GriddedVariable) -> SpatialIndex {
    let topology = inspect_topology(var).unwrap();
    SpatialIndex::build(var, topology).unwrap()
}

#[test]
fn skips_land_point() {
    let var = coastal_grid(|row, col| (row, col) == LAND);
    let index = indexed(&var);

    let params = SearchParams {
        k: 4,
        max_dist: 1.5,
        min_var: 0.01,
    };

    let matched = nearest_water(&var, &index, (5.0, 5.0), &params).unwrap();

    assert_ne!(matched.index, GridIndex::Cell { row: 5, col: 5 });
    assert!(approx_eq!(f64, matched.distance, 1.0, epsilon = 1e-12));
    assert!(approx_eq!(f64, matched.series.std().unwrap(), 0.5, epsilon = 1e-12));
}

#[test]
fn finds_only_water_neighbour() {
    // everything is land except the eastern neighbour
    let var = coastal_grid(|row, col| (row, col) != (5, 6));
    let index = indexed(&var);

    let params = SearchParams {
        k: 10,
        max_dist: 1.5,
        min_var: 0.01,
    };

    let matched = nearest_water(&var, &index, (5.0, 5.0), &params).unwrap();

    assert_eq!(matched.index, GridIndex::Cell { row: 5, col: 6 });
    assert_eq!(matched.position, (6.0, 5.0));
    assert_eq!(matched.series.len(), STEPS);

    let too_strict = SearchParams {
        min_var: 1.0,
        ..params
    };
    assert!(matches!(
        nearest_water(&var, &index, (5.0, 5.0), &too_strict),
        Err(MatchError::NoWaterPoint { .. })
    ));
}

#[test]
fn no_data_far_away() {
    let var = coastal_grid(|_, _| false);
    let index = indexed(&var);

    let params = SearchParams {
        max_dist: 0.08,
        ..SearchParams::default()
    };

    assert!(matches!(
        nearest_water(&var, &index, (14.0, 5.0), &params),
        Err(MatchError::NoDataNearPoint { .. })
    ));
}

fn oscillating(step: usize, is_land: bool) -> Float {
    match (is_land, step % 2) {
        (true, _) => 10.0,
        (false, 0) => 10.5,
        (false, _) => 9.5,
    }
}

#[test]
fn skips_land_node_of_mesh() {
    let data = Array::from_shape_fn(IxDyn(&[STEPS, 3]), |idx| oscillating(idx[0], idx[1] == 0));

    let coords = vec![
        time_coordinate(STEPS),
        Coordinate::new("lon", AxisRole::X, vec![1], Array1::from(vec![0.0, 0.5, 2.0]).into_dyn()),
        Coordinate::new("lat", AxisRole::Y, vec![1], Array1::from(vec![0.0, 0.0, 0.0]).into_dyn()),
    ];
    let mut attributes = Attributes::default();
    attributes.insert("Conventions".to_string(), "CF-1.6, UGRID-0.9".into());
    let var = GriddedVariable::new("zeta", data, coords, attributes).unwrap();

    assert_eq!(inspect_topology(&var).unwrap(), Topology::Unstructured);
    let index = indexed(&var);

    let params = SearchParams {
        k: 3,
        max_dist: 1.0,
        min_var: 0.01,
    };

    let nearest = nearest_series(&var, &index, (0.0, 0.0), &params).unwrap();
    assert_eq!(nearest.index, GridIndex::Node(0));

    let matched = nearest_water(&var, &index, (0.0, 0.0), &params).unwrap();
    assert_eq!(matched.index, GridIndex::Node(1));
    assert!(approx_eq!(f64, matched.distance, 0.5, epsilon = 1e-12));
    assert!(approx_eq!(f64, matched.position.0, 0.5, epsilon = 1e-12));
    assert_eq!(matched.series.len(), STEPS);
}

#[test]
fn skips_land_cell_of_curvilinear_grid() {
    let data = Array::from_shape_fn(IxDyn(&[STEPS, 2, 3]), |idx| {
        oscillating(idx[0], (idx[1], idx[2]) == (1, 1))
    });

    let coords = vec![
        time_coordinate(STEPS),
        Coordinate::new(
            "lat_rho",
            AxisRole::Y,
            vec![1, 2],
            arr2(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]).into_dyn(),
        ),
        Coordinate::new(
            "lon_rho",
            AxisRole::X,
            vec![1, 2],
            arr2(&[[0.0, 1.0, 2.0], [0.1, 1.1, 2.1]]).into_dyn(),
        ),
    ];
    let var = GriddedVariable::new("temp", data, coords, Attributes::default()).unwrap();

    assert_eq!(inspect_topology(&var).unwrap(), Topology::Curvilinear);
    let index = indexed(&var);

    let params = SearchParams {
        k: 4,
        max_dist: 0.95,
        min_var: 0.01,
    };

    let nearest = nearest_series(&var, &index, (1.2, 1.0), &params).unwrap();
    assert_eq!(nearest.index, GridIndex::Cell { row: 1, col: 1 });

    let matched = nearest_water(&var, &index, (1.2, 1.0), &params).unwrap();
    assert_eq!(matched.index, GridIndex::Cell { row: 1, col: 2 });
    assert!(approx_eq!(f64, matched.distance, 0.9, epsilon = 1e-9));
    assert!(approx_eq!(f64, matched.position.0, 2.1, epsilon = 1e-9));
    assert!(approx_eq!(f64, matched.position.1, 1.0, epsilon = 1e-9));
}

#[test]
fn undecodable_model_time() {
    let var = coastal_grid(|_, _| false);

    // netCDF default fill value left in the last time step
    let mut times: Vec<Float> = (0..STEPS).map(|i| i as Float).collect();
    times[STEPS - 1] = 9.96921e36;
    let time = Coordinate::new("time", AxisRole::T, vec![0], Array1::from(times).into_dyn())
        .with_attribute("units", "hours since 2016-07-01 00:00:00");

    let coords: Vec<Coordinate> = var
        .coordinates()
        .iter()
        .map(|coord| match coord.role {
            AxisRole::T => time.clone(),
            _ => coord.clone(),
        })
        .collect();
    let var = var
        .rebuild(var.data().clone(), coords, var.attributes().clone())
        .unwrap();
    let index = indexed(&var);

    let params = SearchParams {
        k: 4,
        max_dist: 1.5,
        min_var: 0.01,
    };

    assert!(matches!(
        nearest_water(&var, &index, (5.0, 5.0), &params),
        Err(MatchError::Grid(GridError::TimeValue(_)))
    ));
}

#[test]
fn water_check_is_idempotent() {
    let values = [10.5, 9.5, 10.5, 9.5];

    assert_eq!(is_water(&values, 0.01), is_water(&values, 0.01));
    assert!(is_water(&values, 0.01));
    assert!(!is_water(&[10.0; 4], 0.01));
}

#[test]
fn indexes_every_rectilinear_point() {
    let lons = [-82.0, -81.5, -81.0, -80.5, -80.0];
    let lats = [24.0, 24.5, 25.0];
    let var = rectilinear(&lons, &lats, 3, |_, _| 1.0);

    let index = indexed(&var);
    assert_eq!(index.len(), lons.len() * lats.len());

    let cells: FxHashSet<GridIndex> = (0..index.len()).map(|flat| index.unravel(flat)).collect();
    assert_eq!(cells.len(), lons.len() * lats.len());

    for row in 0..lats.len() {
        for col in 0..lons.len() {
            assert!(cells.contains(&GridIndex::Cell { row, col }));
        }
    }
}

#[test]
fn surface_extraction_is_projection() {
    let data = Array::from_shape_fn(IxDyn(&[2, 3, 2, 2]), |idx| (idx[0] * 100 + idx[1]) as Float);

    let coords = vec![
        time_coordinate(2),
        Coordinate::new("depth", AxisRole::Z, vec![1], Array1::from(vec![0.0, 5.0, 10.0]).into_dyn())
            .with_attribute("positive", "down"),
        Coordinate::new("lat", AxisRole::Y, vec![2], Array1::from(vec![24.0, 25.0]).into_dyn()),
        Coordinate::new("lon", AxisRole::X, vec![3], Array1::from(vec![-82.0, -81.0]).into_dyn()),
    ];
    let var = GriddedVariable::new("temp", data, coords, Attributes::default()).unwrap();
    let topology = inspect_topology(&var).unwrap();
    assert_eq!(topology, Topology::Rectilinear);

    let once = extract_surface(&var, topology).unwrap();
    let twice = extract_surface(&once, topology).unwrap();

    assert_eq!(once.shape(), &[2, 2, 2]);
    assert!(once.z().is_none());
    assert_eq!(once.data(), twice.data());
    assert_eq!(once.data()[[1, 0, 0]], 100.0);
}

#[test]
fn skill_of_known_series() {
    let perfect = [1.0, 2.0, 3.0];
    assert_eq!(skill_score(&perfect, &perfect, Statistic::MeanBias, false), Some(0.0));

    let rmse = skill_score(&[3.0, -0.5, 2.0, 7.0], &[2.5, 0.0, 2.0, 8.0], Statistic::Rmse, false);
    assert!(approx_eq!(f64, rmse.unwrap(), 0.6124, epsilon = 1e-4));
}

#[test]
fn empty_bounding_box() {
    let var = coastal_grid(|_, _| false);
    let bbox = BoundingBox::new(100.0, 40.0, 110.0, 50.0).unwrap();

    assert!(matches!(
        subset_bbox(&var, &bbox),
        Err(SubsetError::EmptySelection)
    ));
}
