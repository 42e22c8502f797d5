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

//! Nearest-neighbour index over horizontal grid points.
//!
//! Every horizontal point of a variable gets a flat index, counted
//! in row-major order over the horizontal data axes. For rectilinear
//! grids this means the 1D coordinates are broadcast into a mesh,
//! so a grid with `|X|` longitudes and `|Y|` latitudes gives `|X|·|Y|` points.
//!
//! Distances are planar and expressed in degrees. That is only
//! reasonable for the small search radii used when matching stations.

use crate::{
    errors::MatchError,
    grid::{Coordinate, GriddedVariable, Topology},
    Float, LonLat,
};
use kd_tree::KdTree2;
use log::debug;
use ordered_float::OrderedFloat;
use std::fmt;

/// Position of a point in the native horizontal grid.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum GridIndex {
    /// Node of an unstructured mesh.
    Node(usize),
    /// Cell of a structured grid, in order of data axes.
    Cell { row: usize, col: usize },
}

impl fmt::Display for GridIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridIndex::Node(node) => write!(f, "{}", node),
            GridIndex::Cell { row, col } => write!(f, "{};{}", row, col),
        }
    }
}

/// Maps a flat index back to the native horizontal index.
pub fn unravel(flat: usize, topology: Topology, shape: &[usize]) -> GridIndex {
    match topology {
        Topology::Unstructured => GridIndex::Node(flat),
        Topology::Rectilinear | Topology::Curvilinear => {
            let cols = shape.get(1).copied().unwrap_or(1).max(1);

            GridIndex::Cell {
                row: flat / cols,
                col: flat % cols,
            }
        }
    }
}

/// Candidate point returned from the index.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Neighbour {
    pub flat: usize,
    pub distance: Float,
}

/// Converts longitude to the `[0, 360)` convention.
fn convert_to_east_longitudes(longitude: Float) -> Float {
    if longitude < 0.0 {
        return 360.0 + longitude;
    }

    longitude
}

/// Converts longitude to the `[-180, 180)` convention.
fn convert_to_signed_longitudes(longitude: Float) -> Float {
    if longitude >= 180.0 {
        return longitude - 360.0;
    }

    longitude
}

/// Immutable index of horizontal points of one variable.
pub struct SpatialIndex {
    tree: KdTree2<(usize, [Float; 2])>,
    points: usize,
    topology: Topology,
    shape: Vec<usize>,
    lons: Vec<Float>,
    lats: Vec<Float>,
    east_longitudes: bool,
}

impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("topology", &self.topology)
            .field("shape", &self.shape)
            .field("points", &self.points)
            .finish()
    }
}

impl SpatialIndex {
    /// Builds the index from X and Y coordinates of the variable.
    ///
    /// Points with non-finite coordinates (eg. masked cells of
    /// curvilinear grids) are left out of the index.
    pub fn build(var: &GriddedVariable, topology: Topology) -> Result<Self, MatchError> {
        let axes = var.horizontal_axes();
        let shape = var.horizontal_shape();
        let points_count: usize = shape.iter().product();

        let mut lons = Vec::with_capacity(points_count);
        let mut lats = Vec::with_capacity(points_count);

        for flat in 0..points_count {
            let position = multi_index(flat, &shape);

            lons.push(value_at(var.x(), &axes, &position));
            lats.push(value_at(var.y(), &axes, &position));
        }

        let east_longitudes = lons.iter().any(|&lon| lon > 180.0);

        let points: Vec<(usize, [Float; 2])> = lons
            .iter()
            .zip(lats.iter())
            .map(|(&lon, &lat)| [lon, lat])
            .enumerate()
            .filter(|(_, point)| point.iter().all(|v| v.is_finite()))
            .collect();

        if points.is_empty() {
            return Err(MatchError::EmptyIndex);
        }

        debug!(
            "Indexing {} of {} horizontal points of {}",
            points.len(),
            points_count,
            var.name()
        );

        let indexed = points.len();
        let tree = KdTree2::build_by_key(points, |item, k| OrderedFloat(item.1[k]));

        Ok(SpatialIndex {
            tree,
            points: indexed,
            topology,
            shape,
            lons,
            lats,
            east_longitudes,
        })
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points == 0
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Extent of the horizontal grid, in order of data axes.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flattened longitudes and latitudes of all horizontal points,
    /// including the ones left out of the index.
    pub fn mesh(&self) -> (&[Float], &[Float]) {
        (&self.lons, &self.lats)
    }

    pub fn position(&self, flat: usize) -> Option<LonLat<Float>> {
        Some((*self.lons.get(flat)?, *self.lats.get(flat)?))
    }

    pub fn unravel(&self, flat: usize) -> GridIndex {
        unravel(flat, self.topology, &self.shape)
    }

    /// Returns up to `k` indexed points nearest to the query,
    /// in increasing distance order.
    pub fn nearest(&self, lon: Float, lat: Float, k: usize) -> Vec<Neighbour> {
        let lon = if self.east_longitudes {
            convert_to_east_longitudes(lon)
        } else {
            convert_to_signed_longitudes(lon)
        };

        let mut neighbours: Vec<Neighbour> = self
            .tree
            .nearests_by(&[lon, lat], k, |item, k| item.1[k])
            .into_iter()
            .map(|found| Neighbour {
                flat: found.item.0,
                distance: found.squared_distance.sqrt(),
            })
            .collect();

        neighbours.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.flat.cmp(&b.flat))
        });

        neighbours
    }
}

/// Row-major multi-index of a flat position.
fn multi_index(flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut position = vec![0; shape.len()];
    let mut rest = flat;

    for (i, &extent) in shape.iter().enumerate().rev() {
        position[i] = rest % extent;
        rest /= extent;
    }

    position
}

/// Reads the coordinate value at a horizontal position, given in
/// order of `axes`. Out of range positions give NaN.
fn value_at(coord: &Coordinate, axes: &[usize], position: &[usize]) -> Float {
    let index: Option<Vec<usize>> = coord
        .dims
        .iter()
        .map(|dim| axes.iter().position(|axis| axis == dim).map(|i| position[i]))
        .collect();

    index
        .and_then(|index| coord.values.get(index.as_slice()).copied())
        .unwrap_or(Float::NAN)
}
