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

//! Resolution of station positions to model grid points
//! that represent open water.
//!
//! Grid points nearest to the station are checked in increasing
//! distance order and the first one whose series varies in time
//! is accepted. Flat series usually come from land points or dry
//! cells of wetting-and-drying models that were not masked.

use super::index::{GridIndex, Neighbour, SpatialIndex};
use crate::{
    constants::{DEFAULT_CANDIDATES, DEFAULT_MAX_DIST, DEFAULT_MIN_VAR},
    errors::MatchError,
    grid::GriddedVariable,
    timeseries::{self, TimeSeries},
    Float, LonLat,
};
use chrono::NaiveDateTime;
use log::debug;
use ndarray::{ArrayViewD, Axis};
use serde::Deserialize;
use std::vec;

/// Parameters of the nearest water point search.
#[derive(Copy, Clone, PartialEq, Debug, Deserialize)]
pub struct SearchParams {
    /// Number of nearest points to consider.
    #[serde(default = "SearchParams::default_k")]
    pub k: usize,

    /// Maximal distance (in degrees) of accepted points.
    #[serde(default = "SearchParams::default_max_dist")]
    pub max_dist: Float,

    /// Minimal standard deviation of a water series.
    #[serde(default = "SearchParams::default_min_var")]
    pub min_var: Float,
}

impl SearchParams {
    fn default_k() -> usize {
        DEFAULT_CANDIDATES
    }

    fn default_max_dist() -> Float {
        DEFAULT_MAX_DIST
    }

    fn default_min_var() -> Float {
        DEFAULT_MIN_VAR
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            k: SearchParams::default_k(),
            max_dist: SearchParams::default_max_dist(),
            min_var: SearchParams::default_min_var(),
        }
    }
}

/// Model series found for a station.
#[derive(Clone, PartialEq, Debug)]
pub struct MatchedSeries {
    pub index: GridIndex,
    pub distance: Float,
    pub position: LonLat<Float>,
    pub series: TimeSeries,
}

/// Heuristic check if the series comes from a water point:
/// its standard deviation over valid values exceeds `min_var`.
/// A series without valid values is never water.
pub fn is_water(series: &[Float], min_var: Float) -> bool {
    let valid: Vec<Float> = series.iter().copied().filter(|v| v.is_finite()).collect();

    match timeseries::std(&valid) {
        Some(std) => std > min_var,
        None => false,
    }
}

/// Lazy sequence of model series at grid points near the query,
/// in increasing distance order. Cloning it restarts the sequence
/// from the current position.
///
/// A point that cannot be read from the variable yields an error.
#[derive(Clone, Debug)]
pub struct Candidates<'a> {
    var: &'a GriddedVariable,
    index: &'a SpatialIndex,
    times: Vec<NaiveDateTime>,
    neighbours: vec::IntoIter<Neighbour>,
}

impl<'a> Candidates<'a> {
    /// Number of candidates not yet visited.
    pub fn remaining(&self) -> usize {
        self.neighbours.len()
    }

    fn series(&self, neighbour: Neighbour) -> Result<MatchedSeries, MatchError> {
        let index = self.index.unravel(neighbour.flat);
        let position = self
            .index
            .position(neighbour.flat)
            .ok_or(MatchError::OutOfGrid(index))?;

        let values = series_at(self.var, index)?;
        let series = TimeSeries::new(self.times.clone(), values)?;

        Ok(MatchedSeries {
            index,
            distance: neighbour.distance,
            position,
            series,
        })
    }
}

impl<'a> Iterator for Candidates<'a> {
    type Item = Result<MatchedSeries, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let neighbour = self.neighbours.next()?;

        Some(self.series(neighbour))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.neighbours.len();
        (remaining, Some(remaining))
    }
}

/// Queries the index for up to `k` nearest points and keeps
/// only the ones within `max_dist` of the query.
pub fn candidates<'a>(
    var: &'a GriddedVariable,
    index: &'a SpatialIndex,
    query: LonLat<Float>,
    params: &SearchParams,
) -> Result<Candidates<'a>, MatchError> {
    let (lon, lat) = query;

    if index.is_empty() {
        return Err(MatchError::EmptyIndex);
    }

    check_surface(var)?;

    let neighbours: Vec<Neighbour> = index
        .nearest(lon, lat, params.k)
        .into_iter()
        .filter(|n| n.distance <= params.max_dist)
        .collect();

    if neighbours.is_empty() {
        return Err(MatchError::NoDataNearPoint {
            lon,
            lat,
            max_dist: params.max_dist,
        });
    }

    debug!(
        "Found {} candidates near ({}, {}) in {}",
        neighbours.len(),
        lon,
        lat,
        var.name()
    );

    Ok(Candidates {
        var,
        index,
        times: var.times()?,
        neighbours: neighbours.into_iter(),
    })
}

/// Returns the series at the grid point nearest to the query,
/// without checking if it is water.
pub fn nearest_series(
    var: &GriddedVariable,
    index: &SpatialIndex,
    query: LonLat<Float>,
    params: &SearchParams,
) -> Result<MatchedSeries, MatchError> {
    let (lon, lat) = query;

    candidates(var, index, query, params)?
        .next()
        .ok_or(MatchError::NoDataNearPoint {
            lon,
            lat,
            max_dist: params.max_dist,
        })?
}

/// Returns the series at the nearest grid point that is water.
pub fn nearest_water(
    var: &GriddedVariable,
    index: &SpatialIndex,
    query: LonLat<Float>,
    params: &SearchParams,
) -> Result<MatchedSeries, MatchError> {
    let (lon, lat) = query;
    let found = candidates(var, index, query, params)?;
    let count = found.remaining();

    for candidate in found {
        let matched = candidate?;

        if is_water(matched.series.values(), params.min_var) {
            return Ok(matched);
        }

        debug!("Point {} of {} is not water", matched.index, var.name());
    }

    Err(MatchError::NoWaterPoint {
        lon,
        lat,
        candidates: count,
    })
}

/// Checks that only time is left after removing horizontal axes.
fn check_surface(var: &GriddedVariable) -> Result<(), MatchError> {
    let horizontal = var.horizontal_axes().len();

    if var.ndim() != horizontal + 1 {
        return Err(MatchError::NotSurface(var.name().to_string()));
    }

    Ok(())
}

/// Extracts the full time series at the grid point,
/// with invalid values replaced by NaN.
pub fn series_at(var: &GriddedVariable, index: GridIndex) -> Result<Vec<Float>, MatchError> {
    let axes = var.horizontal_axes();

    let mut selection: Vec<(usize, usize)> = match (index, axes.as_slice()) {
        (GridIndex::Node(node), [axis]) => vec![(*axis, node)],
        (GridIndex::Cell { row, col }, [row_axis, col_axis]) => {
            vec![(*row_axis, row), (*col_axis, col)]
        }
        _ => return Err(MatchError::OutOfGrid(index)),
    };

    // from the highest axis so lower axes keep their numbers
    selection.sort_unstable_by(|a, b| b.0.cmp(&a.0));

    let mut view: ArrayViewD<Float> = var.data().view();
    for (axis, position) in selection {
        if position >= view.shape()[axis] {
            return Err(MatchError::OutOfGrid(index));
        }
        view = view.index_axis_move(Axis(axis), position);
    }

    if view.ndim() != 1 {
        return Err(MatchError::NotSurface(var.name().to_string()));
    }

    Ok(view
        .iter()
        .map(|&v| if var.is_valid_value(v) { v } else { Float::NAN })
        .collect())
}
