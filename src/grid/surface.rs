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

//! Sub-module responsible for extracting the near-surface
//! layer from variables with a vertical dimension.

use super::{AxisRole, Coordinate, GriddedVariable, Topology};
use crate::{
    errors::{GridError, SurfaceError},
    Float,
};
use log::debug;
use ndarray::Axis;

/// Direction of increasing vertical coordinate values.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Positive {
    Up,
    Down,
}

impl Positive {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "up" => Some(Positive::Up),
            "down" => Some(Positive::Down),
            _ => None,
        }
    }
}

/// Returns the variable with the vertical dimension removed,
/// keeping only the layer closest to the sea surface.
///
/// Variables without vertical dimension are returned unchanged,
/// so applying this function twice gives the same result as applying it once.
pub fn extract_surface(
    var: &GriddedVariable,
    topology: Topology,
) -> Result<GriddedVariable, SurfaceError> {
    let horizontal = var.horizontal_axes();

    if horizontal.len() != topology.horizontal_ndim() {
        return Err(GridError::Classification(format!(
            "{:?} grid of {} spans {} horizontal axes",
            topology,
            var.name(),
            horizontal.len()
        ))
        .into());
    }

    let vertical: Vec<usize> = (1..var.ndim())
        .filter(|axis| !horizontal.contains(axis))
        .collect();

    let vertical_axis = match vertical.as_slice() {
        [] => {
            debug!("Variable {} has no vertical dimension", var.name());
            return Ok(var.clone());
        }
        [axis] => *axis,
        _ => {
            return Err(SurfaceError::TooManyDimensions {
                name: var.name().to_string(),
                extra: vertical.len(),
            })
        }
    };

    let z = var
        .z()
        .ok_or_else(|| SurfaceError::NoVerticalCoordinate(var.name().to_string()))?;

    if !z.dims.contains(&vertical_axis) {
        return Err(SurfaceError::VerticalAxis(var.name().to_string()));
    }

    let idx = surface_index(var.name(), z, vertical_axis, var.shape()[vertical_axis])?;

    debug!(
        "Surface of {} found at index {} along axis {}",
        var.name(),
        idx,
        vertical_axis
    );

    let data = var.data().index_axis(Axis(vertical_axis), idx).to_owned();

    let coords: Vec<Coordinate> = var
        .coordinates()
        .iter()
        .filter(|coord| coord.role != AxisRole::Z && !coord.dims.contains(&vertical_axis))
        .map(|coord| {
            let mut coord = coord.clone();
            for dim in coord.dims.iter_mut() {
                if *dim > vertical_axis {
                    *dim -= 1;
                }
            }
            coord
        })
        .collect();

    Ok(var.rebuild(data, coords, var.attributes().clone())?)
}

/// Finds the index of the surface layer from the vertical
/// coordinate values and its `positive` attribute.
///
/// For 2D vertical coordinates (eg. terrain-following) only one
/// representative profile is used: the one along the coordinate axis
/// mapped to `vertical_axis` of the data, taken at the first position
/// of the other axis. This is an approximation, the surface index
/// is not tracked per column.
pub fn surface_index(
    name: &str,
    z: &Coordinate,
    vertical_axis: usize,
    levels: usize,
) -> Result<usize, SurfaceError> {
    let positive = z
        .attribute_str("positive")
        .ok_or_else(|| SurfaceError::MissingPositive(name.to_string()))?;

    let positive = Positive::parse(positive).ok_or_else(|| SurfaceError::UnknownPositive {
        name: name.to_string(),
        value: positive.to_string(),
    })?;

    let profile: Vec<Float> = match z.ndim() {
        1 => z.values.iter().copied().collect(),
        2 => {
            let along = z
                .dims
                .iter()
                .position(|&dim| dim == vertical_axis)
                .ok_or_else(|| SurfaceError::VerticalAxis(name.to_string()))?;

            z.values.index_axis(Axis(1 - along), 0).iter().copied().collect()
        }
        _ => return Err(SurfaceError::VerticalAxis(name.to_string())),
    };

    if profile.len() != levels {
        return Err(SurfaceError::VerticalAxis(name.to_string()));
    }

    let extreme = profile
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .fold(None, |best: Option<(usize, Float)>, (i, &v)| match best {
            None => Some((i, v)),
            Some((_, b)) => {
                let better = match positive {
                    Positive::Up => v > b,
                    Positive::Down => v < b,
                };
                if better {
                    Some((i, v))
                } else {
                    best
                }
            }
        });

    extreme
        .map(|(i, _)| i)
        .ok_or_else(|| SurfaceError::VerticalAxis(name.to_string()))
}
