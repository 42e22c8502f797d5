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

//! Classification of horizontal grid layout.
//!
//! Model families do not agree on how they store horizontal
//! coordinates, so every operation that needs to walk the
//! horizontal grid matches on [`Topology`] instead of inspecting
//! names or attributes on its own.

use super::GriddedVariable;
use crate::errors::GridError;
use log::debug;

/// Layout of the horizontal grid of a variable.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Topology {
    /// 1D longitude and latitude spanning two different data axes.
    Rectilinear,
    /// 2D longitude and latitude spanning the same two data axes.
    Curvilinear,
    /// 1D longitude and latitude paired along one (node) data axis.
    Unstructured,
}

impl Topology {
    /// Number of data axes taken by the horizontal grid.
    pub fn horizontal_ndim(&self) -> usize {
        match self {
            Topology::Rectilinear | Topology::Curvilinear => 2,
            Topology::Unstructured => 1,
        }
    }
}

/// Determines the horizontal topology from dimensionality
/// of X and Y coordinates, corroborated with the UGRID
/// convention marker when it is present.
pub fn inspect_topology(var: &GriddedVariable) -> Result<Topology, GridError> {
    let x = var.x();
    let y = var.y();
    let ugrid = var.declares_ugrid();

    let topology = match (x.ndim(), y.ndim()) {
        (1, 1) if x.dims == y.dims => Topology::Unstructured,
        (1, 1) => Topology::Rectilinear,
        (2, 2) if x.dims == y.dims => Topology::Curvilinear,
        (x_ndim, y_ndim) => {
            return Err(GridError::Classification(format!(
                "cannot deal with {}D {} on axes {:?} and {}D {} on axes {:?}",
                x_ndim, x.name, x.dims, y_ndim, y.name, y.dims
            )));
        }
    };

    // only node-based layouts may carry the UGRID marker
    if ugrid && topology != Topology::Unstructured {
        return Err(GridError::Classification(format!(
            "{} declares UGRID but its {} and {} form a {:?} grid",
            var.name(),
            x.name,
            y.name,
            topology
        )));
    }

    if x.dims.contains(&0) || y.dims.contains(&0) {
        return Err(GridError::Classification(format!(
            "horizontal coordinates of {} span the time axis",
            var.name()
        )));
    }

    debug!("Variable {} classified as {:?}", var.name(), topology);

    Ok(topology)
}
