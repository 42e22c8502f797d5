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

//! Ocean Model Skill Assessment (OMSA) is a library and a batch tool
//! for comparing ocean model output with in-situ observations.
//!
//! For every observing station the model grid point representing the
//! station is found: nearest grid points are checked in increasing
//! distance order and the first one whose series is not flat (not land
//! or a dry cell) is accepted. Model series found this way are then
//! scored against the observations with simple skill statistics.
//!
//! Model variables can be stored on rectilinear, curvilinear or
//! unstructured grids, with or without the vertical dimension.
//! Before matching they are constrained to the region and time interval
//! of interest, converted to common units and reduced to the surface layer.
//!
//! **The tool is currently under development.**

pub mod comparison;
pub mod configuration;
pub mod constants;
pub mod errors;
pub mod grid;
pub mod input;
pub mod matching;
pub mod naming;
pub mod observation;
pub mod output;
pub mod skill;
pub mod timeseries;

#[cfg(test)]
mod super_tests;

use cap::Cap;
use std::alloc;

pub type Float = f64;

/// Convenience type to store lon-lat coordinates.
pub type LonLat<T> = (T, T);

/// Global allocator used by the tool.
///
/// Use of static global allocator allows for capping the memory to the limit set by user
/// in configuration file and in effect provide better [OOM error](https://en.wikipedia.org/wiki/Out_of_memory) handling.
#[global_allocator]
pub static ALLOCATOR: Cap<alloc::System> = Cap::new(alloc::System, usize::MAX);
