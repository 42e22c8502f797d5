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

//! Module containing constants used across the crate.

use crate::Float;

/// Number of nearest grid points checked when searching for water.
pub const DEFAULT_CANDIDATES: usize = 10;

/// Maximal planar distance (in degrees) between station
/// and accepted grid point.
pub const DEFAULT_MAX_DIST: Float = 0.08;

/// Minimal temporal standard deviation of a series
/// for its grid point to be considered water.
pub const DEFAULT_MIN_VAR: Float = 0.01;

/// Standard names of parametric (non-dimensional) vertical coordinates.
pub const NON_DIMENSIONAL_Z: [&str; 9] = [
    "atmosphere_hybrid_height_coordinate",
    "atmosphere_hybrid_sigma_pressure_coordinate",
    "atmosphere_sigma_coordinate",
    "atmosphere_sleve_coordinate",
    "ocean_s_coordinate",
    "ocean_s_coordinate_g1",
    "ocean_s_coordinate_g2",
    "ocean_sigma_coordinate",
    "ocean_sigma_z_coordinate",
];

/// Largest accepted date offset (in days) in the configuration.
pub const MAX_DATE_OFFSET: i64 = 36500;

/// Marker of unstructured mesh convention in `Conventions` attribute.
pub const UGRID_MARKER: &str = "UGRID";

/// Length (in samples) of the Lanczos tidal filter window.
pub const LOW_PASS_WINDOW: usize = 193;

/// Cut-off period (in hours) of the tidal filter.
pub const LOW_PASS_PERIOD: Float = 40.0;

/// Sample spacing (in seconds) assumed by the tidal filter.
pub const LOW_PASS_DT: Float = 360.0;
