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

//! Module responsible for storing gridded model variables
//! and providing their metadata to the rest of the crate.
//!
//! A [`GriddedVariable`] is a plain value: a data array with time
//! along the first axis, coordinates tagged with their axis role
//! and attributes read from the source dataset. All operations
//! (subsetting, surface extraction) return new variables and
//! never modify the original one.

pub(crate) mod bisection;
pub mod subset;
pub mod surface;
pub mod time;
pub mod topology;
pub mod units;

pub use subset::BoundingBox;
pub use surface::extract_surface;
pub use topology::{inspect_topology, Topology};

use crate::constants::{NON_DIMENSIONAL_Z, UGRID_MARKER};
use crate::{errors::GridError, Float};
use chrono::NaiveDateTime;
use ndarray::ArrayD;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fmt;

/// Semantic role of a coordinate.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize)]
pub enum AxisRole {
    X,
    Y,
    Z,
    T,
}

impl fmt::Display for AxisRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AxisRole::X => "X",
            AxisRole::Y => "Y",
            AxisRole::Z => "Z",
            AxisRole::T => "T",
        };

        write!(f, "{}", name)
    }
}

/// Value of a variable or coordinate attribute.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Number(Float),
    Numbers(Vec<Float>),
    Text(String),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Float> {
        match self {
            AttrValue::Number(value) => Some(*value),
            AttrValue::Numbers(values) if values.len() == 1 => Some(values[0]),
            AttrValue::Text(text) => text.trim().parse().ok(),
            AttrValue::Numbers(_) => None,
        }
    }

    pub fn as_numbers(&self) -> Option<Vec<Float>> {
        match self {
            AttrValue::Number(value) => Some(vec![*value]),
            AttrValue::Numbers(values) => Some(values.clone()),
            AttrValue::Text(text) => text
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().ok())
                .collect(),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(text: &str) -> Self {
        AttrValue::Text(text.to_string())
    }
}

impl From<Float> for AttrValue {
    fn from(value: Float) -> Self {
        AttrValue::Number(value)
    }
}

impl From<Vec<Float>> for AttrValue {
    fn from(values: Vec<Float>) -> Self {
        AttrValue::Numbers(values)
    }
}

pub type Attributes = FxHashMap<String, AttrValue>;

/// Named coordinate array spanning some of the data axes.
#[derive(Clone, PartialEq, Debug)]
pub struct Coordinate {
    pub name: String,
    pub role: AxisRole,

    /// Data axes spanned by the coordinate, in the order
    /// of the coordinate's own axes.
    pub dims: Vec<usize>,
    pub values: ArrayD<Float>,
    pub attributes: Attributes,
}

impl Coordinate {
    pub fn new(name: &str, role: AxisRole, dims: Vec<usize>, values: ArrayD<Float>) -> Self {
        Coordinate {
            name: name.to_string(),
            role,
            dims,
            values,
            attributes: Attributes::default(),
        }
    }

    /// Builder-style helper to attach an attribute.
    pub fn with_attribute(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(AttrValue::as_str)
    }
}

/// Guesses the axis role of a coordinate loaded without
/// an explicit one, using CF conventions hints.
pub fn guess_axis_role(name: &str, attributes: &Attributes) -> Option<AxisRole> {
    let text = |key: &str| {
        attributes
            .get(key)
            .and_then(AttrValue::as_str)
            .map(|s| s.trim().to_lowercase())
    };

    if let Some(axis) = text("axis") {
        match axis.as_str() {
            "x" => return Some(AxisRole::X),
            "y" => return Some(AxisRole::Y),
            "z" => return Some(AxisRole::Z),
            "t" => return Some(AxisRole::T),
            _ => (),
        }
    }

    let standard_name = text("standard_name").unwrap_or_else(|| name.to_lowercase());

    match standard_name.as_str() {
        "longitude" | "lon" => return Some(AxisRole::X),
        "latitude" | "lat" => return Some(AxisRole::Y),
        "time" => return Some(AxisRole::T),
        "depth" | "altitude" | "height" => return Some(AxisRole::Z),
        _ => (),
    }

    if NON_DIMENSIONAL_Z.contains(&standard_name.as_str()) {
        return Some(AxisRole::Z);
    }

    if let Some(units) = text("units") {
        if units.starts_with("degrees_east") || units == "degree_east" {
            return Some(AxisRole::X);
        }
        if units.starts_with("degrees_north") || units == "degree_north" {
            return Some(AxisRole::Y);
        }
        if units.contains(" since ") {
            return Some(AxisRole::T);
        }
    }

    if attributes.contains_key("positive") {
        return Some(AxisRole::Z);
    }

    None
}

/// Multidimensional model variable with time along the first axis.
#[derive(Clone, Debug)]
pub struct GriddedVariable {
    name: String,
    data: ArrayD<Float>,
    coords: Vec<Coordinate>,
    attributes: Attributes,
    x_pos: usize,
    y_pos: usize,
    t_pos: usize,
    z_pos: Option<usize>,
}

impl GriddedVariable {
    /// Constructor checking that coordinates are consistent
    /// with the data array: exactly one coordinate per X, Y and T
    /// role, at most one Z, and each coordinate shaped like
    /// the data axes it spans.
    pub fn new(
        name: &str,
        data: ArrayD<Float>,
        coords: Vec<Coordinate>,
        attributes: Attributes,
    ) -> Result<Self, GridError> {
        let mut positions: FxHashMap<AxisRole, usize> = FxHashMap::default();

        for (pos, coord) in coords.iter().enumerate() {
            if positions.insert(coord.role, pos).is_some() {
                return Err(GridError::DuplicateAxis(coord.role));
            }

            check_coordinate_shape(coord, data.shape())?;
        }

        let x_pos = *positions
            .get(&AxisRole::X)
            .ok_or(GridError::MissingAxis(AxisRole::X))?;
        let y_pos = *positions
            .get(&AxisRole::Y)
            .ok_or(GridError::MissingAxis(AxisRole::Y))?;
        let t_pos = *positions
            .get(&AxisRole::T)
            .ok_or(GridError::MissingAxis(AxisRole::T))?;
        let z_pos = positions.get(&AxisRole::Z).copied();

        if coords[t_pos].dims != [0] {
            return Err(GridError::TimeAxis(coords[t_pos].name.clone()));
        }

        Ok(GriddedVariable {
            name: name.to_string(),
            data,
            coords,
            attributes,
            x_pos,
            y_pos,
            t_pos,
            z_pos,
        })
    }

    /// Creates a new variable with the same name and attributes
    /// but different data and coordinates.
    pub(crate) fn rebuild(
        &self,
        data: ArrayD<Float>,
        coords: Vec<Coordinate>,
        attributes: Attributes,
    ) -> Result<Self, GridError> {
        GriddedVariable::new(&self.name, data, coords, attributes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ArrayD<Float> {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coords
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn x(&self) -> &Coordinate {
        &self.coords[self.x_pos]
    }

    pub fn y(&self) -> &Coordinate {
        &self.coords[self.y_pos]
    }

    pub fn t(&self) -> &Coordinate {
        &self.coords[self.t_pos]
    }

    pub fn z(&self) -> Option<&Coordinate> {
        self.z_pos.map(|pos| &self.coords[pos])
    }

    pub fn coord(&self, role: AxisRole) -> Option<&Coordinate> {
        match role {
            AxisRole::X => Some(self.x()),
            AxisRole::Y => Some(self.y()),
            AxisRole::T => Some(self.t()),
            AxisRole::Z => self.z(),
        }
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(AttrValue::as_str)
    }

    pub fn units(&self) -> Option<&str> {
        self.attribute_str("units")
    }

    pub fn standard_name(&self) -> Option<&str> {
        self.attribute_str("standard_name")
    }

    /// Checks the `Conventions` attribute for the unstructured mesh marker.
    pub fn declares_ugrid(&self) -> bool {
        self.attribute_str("Conventions")
            .map(|conv| conv.to_uppercase().contains(UGRID_MARKER))
            .unwrap_or(false)
    }

    /// Sorted data axes spanned by the horizontal (X and Y) coordinates.
    pub fn horizontal_axes(&self) -> Vec<usize> {
        let mut axes: Vec<usize> = self.x().dims.clone();
        axes.extend(self.y().dims.iter().copied());
        axes.sort_unstable();
        axes.dedup();

        axes
    }

    /// Extent of the data along the horizontal axes.
    pub fn horizontal_shape(&self) -> Vec<usize> {
        self.horizontal_axes()
            .iter()
            .map(|&axis| self.data.shape()[axis])
            .collect()
    }

    /// Range of values considered valid, read from `valid_range`,
    /// `valid_min` and `valid_max` attributes.
    pub fn valid_range(&self) -> (Float, Float) {
        let mut range = (Float::NEG_INFINITY, Float::INFINITY);

        if let Some(values) = self.attributes.get("valid_range").and_then(AttrValue::as_numbers) {
            if values.len() == 2 {
                range = (values[0], values[1]);
            }
        }

        if let Some(min) = self.attributes.get("valid_min").and_then(AttrValue::as_number) {
            range.0 = min;
        }

        if let Some(max) = self.attributes.get("valid_max").and_then(AttrValue::as_number) {
            range.1 = max;
        }

        range
    }

    pub fn fill_value(&self) -> Option<Float> {
        self.attributes
            .get("_FillValue")
            .or_else(|| self.attributes.get("missing_value"))
            .and_then(AttrValue::as_number)
    }

    /// Checks if value is finite, inside the valid range
    /// and different from the fill value.
    pub fn is_valid_value(&self, value: Float) -> bool {
        let (min, max) = self.valid_range();
        let not_fill = match self.fill_value() {
            Some(fill) => value != fill,
            None => true,
        };

        value.is_finite() && not_fill && value >= min && value <= max
    }

    /// Returns a copy of the data with invalid values replaced by NaN.
    pub fn masked_data(&self) -> ArrayD<Float> {
        self.data
            .mapv(|v| if self.is_valid_value(v) { v } else { Float::NAN })
    }

    /// Decodes the time coordinate into datetimes.
    pub fn times(&self) -> Result<Vec<NaiveDateTime>, GridError> {
        let units = time::TimeUnits::from_coordinate(self.t())?;

        self.t().values.iter().map(|&v| units.decode(v)).collect()
    }

    /// Heuristic check if the variable comes from a model
    /// rather than from an observing platform.
    ///
    /// This check may return both false positives and false negatives.
    pub fn is_model(&self) -> bool {
        if self.t().name.to_lowercase().contains("forecast") {
            return true;
        }

        if self.declares_ugrid() {
            return true;
        }

        if let Some(z) = self.z() {
            let z_name = z
                .attribute_str("standard_name")
                .unwrap_or(z.name.as_str())
                .to_lowercase();

            if z_name.contains("ocean_") {
                return true;
            }
        }

        let is_grid = |key: &str| {
            self.attribute_str(key)
                .map(|v| v.to_uppercase() == "GRID")
                .unwrap_or(false)
        };

        if is_grid("cdm_data_type") || is_grid("featureType") {
            let source = self.attribute_str("source").unwrap_or("");
            return !source.contains("AVHRR");
        }

        false
    }
}

fn check_coordinate_shape(coord: &Coordinate, data_shape: &[usize]) -> Result<(), GridError> {
    if coord.dims.iter().any(|&dim| dim >= data_shape.len()) {
        return Err(GridError::AxisOutOfRange(coord.name.clone()));
    }

    let expected: Vec<usize> = coord.dims.iter().map(|&dim| data_shape[dim]).collect();

    if coord.values.shape() != expected.as_slice() {
        return Err(GridError::CoordinateShape {
            name: coord.name.clone(),
            expected,
            found: coord.values.shape().to_vec(),
        });
    }

    Ok(())
}
