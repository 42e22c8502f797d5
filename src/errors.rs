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

use crate::grid::AxisRole;
use crate::matching::GridIndex;
use crate::Float;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Error while reading config.yaml: {0}")]
    Config(#[from] ConfigError),

    #[error("Error while creating ThreadPool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Cannot set memory limit of {0} MB, more memory is already in use")]
    MemoryLimit(usize),

    #[error("Error while reading input: {0}")]
    Input(#[from] InputError),

    #[error("Error while writing output: {0}")]
    Output(#[from] OutputError),

    #[error("None of the models could be prepared for comparison")]
    NoModels,

    #[error("No observing stations left after filtering")]
    NoStations,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot open config file: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize config file: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("Configuration component is out of bounds {0}")]
    OutOfBounds(&'static str),

    #[error("Cannot interpret date {0}")]
    InvalidDate(String),
}

#[derive(Error, Debug)]
pub enum GridError {
    #[error("More than one coordinate with axis role {0}")]
    DuplicateAxis(AxisRole),

    #[error("No coordinate with axis role {0}")]
    MissingAxis(AxisRole),

    #[error("Time coordinate {0} must span only the first data axis")]
    TimeAxis(String),

    #[error("Coordinate {0} refers to a data axis that does not exist")]
    AxisOutOfRange(String),

    #[error("Coordinate {name} has shape {found:?} while data axes have {expected:?}")]
    CoordinateShape {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Cannot classify grid topology: {0}")]
    Classification(String),

    #[error("Unsupported calendar: {0}")]
    Calendar(String),

    #[error("Cannot interpret time units: {0}")]
    TimeUnits(String),

    #[error("Time value {0} cannot be decoded into a datetime")]
    TimeValue(Float),
}

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("{0}")]
    Grid(#[from] GridError),

    #[error("Cannot find surface of {name}, it has {extra} non-horizontal dimensions besides time")]
    TooManyDimensions { name: String, extra: usize },

    #[error("Cannot find surface of {0}, it has a vertical dimension but no vertical coordinate")]
    NoVerticalCoordinate(String),

    #[error("Vertical coordinate of {0} does not match its vertical dimension")]
    VerticalAxis(String),

    #[error("Cannot find surface of {0}, vertical coordinate has no positive attribute")]
    MissingPositive(String),

    #[error("Cannot find surface of {name}, unknown positive direction {value}")]
    UnknownPositive { name: String, value: String },
}

#[derive(Error, Debug)]
pub enum SubsetError {
    #[error("Bounding box {0:?} is not ordered as [lon_min, lat_min, lon_max, lat_max]")]
    InvalidBoundingBox([Float; 4]),

    #[error("Bounding box excludes all points of the variable")]
    EmptySelection,

    #[error("Requested time interval is empty (start index {istart}, stop index {istop})")]
    EmptyTimeInterval { istart: usize, istop: usize },

    #[error("Variable {0} has no units to convert from")]
    MissingUnits(String),

    #[error("{0}")]
    Units(#[from] UnitError),

    #[error("{0}")]
    Grid(#[from] GridError),

    #[error("Error while searching time coordinate: {0}")]
    Search(#[from] SearchError),
}

#[derive(Error, Debug)]
pub enum UnitError {
    #[error("Unknown unit: {0}")]
    Unknown(String),

    #[error("Cannot convert {from} to {to}")]
    Incompatible { from: String, to: String },
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Searched array is empty")]
    EmptyArray,

    #[error("Searched value is outside of the array")]
    OutOfBounds,
}

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("No data within {max_dist} degrees of point ({lon}, {lat})")]
    NoDataNearPoint {
        lon: Float,
        lat: Float,
        max_dist: Float,
    },

    #[error("None of {candidates} points near ({lon}, {lat}) is a water point")]
    NoWaterPoint {
        lon: Float,
        lat: Float,
        candidates: usize,
    },

    #[error("Spatial index contains no points")]
    EmptyIndex,

    #[error("Variable {0} has dimensions other than time and horizontal ones")]
    NotSurface(String),

    #[error("Grid index {0} is outside of the grid")]
    OutOfGrid(GridIndex),

    #[error("{0}")]
    Grid(#[from] GridError),

    #[error("{0}")]
    Series(#[from] SeriesError),
}

#[derive(Error, Debug)]
pub enum SeriesError {
    #[error("Time series has {times} timestamps but {values} values")]
    LengthMismatch { times: usize, values: usize },
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Cannot open input file: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize model file: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("Cannot read observations: {0}")]
    Csv(#[from] csv::Error),

    #[error("Model variable is inconsistent: {0}")]
    Grid(#[from] GridError),

    #[error("Wrong array shape of {name}: {reason}")]
    Shape { name: String, reason: String },

    #[error("Cannot determine axis role of coordinate {0}")]
    UnknownAxis(String),

    #[error("Cannot parse datetime {0}")]
    Datetime(String),

    #[error("{0}")]
    Series(#[from] SeriesError),

    #[error("Observations of station {station} have inconsistent {field}")]
    InconsistentStation { station: String, field: &'static str },
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Cannot write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot write output table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Output directory is faulty: {0}")]
    FaultyOutput(&'static str),
}

/// Reasons for which a model is skipped before matching.
#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("{0}")]
    Input(#[from] InputError),

    #[error("{0}")]
    Grid(#[from] GridError),

    #[error("{0}")]
    Surface(#[from] SurfaceError),

    #[error("{0}")]
    Subset(#[from] SubsetError),

    #[error("{0}")]
    Match(#[from] MatchError),
}
