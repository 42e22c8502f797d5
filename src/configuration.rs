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

//! Module responsible for parsing and checking the configuration file.
//!
//! To provide meaningful error messages the configuration file uses
//! [YAML](https://en.wikipedia.org/wiki/YAML) and `serde` to enforce
//! strong typing and automatic type checking.
//!
//! The structures and their fields in this module directly correspond to
//! the fields inside `config.yaml` so you can check this documentation
//! for more details how to set the config file.

use crate::{
    constants::MAX_DATE_OFFSET,
    errors::ConfigError,
    grid::{time::parse_datetime, BoundingBox},
    matching::SearchParams,
    skill::SkillOptions,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Date given either explicitly or as an offset in days.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(untagged)]
pub enum DateSpec {
    Offset(i64),
    Datetime(String),
}

/// Fields with the compared time interval.
///
/// When both dates are offsets, start is that many days before
/// today and stop that many days after today (both at midnight).
/// When only one is an offset, it is counted from the other date.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Date {
    pub start: DateSpec,
    pub stop: DateSpec,
}

impl Date {
    /// Resolves both dates relative to given day.
    pub fn resolve(&self, today: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime), ConfigError> {
        let midnight = |date: NaiveDate| {
            date.and_hms_opt(0, 0, 0)
                .ok_or_else(|| ConfigError::InvalidDate(date.to_string()))
        };

        let today = midnight(today)?;
        let shifted = |from: NaiveDateTime,
                       days: i64,
                       forward: bool|
         -> Result<NaiveDateTime, ConfigError> {
            let offset = day_offset(days)?;
            let shifted = if forward {
                from.checked_add_signed(offset)
            } else {
                from.checked_sub_signed(offset)
            };

            shifted.ok_or_else(|| ConfigError::InvalidDate(format!("{} moved by {} days", from, days)))
        };

        let (start, stop) = match (&self.start, &self.stop) {
            (DateSpec::Offset(start), DateSpec::Offset(stop)) => (
                shifted(today, *start, false)?,
                shifted(today, *stop, true)?,
            ),
            (DateSpec::Offset(start), DateSpec::Datetime(stop)) => {
                let stop = parse_date(stop)?;
                (shifted(stop, *start, false)?, stop)
            }
            (DateSpec::Datetime(start), DateSpec::Offset(stop)) => {
                let start = parse_date(start)?;
                (start, shifted(start, *stop, true)?)
            }
            (DateSpec::Datetime(start), DateSpec::Datetime(stop)) => {
                (parse_date(start)?, parse_date(stop)?)
            }
        };

        if start >= stop {
            return Err(ConfigError::OutOfBounds("Start date must precede stop date"));
        }

        Ok((start, stop))
    }
}

/// Offsets are taken by their magnitude, the direction
/// follows from the date they are applied to.
fn day_offset(days: i64) -> Result<Duration, ConfigError> {
    days.checked_abs()
        .filter(|days| *days <= MAX_DATE_OFFSET)
        .map(Duration::days)
        .ok_or(ConfigError::OutOfBounds(
            "Date offset cannot exceed 36500 days",
        ))
}

fn parse_date(text: &str) -> Result<NaiveDateTime, ConfigError> {
    parse_datetime(text).ok_or_else(|| ConfigError::InvalidDate(text.to_string()))
}

/// Fields with the compared region.
#[derive(Copy, Clone, PartialEq, Debug, Deserialize)]
pub struct Region {
    /// Region edges in degrees: `[lon_min, lat_min, lon_max, lat_max]`.
    pub bbox: BoundingBox,
}

/// Model variable file with optional name used in output tables.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct ModelSource {
    pub path: PathBuf,

    /// _(Optional)_ Defaults to the name derived from model title or file name.
    pub name: Option<String>,
}

/// Fields with information about input files.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Input {
    /// List of model variable files (YAML).
    pub models: Vec<ModelSource>,

    /// Observations table (CSV).
    pub observations: PathBuf,
}

/// _(Optional)_ Fields with information about output.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Output {
    /// Directory for result tables. Must be empty or not exist.
    ///
    /// Defaults to `./output`.
    #[serde(default = "Output::default_directory")]
    pub directory: PathBuf,
}

impl Output {
    fn default_directory() -> PathBuf {
        PathBuf::from("./output")
    }
}

impl Default for Output {
    fn default() -> Self {
        Output {
            directory: Output::default_directory(),
        }
    }
}

/// _(Optional)_ Fields with information about
/// resources available for the run.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Resources {
    /// _(Optional)_ Thread count used for matching stations.
    ///
    /// Cannot be less than `1`. Defaults to `1`.
    #[serde(default = "Resources::default_threads")]
    pub threads: u16,

    /// _(Optional)_ Heap memory limit in MB.
    /// Useful for enabling meaningful Out-of-memory error messages,
    /// as model arrays may take substantial amount of memory.
    ///
    /// Cannot be less than `128`. Defaults to whole addressable-space.
    #[serde(default = "Resources::default_memory")]
    pub memory: usize,
}

impl Resources {
    fn default_threads() -> u16 {
        1
    }

    fn default_memory() -> usize {
        usize::MAX / (1024 * 1024)
    }

    /// Checks if thread count and memory limit are
    /// above limits.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.threads < 1 {
            return Err(ConfigError::OutOfBounds(
                "Available threads cannot be less than 1",
            ));
        }

        if self.memory < 128 {
            return Err(ConfigError::OutOfBounds(
                "Available memory cannot be less than 128 MB",
            ));
        }

        Ok(())
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            threads: Resources::default_threads(),
            memory: Resources::default_memory(),
        }
    }
}

/// Main config structure representing the fields in
/// configuration file.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Config {
    pub date: Date,

    pub region: Region,

    /// Units to which model and observation values are converted.
    pub units: String,

    /// Accepted standard names of the compared phenomenon.
    pub cf_names: Vec<String>,

    #[serde(default)]
    pub search: SearchParams,

    #[serde(default)]
    pub skill: SkillOptions,

    pub input: Input,

    #[serde(default)]
    pub output: Output,

    #[serde(default)]
    pub resources: Resources,
}

impl Config {
    /// Config structure constructor, responsible for
    /// deserializing configuration and checking it.
    pub fn new_from_file(file_path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read(file_path)?;
        let config: Config = serde_yaml::from_slice(data.as_slice())?;

        config.check_bounds()?;

        Ok(config)
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.units.trim().is_empty() {
            return Err(ConfigError::OutOfBounds("Target units cannot be empty"));
        }

        if self.cf_names.is_empty() {
            return Err(ConfigError::OutOfBounds(
                "At least one accepted phenomenon name is required",
            ));
        }

        if self.search.k < 1 {
            return Err(ConfigError::OutOfBounds(
                "Number of search candidates cannot be less than 1",
            ));
        }

        if self.search.max_dist <= 0.0 {
            return Err(ConfigError::OutOfBounds(
                "Maximal search distance must be positive",
            ));
        }

        if self.search.min_var < 0.0 {
            return Err(ConfigError::OutOfBounds(
                "Minimal water variance cannot be negative",
            ));
        }

        let low_pass = &self.skill.low_pass;
        if low_pass.window < 1 || low_pass.period <= 0.0 || low_pass.dt <= 0.0 {
            return Err(ConfigError::OutOfBounds(
                "Tidal filter window, period and time step must be positive",
            ));
        }

        if self.input.models.is_empty() {
            return Err(ConfigError::OutOfBounds(
                "At least one model file is required",
            ));
        }

        self.resources.check_bounds()?;

        Ok(())
    }

    /// Resolves dates against the current day and gathers
    /// values needed by the comparison.
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        self.run_config_at(Utc::now().naive_utc().date())
    }

    pub fn run_config_at(&self, today: NaiveDate) -> Result<RunConfig, ConfigError> {
        let (start, stop) = self.date.resolve(today)?;

        Ok(RunConfig {
            start,
            stop,
            bbox: self.region.bbox,
            units: self.units.clone(),
            phenomenon_names: self.cf_names.clone(),
        })
    }
}

/// Resolved values of a run, never modified after construction.
#[derive(Clone, PartialEq, Debug)]
pub struct RunConfig {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    pub bbox: BoundingBox,
    pub units: String,
    pub phenomenon_names: Vec<String>,
}

impl RunConfig {
    pub fn accepts(&self, standard_name: &str) -> bool {
        self.phenomenon_names.iter().any(|name| name == standard_name)
    }
}
