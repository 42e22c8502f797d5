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

//! Decoding and encoding of CF time coordinates.

use super::Coordinate;
use crate::{errors::GridError, Float};
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Calendars in which model time can be decoded
/// without any special handling.
const SUPPORTED_CALENDARS: [&str; 3] = ["standard", "gregorian", "proleptic_gregorian"];

/// Units of numeric time values, eg. `hours since 1970-01-01 00:00:00`.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct TimeUnits {
    seconds_per_unit: Float,
    epoch: NaiveDateTime,
}

impl TimeUnits {
    pub fn parse(units: &str) -> Result<Self, GridError> {
        let (step, epoch) = units
            .split_once(" since ")
            .ok_or_else(|| GridError::TimeUnits(units.to_string()))?;

        let seconds_per_unit = match step.trim().to_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
            "days" | "day" | "d" => 86400.0,
            _ => return Err(GridError::TimeUnits(units.to_string())),
        };

        let epoch =
            parse_datetime(epoch).ok_or_else(|| GridError::TimeUnits(units.to_string()))?;

        Ok(TimeUnits {
            seconds_per_unit,
            epoch,
        })
    }

    /// Reads units and calendar attributes of a time coordinate.
    pub fn from_coordinate(coord: &Coordinate) -> Result<Self, GridError> {
        if let Some(calendar) = coord.attribute_str("calendar") {
            let calendar = calendar.trim().to_lowercase();

            if !SUPPORTED_CALENDARS.contains(&calendar.as_str()) {
                return Err(GridError::Calendar(calendar));
            }
        }

        let units = coord
            .attribute_str("units")
            .ok_or_else(|| GridError::TimeUnits(format!("{} has no units", coord.name)))?;

        TimeUnits::parse(units)
    }

    /// Fails for non-finite values and values outside
    /// of the representable datetime range.
    pub fn decode(&self, value: Float) -> Result<NaiveDateTime, GridError> {
        let millis = (value * self.seconds_per_unit * 1000.0).round();

        if !millis.is_finite() || millis.abs() >= i64::MAX as Float {
            return Err(GridError::TimeValue(value));
        }

        self.epoch
            .checked_add_signed(Duration::milliseconds(millis as i64))
            .ok_or(GridError::TimeValue(value))
    }

    pub fn encode(&self, datetime: NaiveDateTime) -> Float {
        let millis = (datetime - self.epoch).num_milliseconds() as Float;

        millis / (1000.0 * self.seconds_per_unit)
    }
}

/// Parses datetimes in formats commonly found in
/// CF attributes and observation tables.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    let text = text
        .strip_suffix(" UTC")
        .or_else(|| text.strip_suffix('Z'))
        .unwrap_or(text)
        .trim();

    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    for format in FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime);
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
