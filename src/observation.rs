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

//! Observations from a single station sensor.

use crate::{errors::UnitError, grid::units::Conversion, timeseries::TimeSeries, Float};

/// Time series of one phenomenon measured at a fixed position,
/// together with metadata identifying where it comes from.
#[derive(Clone, PartialEq, Debug)]
pub struct StationObservation {
    pub station_code: String,
    pub station_name: String,
    pub sensor: String,
    pub lon: Float,
    pub lat: Float,
    pub depth: Float,
    pub standard_name: String,
    pub units: String,
    pub series: TimeSeries,
}

impl StationObservation {
    /// Returns the observation with values expressed in target units.
    pub fn convert_units(&self, target: &str) -> Result<StationObservation, UnitError> {
        if self.units == target {
            return Ok(self.clone());
        }

        let conversion = Conversion::new(&self.units, target)?;

        Ok(StationObservation {
            units: target.to_string(),
            series: self.series.map_values(|v| conversion.apply(v)),
            ..self.clone()
        })
    }
}
