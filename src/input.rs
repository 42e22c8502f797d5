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

//! Module responsible for reading model variables
//! and station observations from files.
//!
//! Model variables are stored as YAML documents with
//! a flat, row-major data array:
//!
//! ```yaml
//! name: temp
//! attributes: {standard_name: sea_water_temperature, units: degC}
//! shape: [24, 2, 3]
//! data: [...]
//! coordinates:
//!   - {name: time, dims: [0], values: [...], attributes: {units: hours since 2016-07-01}}
//!   - {name: lat, axis: Y, dims: [1], values: [24.5, 25.0]}
//!   - {name: lon, axis: X, dims: [2], values: [-81.5, -81.0, -80.5]}
//! ```
//!
//! Observations are read from a CSV table with one sample per row.

use crate::{
    errors::InputError,
    grid::{guess_axis_role, time::parse_datetime, AxisRole, Attributes, Coordinate, GriddedVariable},
    naming::{guess_model_name, sanitize_name},
    observation::StationObservation,
    timeseries::TimeSeries,
    Float,
};
use chrono::NaiveDateTime;
use log::debug;
use ndarray::{ArrayD, IxDyn};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::{fs, io, path::Path};

#[derive(Deserialize, Debug)]
struct CoordinateRecord {
    name: String,
    axis: Option<AxisRole>,
    dims: Vec<usize>,
    values: Vec<Float>,
    #[serde(default)]
    attributes: Attributes,
}

#[derive(Deserialize, Debug)]
struct VariableRecord {
    name: String,
    #[serde(default)]
    attributes: Attributes,
    shape: Vec<usize>,
    data: Vec<Option<Float>>,
    coordinates: Vec<CoordinateRecord>,
}

fn shaped(name: &str, shape: Vec<usize>, values: Vec<Float>) -> Result<ArrayD<Float>, InputError> {
    ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|err| InputError::Shape {
        name: name.to_string(),
        reason: err.to_string(),
    })
}

impl CoordinateRecord {
    fn into_coordinate(self, data_shape: &[usize]) -> Result<Coordinate, InputError> {
        let role = match self.axis {
            Some(role) => role,
            None => guess_axis_role(&self.name, &self.attributes)
                .ok_or_else(|| InputError::UnknownAxis(self.name.clone()))?,
        };

        let shape = self
            .dims
            .iter()
            .map(|&axis| {
                data_shape.get(axis).copied().ok_or_else(|| InputError::Shape {
                    name: self.name.clone(),
                    reason: format!("data has no axis {}", axis),
                })
            })
            .collect::<Result<Vec<usize>, InputError>>()?;

        let values = shaped(&self.name, shape, self.values)?;

        Ok(Coordinate {
            name: self.name,
            role,
            dims: self.dims,
            values,
            attributes: self.attributes,
        })
    }
}

/// Parses a model variable from YAML text.
pub fn parse_model(text: &str) -> Result<GriddedVariable, InputError> {
    let record: VariableRecord = serde_yaml::from_str(text)?;

    let data: Vec<Float> = record
        .data
        .into_iter()
        .map(|v| v.unwrap_or(Float::NAN))
        .collect();
    let data = shaped(&record.name, record.shape, data)?;

    let coords = record
        .coordinates
        .into_iter()
        .map(|coord| coord.into_coordinate(data.shape()))
        .collect::<Result<Vec<Coordinate>, InputError>>()?;

    let var = GriddedVariable::new(&record.name, data, coords, record.attributes)?;

    debug!("Parsed variable {} of shape {:?}", var.name(), var.shape());

    Ok(var)
}

/// Reads a model variable from YAML file.
pub fn load_model(path: &Path) -> Result<GriddedVariable, InputError> {
    let text = fs::read_to_string(path)?;

    parse_model(&text)
}

/// Name of the model used in output tables: the configured one,
/// else guessed from its title, else the file name.
pub fn model_name(configured: Option<&str>, var: &GriddedVariable, path: &Path) -> String {
    if let Some(name) = configured {
        return sanitize_name(name);
    }

    let guessed = var
        .attribute_str("title")
        .map(guess_model_name)
        .filter(|name| !name.is_empty());

    match guessed {
        Some(name) => sanitize_name(&name),
        None => path
            .file_stem()
            .map(|stem| sanitize_name(&stem.to_string_lossy()))
            .unwrap_or_else(|| sanitize_name(var.name())),
    }
}

#[derive(Deserialize, Debug)]
struct ObservationRecord {
    station_code: String,
    station_name: String,
    sensor: String,
    lon: Float,
    lat: Float,
    depth: Float,
    standard_name: String,
    units: String,
    time: String,
    value: Option<Float>,
}

/// Observations of one station gathered before building the series.
struct StationSamples {
    first: ObservationRecord,
    times: Vec<NaiveDateTime>,
    values: Vec<Float>,
}

impl StationSamples {
    fn check_consistent(&self, record: &ObservationRecord) -> Result<(), InputError> {
        let field = if record.lon != self.first.lon || record.lat != self.first.lat {
            Some("position")
        } else if record.units != self.first.units {
            Some("units")
        } else if record.station_name != self.first.station_name {
            Some("name")
        } else {
            None
        };

        match field {
            Some(field) => Err(InputError::InconsistentStation {
                station: record.station_code.clone(),
                field,
            }),
            None => Ok(()),
        }
    }

    fn into_observation(self) -> Result<StationObservation, InputError> {
        let series = TimeSeries::new(self.times, self.values)?;
        let first = self.first;

        Ok(StationObservation {
            station_code: first.station_code,
            station_name: first.station_name,
            sensor: first.sensor,
            lon: first.lon,
            lat: first.lat,
            depth: first.depth,
            standard_name: first.standard_name,
            units: first.units,
            series,
        })
    }
}

/// Reads observations from CSV, grouping rows by station and
/// phenomenon in order of their first appearance.
/// Empty values are treated as missing.
pub fn read_observations<R: io::Read>(reader: R) -> Result<Vec<StationObservation>, InputError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut stations: Vec<StationSamples> = Vec::new();
    let mut lookup: FxHashMap<(String, String), usize> = FxHashMap::default();

    for record in reader.deserialize() {
        let record: ObservationRecord = record?;

        let time = parse_datetime(&record.time)
            .ok_or_else(|| InputError::Datetime(record.time.clone()))?;
        let value = record.value.unwrap_or(Float::NAN);

        let key = (record.station_code.clone(), record.standard_name.clone());

        match lookup.get(&key) {
            Some(&i) => {
                let station = &mut stations[i];
                station.check_consistent(&record)?;
                station.times.push(time);
                station.values.push(value);
            }
            None => {
                lookup.insert(key, stations.len());
                stations.push(StationSamples {
                    first: record,
                    times: vec![time],
                    values: vec![value],
                });
            }
        }
    }

    stations
        .into_iter()
        .map(StationSamples::into_observation)
        .collect()
}

/// Reads observations from CSV file.
pub fn load_observations(path: &Path) -> Result<Vec<StationObservation>, InputError> {
    let file = fs::File::open(path)?;

    read_observations(io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{inspect_topology, Topology};

    const MODEL: &str = r#"
name: temp
attributes:
  standard_name: sea_water_temperature
  units: degC
  title: "HYbrid Coordinate Ocean Model (HYCOM): Global"
  _FillValue: -999.0
shape: [2, 2, 3]
data: [1.0, 2.0, 3.0, 4.0, 5.0, .nan, 1.5, 2.5, 3.5, 4.5, ~, -999.0]
coordinates:
  - name: time
    dims: [0]
    values: [0.0, 1.0]
    attributes: {units: "hours since 2016-07-01 00:00:00", calendar: gregorian}
  - name: lat
    dims: [1]
    values: [24.5, 25.0]
    attributes: {standard_name: latitude, units: degrees_north}
  - name: lon
    axis: X
    dims: [2]
    values: [-81.5, -81.0, -80.5]
"#;

    const OBSERVATIONS: &str = "\
station_code,station_name,sensor,lon,lat,depth,standard_name,units,time,value
8724580,\"Key West, FL\",E1,-81.8079,24.5508,0.0,sea_water_temperature,degC,2016-07-01 00:00:00,30.1
8724580,\"Key West, FL\",E1,-81.8079,24.5508,0.0,sea_water_temperature,degC,2016-07-01 01:00:00,
8723970,Vaca Key,E1,-81.1065,24.7110,0.0,sea_water_temperature,degC,2016-07-01T00:00:00,29.5
8724580,\"Key West, FL\",E1,-81.8079,24.5508,0.0,sea_water_temperature,degC,2016-07-01 02:00:00,30.3
";

    #[test]
    fn parses_model() {
        let var = parse_model(MODEL).unwrap();

        assert_eq!(var.shape(), &[2, 2, 3]);
        assert_eq!(var.y().role, AxisRole::Y);
        assert_eq!(var.t().role, AxisRole::T);
        assert_eq!(inspect_topology(&var).unwrap(), Topology::Rectilinear);
        assert_eq!(var.times().unwrap()[1].to_string(), "2016-07-01 01:00:00");

        let masked = var.masked_data();
        assert!(masked[[0, 1, 2]].is_nan());
        assert!(masked[[1, 1, 1]].is_nan());
        assert!(masked[[1, 1, 2]].is_nan());
        assert_eq!(masked[[1, 0, 0]], 1.5);

        let name = model_name(None, &var, Path::new("models/hycom_gom.yaml"));
        assert_eq!(name, "HYCOM");
        let name = model_name(Some("ROMS ESPRESSO"), &var, Path::new("x.yaml"));
        assert_eq!(name, "ROMS_ESPRESSO");
    }

    #[test]
    fn rejects_wrong_shapes() {
        let short = MODEL.replace("3.5, 4.5, ~, -999.0", "3.5");
        assert!(matches!(parse_model(&short), Err(InputError::Shape { .. })));

        let unknown = MODEL.replace("  - name: lon\n    axis: X\n", "  - name: xc\n");
        assert!(matches!(parse_model(&unknown), Err(InputError::UnknownAxis(_))));
    }

    #[test]
    fn reads_observations() {
        let stations = read_observations(OBSERVATIONS.as_bytes()).unwrap();

        assert_eq!(stations.len(), 2);

        let key_west = &stations[0];
        assert_eq!(key_west.station_code, "8724580");
        assert_eq!(key_west.station_name, "Key West, FL");
        assert_eq!(key_west.series.len(), 3);
        assert!(key_west.series.values()[1].is_nan());
        assert_eq!(key_west.series.valid_count(), 2);

        assert_eq!(stations[1].station_code, "8723970");
        assert_eq!(stations[1].series.values(), &[29.5]);
    }

    #[test]
    fn rejects_inconsistent_station() {
        let moved = format!(
            "{}8724580,\"Key West, FL\",E1,-80.0,24.5508,0.0,sea_water_temperature,degC,2016-07-01 03:00:00,30.0\n",
            OBSERVATIONS
        );

        assert!(matches!(
            read_observations(moved.as_bytes()),
            Err(InputError::InconsistentStation { field: "position", .. })
        ));
    }
}
