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

//! Sub-module responsible for narrowing variables
//! to the requested time interval and geographical extent.

use super::{bisection, inspect_topology, time::TimeUnits, units::Conversion};
use super::{AttrValue, Coordinate, GriddedVariable, Topology};
use crate::{
    errors::{GridError, SubsetError},
    Float,
};
use chrono::NaiveDateTime;
use log::debug;
use ndarray::{ArrayD, Axis};
use serde::Deserialize;

/// Geographical extent in degrees.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize)]
#[serde(try_from = "[Float; 4]")]
pub struct BoundingBox {
    lon_min: Float,
    lat_min: Float,
    lon_max: Float,
    lat_max: Float,
}

impl TryFrom<[Float; 4]> for BoundingBox {
    type Error = SubsetError;

    fn try_from(edges: [Float; 4]) -> Result<Self, Self::Error> {
        BoundingBox::new(edges[0], edges[1], edges[2], edges[3])
    }
}

impl BoundingBox {
    pub fn new(
        lon_min: Float,
        lat_min: Float,
        lon_max: Float,
        lat_max: Float,
    ) -> Result<Self, SubsetError> {
        let finite = [lon_min, lat_min, lon_max, lat_max]
            .iter()
            .all(|v| v.is_finite());

        if !finite || lon_min >= lon_max || lat_min >= lat_max {
            return Err(SubsetError::InvalidBoundingBox([
                lon_min, lat_min, lon_max, lat_max,
            ]));
        }

        Ok(BoundingBox {
            lon_min,
            lat_min,
            lon_max,
            lat_max,
        })
    }

    pub fn lon_min(&self) -> Float {
        self.lon_min
    }

    pub fn lat_min(&self) -> Float {
        self.lat_min
    }

    pub fn lon_max(&self) -> Float {
        self.lon_max
    }

    pub fn lat_max(&self) -> Float {
        self.lat_max
    }

    /// Brings longitude into the convention used by the box:
    /// `[0, 360)` when the box reaches past 180, otherwise `[-180, 180)`.
    pub fn normalize_lon(&self, lon: Float) -> Float {
        if self.lon_max > 180.0 {
            wrap_lon360(lon)
        } else {
            wrap_lon180(lon)
        }
    }

    pub fn contains_lon(&self, lon: Float) -> bool {
        let lon = self.normalize_lon(lon);

        lon >= self.lon_min && lon <= self.lon_max
    }

    pub fn contains_lat(&self, lat: Float) -> bool {
        lat >= self.lat_min && lat <= self.lat_max
    }

    pub fn contains(&self, lon: Float, lat: Float) -> bool {
        self.contains_lon(lon) && self.contains_lat(lat)
    }
}

/// Converts longitude to the `[-180, 180)` convention.
pub fn wrap_lon180(lon: Float) -> Float {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Converts longitude to the `[0, 360)` convention.
pub fn wrap_lon360(lon: Float) -> Float {
    lon.rem_euclid(360.0)
}

/// Selects given indices along given data axes, in the data
/// array and in every coordinate spanning those axes.
fn select_axes(
    var: &GriddedVariable,
    selections: &[(usize, Vec<usize>)],
) -> Result<GriddedVariable, GridError> {
    let mut data = var.data().clone();
    for (axis, indices) in selections {
        data = data.select(Axis(*axis), indices);
    }

    let coords = var
        .coordinates()
        .iter()
        .map(|coord| {
            let mut values = coord.values.clone();
            for (axis, indices) in selections {
                if let Some(pos) = coord.dims.iter().position(|dim| dim == axis) {
                    values = values.select(Axis(pos), indices);
                }
            }

            Coordinate {
                values,
                ..coord.clone()
            }
        })
        .collect();

    var.rebuild(data, coords, var.attributes().clone())
}

/// Subsets the variable to the bounding box.
///
/// For 1D coordinates points are selected directly. For 2D coordinates
/// the smallest index-space rectangle containing all points inside
/// the box is kept, so the result may contain points outside the box
/// but never drops points inside it.
pub fn subset_bbox(var: &GriddedVariable, bbox: &BoundingBox) -> Result<GriddedVariable, SubsetError> {
    let topology = inspect_topology(var)?;
    let x = var.x();
    let y = var.y();

    let selections = match topology {
        Topology::Rectilinear => {
            let mut lon_indices: Vec<usize> = x
                .values
                .iter()
                .enumerate()
                .filter(|(_, &lon)| bbox.contains_lon(lon))
                .map(|(i, _)| i)
                .collect();

            // keep longitudes increasing when box crosses the grid seam
            lon_indices.sort_by(|&a, &b| {
                let a = bbox.normalize_lon(x.values[[a]]);
                let b = bbox.normalize_lon(x.values[[b]]);
                a.total_cmp(&b)
            });

            let lat_indices: Vec<usize> = y
                .values
                .iter()
                .enumerate()
                .filter(|(_, &lat)| bbox.contains_lat(lat))
                .map(|(i, _)| i)
                .collect();

            vec![(x.dims[0], lon_indices), (y.dims[0], lat_indices)]
        }
        Topology::Unstructured => {
            let nodes: Vec<usize> = x
                .values
                .iter()
                .zip(y.values.iter())
                .enumerate()
                .filter(|(_, (&lon, &lat))| bbox.contains(lon, lat))
                .map(|(i, _)| i)
                .collect();

            vec![(x.dims[0], nodes)]
        }
        Topology::Curvilinear => {
            let mut rows: Option<(usize, usize)> = None;
            let mut cols: Option<(usize, usize)> = None;

            for ((idx, &lon), &lat) in x.values.indexed_iter().zip(y.values.iter()) {
                if bbox.contains(lon, lat) {
                    let (i, j) = (idx[0], idx[1]);
                    rows = Some(rows.map_or((i, i), |(lo, hi)| (lo.min(i), hi.max(i))));
                    cols = Some(cols.map_or((j, j), |(lo, hi)| (lo.min(j), hi.max(j))));
                }
            }

            let rows = rows.map_or_else(Vec::new, |(lo, hi)| (lo..=hi).collect());
            let cols = cols.map_or_else(Vec::new, |(lo, hi)| (lo..=hi).collect());

            vec![(x.dims[0], rows), (x.dims[1], cols)]
        }
    };

    if selections.iter().any(|(_, indices)| indices.is_empty()) {
        return Err(SubsetError::EmptySelection);
    }

    debug!(
        "Subsetting {} to {:?}",
        var.name(),
        selections
            .iter()
            .map(|(axis, indices)| (*axis, indices.len()))
            .collect::<Vec<_>>()
    );

    Ok(select_axes(var, &selections)?)
}

/// Returns the nearest index of the time coordinate to given datetime.
pub fn time_near(var: &GriddedVariable, datetime: NaiveDateTime) -> Result<usize, SubsetError> {
    let units = TimeUnits::from_coordinate(var.t())?;
    let target = units.encode(datetime);

    let times: Vec<Float> = var.t().values.iter().copied().collect();

    Ok(bisection::find_nearest(&times, target)?)
}

/// Slices the variable in time using the nearest indices
/// to requested datetimes.
///
/// When `stop` is given the slice is `[start, stop)` and must not be empty,
/// otherwise only the single instant nearest to `start` is kept.
pub fn time_slice(
    var: &GriddedVariable,
    start: NaiveDateTime,
    stop: Option<NaiveDateTime>,
) -> Result<GriddedVariable, SubsetError> {
    let istart = time_near(var, start)?;

    let indices: Vec<usize> = match stop {
        Some(stop) => {
            let istop = time_near(var, stop)?;

            if istart >= istop {
                return Err(SubsetError::EmptyTimeInterval { istart, istop });
            }

            (istart..istop).collect()
        }
        None => vec![istart],
    };

    Ok(select_axes(var, &[(0, indices)])?)
}

/// Converts values of the variable to the target units.
///
/// Invalid values are replaced with NaN before conversion
/// as the fill value and valid range lose their meaning afterwards.
pub fn convert_units(var: &GriddedVariable, target: &str) -> Result<GriddedVariable, SubsetError> {
    let source = var
        .units()
        .ok_or_else(|| SubsetError::MissingUnits(var.name().to_string()))?;

    if source == target {
        return Ok(var.clone());
    }

    let conversion = Conversion::new(source, target)?;

    let data: ArrayD<Float> = var.masked_data().mapv(|v| conversion.apply(v));

    let mut attributes = var.attributes().clone();
    for key in ["valid_range", "valid_min", "valid_max", "_FillValue", "missing_value"] {
        attributes.remove(key);
    }
    attributes.insert("units".to_string(), AttrValue::Text(target.to_string()));

    Ok(var.rebuild(data, var.coordinates().to_vec(), attributes)?)
}

/// Applies the bounding box, time and units constraints in that order.
pub fn constrain(
    var: &GriddedVariable,
    bbox: Option<&BoundingBox>,
    time: Option<(NaiveDateTime, Option<NaiveDateTime>)>,
    units: Option<&str>,
) -> Result<GriddedVariable, SubsetError> {
    let mut var = var.clone();

    if let Some(bbox) = bbox {
        var = subset_bbox(&var, bbox)?;
    }

    if let Some((start, stop)) = time {
        var = time_slice(&var, start, stop)?;
    }

    if let Some(units) = units {
        var = convert_units(&var, units)?;
    }

    Ok(var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::UnitError;
    use crate::grid::tests::{rectilinear, time_coordinate};
    use crate::grid::{Attributes, AxisRole};
    use crate::grid::time::parse_datetime;
    use float_cmp::approx_eq;
    use ndarray::{Array, Array1, IxDyn};

    #[test]
    fn bounding_box_validation() {
        assert!(BoundingBox::new(-87.4, 24.25, -74.7, 36.7).is_ok());
        assert!(BoundingBox::new(10.0, 0.0, -10.0, 1.0).is_err());
        assert!(BoundingBox::new(0.0, 1.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn longitude_conventions() {
        assert!(approx_eq!(f64, wrap_lon180(272.6), -87.4, epsilon = 1e-9));
        assert!(approx_eq!(f64, wrap_lon360(-87.4), 272.6, epsilon = 1e-9));
        assert!(approx_eq!(f64, wrap_lon180(180.0), -180.0, epsilon = 1e-9));

        let bbox = BoundingBox::new(-87.4, 24.25, -74.7, 36.7).unwrap();
        assert!(bbox.contains(280.0, 30.0));
        assert!(!bbox.contains(80.0, 30.0));
    }

    #[test]
    fn rectilinear_subset_across_conventions() {
        let lons = [270.0, 275.0, 280.0, 285.0, 290.0];
        let lats = [20.0, 25.0, 30.0, 35.0];
        let var = rectilinear(&lons, &lats, 3, |_, _| 1.0);

        let bbox = BoundingBox::new(-87.4, 24.25, -74.7, 36.7).unwrap();
        let subset = subset_bbox(&var, &bbox).unwrap();

        assert_eq!(subset.shape(), &[3, 3, 3]);
        assert_eq!(subset.x().values.iter().copied().collect::<Vec<_>>(), vec![275.0, 280.0, 285.0]);
        assert_eq!(subset.y().values.iter().copied().collect::<Vec<_>>(), vec![25.0, 30.0, 35.0]);
    }

    #[test]
    fn rectilinear_subset_across_seam() {
        let lons = [0.0, 5.0, 10.0, 180.0, 350.0, 355.0];
        let lats = [0.0, 1.0];
        let var = rectilinear(&lons, &lats, 2, |_, _| 1.0);

        let bbox = BoundingBox::new(-10.0, -5.0, 5.0, 5.0).unwrap();
        let subset = subset_bbox(&var, &bbox).unwrap();

        assert_eq!(
            subset.x().values.iter().copied().collect::<Vec<_>>(),
            vec![350.0, 355.0, 0.0, 5.0]
        );
    }

    #[test]
    fn empty_selection_is_signalled() {
        let var = rectilinear(&[0.0, 1.0], &[0.0, 1.0], 2, |_, _| 1.0);
        let bbox = BoundingBox::new(50.0, 50.0, 60.0, 60.0).unwrap();

        assert!(matches!(
            subset_bbox(&var, &bbox),
            Err(SubsetError::EmptySelection)
        ));
    }

    #[test]
    fn curvilinear_subset_keeps_superset() {
        // rotated grid: lon = i + j, lat = j - i
        let lon = Array::from_shape_fn((4, 4), |(i, j)| (i + j) as f64);
        let lat = Array::from_shape_fn((4, 4), |(i, j)| j as f64 - i as f64);
        let data = Array::from_shape_fn(IxDyn(&[2, 4, 4]), |idx| (idx[1] * 4 + idx[2]) as f64);

        let coords = vec![
            time_coordinate(2),
            Coordinate::new("lon", AxisRole::X, vec![1, 2], lon.into_dyn()),
            Coordinate::new("lat", AxisRole::Y, vec![1, 2], lat.into_dyn()),
        ];
        let var = GriddedVariable::new("temp", data, coords, Attributes::default()).unwrap();

        let bbox = BoundingBox::new(1.5, -0.5, 3.5, 0.5).unwrap();
        let subset = subset_bbox(&var, &bbox).unwrap();

        // only (1, 1) falls inside
        assert_eq!(subset.shape(), &[2, 1, 1]);
        assert_eq!(subset.data()[[0, 0, 0]], 5.0);

        let bbox = BoundingBox::new(0.5, -1.5, 2.5, 1.5).unwrap();
        let subset = subset_bbox(&var, &bbox).unwrap();

        for ((idx, &lon), &lat) in var.x().values.indexed_iter().zip(var.y().values.iter()) {
            if bbox.contains(lon, lat) {
                let found = subset
                    .x()
                    .values
                    .iter()
                    .zip(subset.y().values.iter())
                    .any(|(&l, &m)| l == lon && m == lat);
                assert!(found, "point {:?} dropped", idx);
            }
        }
    }

    #[test]
    fn unstructured_subset() {
        let data = Array::from_shape_fn(IxDyn(&[2, 4]), |idx| idx[1] as f64);
        let coords = vec![
            time_coordinate(2),
            Coordinate::new("lon", AxisRole::X, vec![1], Array1::from(vec![0.0, 5.0, 1.0, 9.0]).into_dyn()),
            Coordinate::new("lat", AxisRole::Y, vec![1], Array1::from(vec![0.0, 5.0, 1.0, 0.5]).into_dyn()),
        ];
        let var = GriddedVariable::new("zeta", data, coords, Attributes::default()).unwrap();

        let bbox = BoundingBox::new(-1.0, -1.0, 2.0, 2.0).unwrap();
        let subset = subset_bbox(&var, &bbox).unwrap();

        assert_eq!(subset.shape(), &[2, 2]);
        assert_eq!(subset.data()[[1, 1]], 2.0);
    }

    #[test]
    fn time_slicing() {
        let var = rectilinear(&[0.0], &[0.0], 24, |_, _| 1.0);

        let start = parse_datetime("2016-07-01 02:10:00").unwrap();
        let stop = parse_datetime("2016-07-01 05:50:00").unwrap();

        assert_eq!(time_near(&var, start).unwrap(), 2);

        let sliced = time_slice(&var, start, Some(stop)).unwrap();
        assert_eq!(sliced.shape()[0], 4);

        let single = time_slice(&var, start, None).unwrap();
        assert_eq!(single.shape()[0], 1);
    }

    #[test]
    fn empty_time_interval() {
        let var = rectilinear(&[0.0], &[0.0], 24, |_, _| 1.0);

        let start = parse_datetime("2016-07-01 02:10:00").unwrap();
        let stop = parse_datetime("2016-07-01 02:20:00").unwrap();

        assert!(matches!(
            time_slice(&var, start, Some(stop)),
            Err(SubsetError::EmptyTimeInterval { .. })
        ));
    }

    #[test]
    fn units_conversion() {
        let var = rectilinear(&[0.0], &[0.0], 2, |_, _| 0.0);
        let mut attributes = Attributes::default();
        attributes.insert("units".to_string(), "degC".into());
        let var = var
            .rebuild(var.data().clone(), var.coordinates().to_vec(), attributes)
            .unwrap();

        let kelvin = convert_units(&var, "K").unwrap();
        assert!(approx_eq!(f64, kelvin.data()[[0, 0, 0]], 283.15, epsilon = 1e-9));
        assert_eq!(kelvin.units(), Some("K"));

        assert!(matches!(
            convert_units(&var, "m"),
            Err(SubsetError::Units(UnitError::Incompatible { .. }))
        ));
    }
}
