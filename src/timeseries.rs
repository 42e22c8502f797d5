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

//! Module containing a simple time series type shared by
//! observations and matched model series.
//!
//! Missing values are stored as NaN so that series of the same
//! timestamps can always be compared element-wise.

use crate::{errors::SeriesError, grid::bisection, Float};
use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;

#[derive(Clone, PartialEq, Debug, Default)]
pub struct TimeSeries {
    times: Vec<NaiveDateTime>,
    values: Vec<Float>,
}

impl TimeSeries {
    pub fn new(times: Vec<NaiveDateTime>, values: Vec<Float>) -> Result<Self, SeriesError> {
        if times.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }

        Ok(TimeSeries { times, values })
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn values(&self) -> &[Float] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    fn valid_values(&self) -> impl Iterator<Item = Float> + '_ {
        self.values.iter().copied().filter(|v| v.is_finite())
    }

    pub fn valid_count(&self) -> usize {
        self.valid_values().count()
    }

    /// Mean of valid values, `None` when there are none.
    pub fn mean(&self) -> Option<Float> {
        mean(&self.valid_values().collect::<Vec<_>>())
    }

    /// Population standard deviation of valid values.
    pub fn std(&self) -> Option<Float> {
        std(&self.valid_values().collect::<Vec<_>>())
    }

    /// Checks if timestamps are strictly increasing.
    pub fn is_monotonic(&self) -> bool {
        self.times.windows(2).all(|w| w[0] < w[1])
    }

    /// Returns the series with values transformed by given function.
    pub fn map_values(&self, f: impl Fn(Float) -> Float) -> TimeSeries {
        TimeSeries {
            times: self.times.clone(),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Drops samples that do not move time forward,
    /// keeping the first of any repeated timestamps.
    pub fn retain_increasing(&self) -> TimeSeries {
        let mut times = Vec::with_capacity(self.len());
        let mut values = Vec::with_capacity(self.len());

        for (&time, &value) in self.times.iter().zip(self.values.iter()) {
            if times.last().map_or(true, |last| time > *last) {
                times.push(time);
                values.push(value);
            }
        }

        TimeSeries { times, values }
    }

    /// Keeps samples with timestamps inside `[start, stop]`.
    pub fn between(&self, start: NaiveDateTime, stop: NaiveDateTime) -> TimeSeries {
        let (times, values) = self
            .times
            .iter()
            .zip(self.values.iter())
            .filter(|(t, _)| **t >= start && **t <= stop)
            .map(|(&t, &v)| (t, v))
            .unzip();

        TimeSeries { times, values }
    }

    /// Linearly interpolates valid values onto given timestamps.
    ///
    /// Timestamps outside of the span of valid values get NaN.
    /// The series must be monotonic.
    pub fn interpolate_to(&self, targets: &[NaiveDateTime]) -> TimeSeries {
        let (times, values): (Vec<Float>, Vec<Float>) = self
            .times
            .iter()
            .zip(self.values.iter())
            .filter(|(_, v)| v.is_finite())
            .map(|(t, &v)| (t.timestamp_millis() as Float, v))
            .unzip();

        let interpolated = targets
            .iter()
            .map(|target| interpolate(&times, &values, target.timestamp_millis() as Float))
            .collect();

        TimeSeries {
            times: targets.to_vec(),
            values: interpolated,
        }
    }

    /// Pairs values of both series at identical timestamps,
    /// in order of this series.
    pub fn align(&self, other: &TimeSeries) -> (Vec<Float>, Vec<Float>) {
        let lookup: FxHashMap<NaiveDateTime, usize> = other
            .times
            .iter()
            .enumerate()
            .map(|(i, &t)| (t, i))
            .collect();

        self.times
            .iter()
            .zip(self.values.iter())
            .filter_map(|(t, &v)| lookup.get(t).map(|&i| (v, other.values[i])))
            .unzip()
    }
}

fn interpolate(times: &[Float], values: &[Float], target: Float) -> Float {
    let (first, last) = match (times.first(), times.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Float::NAN,
    };

    if target < first || target > last {
        return Float::NAN;
    }

    let right = match bisection::find_right_closest(times, &target) {
        Ok(right) => right,
        Err(_) => return Float::NAN,
    };

    if times[right] == target || right == 0 {
        return values[right];
    }

    let left = right - 1;
    let weight = (target - times[left]) / (times[right] - times[left]);

    values[left] + weight * (values[right] - values[left])
}

pub(crate) fn mean(values: &[Float]) -> Option<Float> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().sum::<Float>() / values.len() as Float)
}

pub(crate) fn std(values: &[Float]) -> Option<Float> {
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<Float>() / values.len() as Float;

    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::TimeSeries;
    use crate::grid::time::parse_datetime;
    use chrono::{Duration, NaiveDateTime};
    use float_cmp::approx_eq;

    fn hourly(start: &str, count: i64) -> Vec<NaiveDateTime> {
        let start = parse_datetime(start).unwrap();
        (0..count).map(|h| start + Duration::hours(h)).collect()
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(TimeSeries::new(hourly("2016-07-01", 3), vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn statistics_skip_missing() {
        let series = TimeSeries::new(hourly("2016-07-01", 4), vec![1.0, f64::NAN, 3.0, 5.0]).unwrap();

        assert_eq!(series.valid_count(), 3);
        assert!(approx_eq!(f64, series.mean().unwrap(), 3.0, ulps = 2));
        assert!(approx_eq!(f64, series.std().unwrap(), (8.0f64 / 3.0).sqrt(), epsilon = 1e-12));

        let missing = TimeSeries::new(hourly("2016-07-01", 2), vec![f64::NAN, f64::NAN]).unwrap();
        assert!(missing.mean().is_none());
    }

    #[test]
    fn interpolation() {
        let series = TimeSeries::new(hourly("2016-07-01", 3), vec![0.0, 10.0, f64::NAN]).unwrap();
        let start = parse_datetime("2016-07-01").unwrap();

        let targets = vec![
            start - Duration::minutes(30),
            start + Duration::minutes(30),
            start + Duration::hours(1),
            start + Duration::minutes(90),
        ];
        let result = series.interpolate_to(&targets);

        assert!(result.values()[0].is_nan());
        assert!(approx_eq!(f64, result.values()[1], 5.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, result.values()[2], 10.0, epsilon = 1e-12));
        assert!(result.values()[3].is_nan());
        assert_eq!(result.times(), targets.as_slice());
    }

    #[test]
    fn alignment_on_common_times() {
        let obs = TimeSeries::new(hourly("2016-07-01", 4), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let model = TimeSeries::new(hourly("2016-07-01 02:00", 4), vec![30.0, 40.0, 50.0, 60.0]).unwrap();

        let (a, b) = obs.align(&model);
        assert_eq!(a, vec![3.0, 4.0]);
        assert_eq!(b, vec![30.0, 40.0]);
    }

    #[test]
    fn ordering() {
        let mut times = hourly("2016-07-01", 3);
        times.push(times[1]);
        let series = TimeSeries::new(times, vec![1.0, 2.0, 3.0, 4.0]).unwrap();

        assert!(!series.is_monotonic());

        let cleaned = series.retain_increasing();
        assert!(cleaned.is_monotonic());
        assert_eq!(cleaned.values(), &[1.0, 2.0, 3.0]);

        let start = parse_datetime("2016-07-01 01:00").unwrap();
        let window = cleaned.between(start, start + Duration::hours(5));
        assert_eq!(window.values(), &[2.0, 3.0]);
    }
}
