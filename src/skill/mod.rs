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

//! Module responsible for scoring model series against observations.
//!
//! Scores are computed only over samples valid in both series.
//! When there are no such samples the score is missing (`None`),
//! because lack of overlap is common across station-model pairs
//! and must not stop the comparison.

pub mod filters;
pub mod qaqc;

use crate::{timeseries::TimeSeries, Float};
use filters::LowPass;
use log::debug;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Statistic used to score the model.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Statistic {
    /// Mean absolute difference.
    MeanBias,
    /// Median absolute difference.
    MedianBias,
    /// Root-mean-square difference.
    Rmse,
    /// Coefficient of determination of model against observations.
    R2,
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Statistic::MeanBias => "mean_bias",
            Statistic::MedianBias => "median_bias",
            Statistic::Rmse => "rmse",
            Statistic::R2 => "r2",
        };

        write!(f, "{}", name)
    }
}

impl Statistic {
    /// Computes the statistic over equally long, fully valid samples.
    fn compute(&self, obs: &[Float], model: &[Float]) -> Float {
        match self {
            Statistic::MeanBias => mean_bias(obs, model),
            Statistic::MedianBias => median_bias(obs, model),
            Statistic::Rmse => rmse(obs, model),
            Statistic::R2 => r2(obs, model),
        }
    }
}

/// Mask of positions where both series have valid values.
pub fn both_valid(x: &[Float], y: &[Float]) -> Vec<bool> {
    x.iter()
        .zip(y.iter())
        .map(|(a, b)| !a.is_nan() && !b.is_nan())
        .collect()
}

fn absolute_errors(obs: &[Float], model: &[Float]) -> Vec<Float> {
    obs.iter().zip(model.iter()).map(|(o, m)| (o - m).abs()).collect()
}

pub fn mean_bias(obs: &[Float], model: &[Float]) -> Float {
    let errors = absolute_errors(obs, model);

    errors.iter().sum::<Float>() / errors.len() as Float
}

pub fn median_bias(obs: &[Float], model: &[Float]) -> Float {
    let mut errors = absolute_errors(obs, model);
    errors.sort_by(|a, b| a.total_cmp(b));

    let n = errors.len();
    if n == 0 {
        return Float::NAN;
    }

    if n % 2 == 1 {
        errors[n / 2]
    } else {
        (errors[n / 2 - 1] + errors[n / 2]) / 2.0
    }
}

pub fn rmse(obs: &[Float], model: &[Float]) -> Float {
    let squares: Float = obs
        .iter()
        .zip(model.iter())
        .map(|(o, m)| (o - m) * (o - m))
        .sum();

    (squares / obs.len() as Float).sqrt()
}

/// Coefficient of determination. For constant observations
/// it is 1 when the model is perfect and 0 otherwise.
pub fn r2(obs: &[Float], model: &[Float]) -> Float {
    let mean = obs.iter().sum::<Float>() / obs.len() as Float;

    let ss_res: Float = obs
        .iter()
        .zip(model.iter())
        .map(|(o, m)| (o - m) * (o - m))
        .sum();
    let ss_tot: Float = obs.iter().map(|o| (o - mean) * (o - mean)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }

    1.0 - ss_res / ss_tot
}

/// Scores the model against observations over jointly valid samples.
///
/// With `remove_mean` each series has its own mean (over those samples)
/// subtracted first, so only deviations from the mean are compared.
pub fn skill_score(
    obs: &[Float],
    model: &[Float],
    statistic: Statistic,
    remove_mean: bool,
) -> Option<Float> {
    let (mut x, mut y): (Vec<Float>, Vec<Float>) = obs
        .iter()
        .zip(model.iter())
        .zip(both_valid(obs, model))
        .filter(|(_, valid)| *valid)
        .map(|((&o, &m), _)| (o, m))
        .unzip();

    if x.is_empty() {
        return None;
    }

    if remove_mean {
        for values in [&mut x, &mut y] {
            let mean = values.iter().sum::<Float>() / values.len() as Float;
            values.iter_mut().for_each(|v| *v -= mean);
        }
    }

    Some(statistic.compute(&x, &y))
}

/// Options of skill computation.
#[derive(Copy, Clone, PartialEq, Debug, Deserialize)]
pub struct SkillOptions {
    /// Compare only deviations from the series means.
    #[serde(default = "SkillOptions::default_remove_mean")]
    pub remove_mean: bool,

    /// Remove tides with the low-pass filter before scoring.
    #[serde(default)]
    pub filter_tides: bool,

    #[serde(default)]
    pub low_pass: LowPass,
}

impl SkillOptions {
    fn default_remove_mean() -> bool {
        true
    }
}

impl Default for SkillOptions {
    fn default() -> Self {
        SkillOptions {
            remove_mean: SkillOptions::default_remove_mean(),
            filter_tides: false,
            low_pass: LowPass::default(),
        }
    }
}

/// Observations at one station together with model
/// series at the timestamps of those observations.
#[derive(Clone, PartialEq, Debug)]
pub struct Comparison {
    pub station: String,
    pub observations: TimeSeries,
    pub models: Vec<(String, TimeSeries)>,
}

/// Scores of every model at every station.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct SkillTable {
    statistic: Option<Statistic>,
    scores: BTreeMap<String, BTreeMap<String, Option<Float>>>,
}

impl SkillTable {
    pub fn compute(
        comparisons: &[Comparison],
        statistic: Statistic,
        options: &SkillOptions,
    ) -> SkillTable {
        let mut scores = BTreeMap::new();

        for comparison in comparisons {
            let station_scores: BTreeMap<String, Option<Float>> = comparison
                .models
                .iter()
                .map(|(model, series)| {
                    let (x, y) = comparison.observations.align(series);

                    let (x, y) = if options.filter_tides {
                        (options.low_pass.apply(&x), options.low_pass.apply(&y))
                    } else {
                        (x, y)
                    };

                    (model.clone(), skill_score(&x, &y, statistic, options.remove_mean))
                })
                .collect();

            debug!(
                "Computed {} of {} models at station {}",
                statistic,
                station_scores.len(),
                comparison.station
            );

            scores.insert(comparison.station.clone(), station_scores);
        }

        SkillTable {
            statistic: Some(statistic),
            scores,
        }
    }

    pub fn statistic(&self) -> Option<Statistic> {
        self.statistic
    }

    pub fn get(&self, station: &str, model: &str) -> Option<Float> {
        self.scores.get(station)?.get(model).copied().flatten()
    }

    pub fn stations(&self) -> impl Iterator<Item = &str> {
        self.scores.keys().map(String::as_str)
    }

    /// Names of all models scored at any station, sorted.
    pub fn models(&self) -> Vec<&str> {
        let models: BTreeSet<&str> = self
            .scores
            .values()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();

        models.into_iter().collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, Option<Float>>)> {
        self.scores.iter().map(|(station, row)| (station.as_str(), row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::time::parse_datetime;
    use chrono::Duration;
    use float_cmp::approx_eq;

    fn series(values: &[Float]) -> TimeSeries {
        let start = parse_datetime("2016-07-01").unwrap();
        let times = (0..values.len() as i64)
            .map(|h| start + Duration::hours(h))
            .collect();

        TimeSeries::new(times, values.to_vec()).unwrap()
    }

    #[test]
    fn perfect_model() {
        let obs = [1.0, 2.0, 3.0];

        assert_eq!(skill_score(&obs, &obs, Statistic::MeanBias, false), Some(0.0));
        assert_eq!(skill_score(&obs, &obs, Statistic::Rmse, true), Some(0.0));
        assert_eq!(skill_score(&obs, &obs, Statistic::R2, false), Some(1.0));
    }

    #[test]
    fn known_values() {
        let obs = [3.0, -0.5, 2.0, 7.0];
        let model = [2.5, 0.0, 2.0, 8.0];

        let rmse = skill_score(&obs, &model, Statistic::Rmse, false).unwrap();
        assert!(approx_eq!(f64, rmse, 0.612_372_435_695_794_5, epsilon = 1e-12));

        let bias = skill_score(&obs, &model, Statistic::MeanBias, false).unwrap();
        assert!(approx_eq!(f64, bias, 0.5, epsilon = 1e-12));

        let median = skill_score(&obs, &model, Statistic::MedianBias, false).unwrap();
        assert!(approx_eq!(f64, median, 0.5, epsilon = 1e-12));

        let r2 = skill_score(&obs, &model, Statistic::R2, false).unwrap();
        assert!(approx_eq!(f64, r2, 0.948_608_137_044_967_9, epsilon = 1e-12));
    }

    #[test]
    fn only_jointly_valid_samples() {
        let x = [Float::NAN, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [0.0, 1.0, Float::NAN, 3.0, 4.0, 5.0];

        assert_eq!(both_valid(&x, &y), vec![false, true, false, true, true, true]);
        assert_eq!(skill_score(&x, &y, Statistic::Rmse, false), Some(0.0));
    }

    #[test]
    fn no_overlap_is_missing() {
        let x = [Float::NAN, 1.0];
        let y = [2.0, Float::NAN];

        assert_eq!(skill_score(&x, &y, Statistic::MeanBias, true), None);
        assert_eq!(skill_score(&[], &[], Statistic::Rmse, true), None);
    }

    #[test]
    fn mean_removal_is_symmetric() {
        let obs = [1.0, 4.0, 2.0, 8.0, 5.0];
        let model = [3.0, 3.5, 6.0, 7.0, 4.0];

        for statistic in [Statistic::MeanBias, Statistic::Rmse] {
            let forward = skill_score(&obs, &model, statistic, true).unwrap();
            let backward = skill_score(&model, &obs, statistic, true).unwrap();

            assert!(approx_eq!(f64, forward, backward, epsilon = 1e-12));
        }

        // offset between series disappears with mean removal
        let shifted: Vec<Float> = obs.iter().map(|v| v + 10.0).collect();
        let bias = skill_score(&obs, &shifted, Statistic::MeanBias, true).unwrap();
        assert!(approx_eq!(f64, bias, 0.0, epsilon = 1e-12));
    }

    #[test]
    fn skill_table() {
        let comparisons = vec![
            Comparison {
                station: "8651370".to_string(),
                observations: series(&[1.0, 2.0, 3.0]),
                models: vec![
                    ("HYCOM".to_string(), series(&[1.5, 2.5, 3.5])),
                    ("ROMS".to_string(), series(&[Float::NAN; 3])),
                ],
            },
            Comparison {
                station: "8658163".to_string(),
                observations: series(&[Float::NAN; 3]),
                models: vec![("HYCOM".to_string(), series(&[1.0, 2.0, 3.0]))],
            },
        ];

        let options = SkillOptions {
            remove_mean: false,
            ..SkillOptions::default()
        };
        let table = SkillTable::compute(&comparisons, Statistic::MeanBias, &options);

        assert_eq!(table.statistic(), Some(Statistic::MeanBias));
        assert_eq!(table.stations().collect::<Vec<_>>(), vec!["8651370", "8658163"]);
        assert_eq!(table.models(), vec!["HYCOM", "ROMS"]);

        assert!(approx_eq!(f64, table.get("8651370", "HYCOM").unwrap(), 0.5, epsilon = 1e-12));
        assert_eq!(table.get("8651370", "ROMS"), None);
        assert_eq!(table.get("8658163", "HYCOM"), None);
        assert_eq!(table.get("8658163", "ROMS"), None);
    }
}
