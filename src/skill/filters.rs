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

//! Lanczos low-pass filter used to remove tides
//! from series before computing skill.

use crate::{
    constants::{LOW_PASS_DT, LOW_PASS_PERIOD, LOW_PASS_WINDOW},
    timeseries, Float,
};
use serde::Deserialize;
use std::f64::consts::PI;

/// Parameters of the tidal filter.
#[derive(Copy, Clone, PartialEq, Debug, Deserialize)]
pub struct LowPass {
    /// Half-width of the filter (in samples).
    #[serde(default = "LowPass::default_window")]
    pub window: usize,

    /// Cut-off period in hours. Default of 40 hours removes all tides.
    #[serde(default = "LowPass::default_period")]
    pub period: Float,

    /// Sample spacing in seconds.
    #[serde(default = "LowPass::default_dt")]
    pub dt: Float,
}

impl LowPass {
    fn default_window() -> usize {
        LOW_PASS_WINDOW
    }

    fn default_period() -> Float {
        LOW_PASS_PERIOD
    }

    fn default_dt() -> Float {
        LOW_PASS_DT
    }

    /// Cut-off frequency in cycles per sample.
    pub fn frequency(&self) -> Float {
        self.dt / (self.period * 3600.0)
    }

    /// Filters the series, leaving missing values missing.
    ///
    /// Before convolution the series mean is removed and gaps are
    /// filled by linear interpolation (with the nearest valid value
    /// at both ends), so the filter does not spread missing values.
    pub fn apply(&self, values: &[Float]) -> Vec<Float> {
        let valid: Vec<Float> = values.iter().copied().filter(|v| v.is_finite()).collect();

        let avg = match timeseries::mean(&valid) {
            Some(avg) => avg,
            None => return values.to_vec(),
        };

        let anomalies: Vec<Float> = values.iter().map(|v| v - avg).collect();
        let filled = fill_gaps(&anomalies);
        let weights = lanczos_weights(self.window, self.frequency());

        convolve_same(&weights, &filled)
            .into_iter()
            .zip(values.iter())
            .map(|(low, original)| {
                if original.is_finite() {
                    low + avg
                } else {
                    Float::NAN
                }
            })
            .collect()
    }
}

impl Default for LowPass {
    fn default() -> Self {
        LowPass {
            window: LowPass::default_window(),
            period: LowPass::default_period(),
            dt: LowPass::default_dt(),
        }
    }
}

/// Weights of the Lanczos filter with cosine taper,
/// `2 * window + 1` long and normalised to sum to one.
pub fn lanczos_weights(window: usize, freq: Float) -> Vec<Float> {
    let taps = window + 1;

    let mut half: Vec<Float> = (0..taps)
        .map(|i| 0.5 * (1.0 + (PI * i as Float / taps as Float).cos()))
        .collect();

    for (i, weight) in half.iter_mut().enumerate().skip(1) {
        let x = 2.0 * PI * freq * i as Float;
        *weight *= x.sin() / x;
    }

    let norm = half.iter().sum::<Float>() + half.iter().skip(1).sum::<Float>();

    half.iter()
        .rev()
        .chain(half.iter().skip(1))
        .map(|w| w / norm)
        .collect()
}

/// Discrete convolution returning output of the same length as
/// `signal`, centered like numpy's `same` mode, with zeros outside the signal.
fn convolve_same(kernel: &[Float], signal: &[Float]) -> Vec<Float> {
    let center = (kernel.len().saturating_sub(1) / 2) as isize;
    let n = signal.len() as isize;

    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(j, w)| {
                    let k = i + center - j as isize;
                    (0..n).contains(&k).then(|| w * signal[k as usize])
                })
                .sum::<Float>()
        })
        .collect()
}

/// Linear interpolation over missing values, extending
/// the first and last valid values to the edges.
fn fill_gaps(values: &[Float]) -> Vec<Float> {
    let valid: Vec<usize> = (0..values.len())
        .filter(|&i| values[i].is_finite())
        .collect();

    let (first, last) = match (valid.first(), valid.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return values.to_vec(),
    };

    let mut filled = values.to_vec();

    for value in filled.iter_mut().take(first) {
        *value = values[first];
    }

    for value in filled.iter_mut().skip(last + 1) {
        *value = values[last];
    }

    for pair in valid.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        let span = (right - left) as Float;

        for i in (left + 1)..right {
            let weight = (i - left) as Float / span;
            filled[i] = values[left] + weight * (values[right] - values[left]);
        }
    }

    filled
}
