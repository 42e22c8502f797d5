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

//! Basic quality control of observation series.
//!
//! Flags returned by the checks are `true` for suspicious samples.

use crate::Float;
use chrono::{Duration, NaiveDateTime};

/// Checks if any two consecutive timestamps are further apart than `freq`.
pub fn has_time_gaps(times: &[NaiveDateTime], freq: Duration) -> bool {
    times.windows(2).any(|w| w[1] - w[0] > freq)
}

/// Checks if every element is strictly greater than the previous one.
pub fn is_monotonically_increasing<T: PartialOrd>(values: &[T]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// Flags runs of at least `reps` consecutive values that differ
/// by less than `eps` (machine epsilon when not given).
pub fn is_flatline(values: &[Float], reps: usize, eps: Option<Float>) -> Vec<bool> {
    let eps = eps.filter(|&e| e > 0.0).unwrap_or(Float::EPSILON);
    let reps = reps.max(2);

    let mut mask = vec![false; values.len()];
    let mut run_start = 0;

    for k in 1..=values.len() {
        let continues = k < values.len() && (values[k] - values[k - 1]).abs() < eps;

        if !continues {
            if k - run_start >= reps {
                mask[run_start..k].iter_mut().for_each(|m| *m = true);
            }
            run_start = k;
        }
    }

    mask
}

/// Median of values, `None` for empty slice or when any value is NaN.
fn median(values: &[Float]) -> Option<Float> {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

/// Centered rolling median over full windows, with edges
/// back- and forward-filled from the nearest computed median.
fn rolling_median(values: &[Float], window: usize) -> Vec<Float> {
    let n = values.len();
    let window = window.max(1);

    let mut medians: Vec<Option<Float>> = (0..n)
        .map(|i| {
            let end = i + window / 2;
            let start = (end + 1).checked_sub(window)?;

            if end >= n {
                return None;
            }

            median(&values[start..=end])
        })
        .collect();

    // back-fill then forward-fill
    let mut next = None;
    for median in medians.iter_mut().rev() {
        match median {
            Some(value) => next = Some(*value),
            None => *median = next,
        }
    }

    let mut previous = None;
    for median in medians.iter_mut() {
        match median {
            Some(value) => previous = Some(*value),
            None => *median = previous,
        }
    }

    medians
        .into_iter()
        .map(|m| m.unwrap_or(Float::NAN))
        .collect()
}

fn population_std(values: &[Float]) -> Float {
    let valid: Vec<Float> = values.iter().copied().filter(|v| v.is_finite()).collect();

    crate::timeseries::std(&valid).unwrap_or(Float::NAN)
}

/// Flags spikes: samples differing from the rolling median by more
/// than `threshold`, or by more than `threshold` standard deviations
/// of those differences when `scale` is set.
pub fn is_spike(values: &[Float], window: usize, threshold: Float, scale: bool) -> Vec<bool> {
    let medians = rolling_median(values, window);

    let difference: Vec<Float> = values
        .iter()
        .zip(medians.iter())
        .map(|(v, m)| (v - m).abs())
        .collect();

    let limit = if scale {
        threshold * population_std(&difference)
    } else {
        threshold
    };

    difference.iter().map(|&d| d > limit).collect()
}

/// Replaces values outside `[vmin, vmax]` with NaN.
/// Missing bounds default to the extremes of the series.
pub fn threshold_series(values: &[Float], vmin: Option<Float>, vmax: Option<Float>) -> Vec<Float> {
    let vmin = vmin.unwrap_or(Float::NEG_INFINITY);
    let vmax = vmax.unwrap_or(Float::INFINITY);

    values
        .iter()
        .map(|&v| if v < vmin || v > vmax { Float::NAN } else { v })
        .collect()
}

/// Replaces spikes detected with [`is_spike`] with NaN.
pub fn filter_spikes(values: &[Float], window: usize, threshold: Float, scale: bool) -> Vec<Float> {
    is_spike(values, window, threshold, scale)
        .into_iter()
        .zip(values.iter())
        .map(|(spike, &v)| if spike { Float::NAN } else { v })
        .collect()
}

/// First order RC high-pass filter, `alpha` in `(0, 1]`.
fn high_pass(values: &[Float], alpha: Float) -> Vec<Float> {
    let mean = values.iter().sum::<Float>() / values.len() as Float;
    let data: Vec<Float> = values.iter().map(|v| v - mean).collect();

    let mut filtered = data.clone();
    for k in 1..data.len() {
        filtered[k] = alpha * filtered[k - 1] + alpha * (data[k] - data[k - 1]);
    }

    filtered.into_iter().map(|v| v + mean).collect()
}

fn median_or_zero(values: &[Float]) -> Float {
    if values.iter().any(|&v| v != 0.0) {
        median(values).unwrap_or(0.0)
    } else {
        0.0
    }
}

/// Flags spikes with the Tukey 53H criterion (Goring and Nikora, 2002):
/// samples that differ from the smoothed series by more than
/// `k` standard deviations of the high-pass filtered series.
pub fn tukey53h(values: &[Float], k: Float) -> Vec<bool> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let filtered = high_pass(values, 0.99);
    let mean = filtered.iter().sum::<Float>() / n as Float;
    let series: Vec<Float> = filtered.iter().map(|v| v - mean).collect();

    let stddev = population_std(&series);

    let mut u1 = vec![0.0; n];
    for i in 0..n.saturating_sub(4) {
        u1[i + 2] = median_or_zero(&series[i..i + 5]);
    }

    let mut u2 = vec![0.0; n];
    for i in 0..n.saturating_sub(2) {
        u2[i + 1] = median_or_zero(&u1[i..i + 3]);
    }

    let mut u3 = vec![0.0; n];
    for i in 1..n.saturating_sub(1) {
        u3[i] = 0.25 * (u2[i - 1] + 2.0 * u2[i] + u2[i + 1]);
    }

    series
        .iter()
        .zip(u3.iter())
        .map(|(s, u)| (s - u).abs() > k * stddev)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::time::parse_datetime;

    const SPIKY: [f64; 9] = [33.43, 33.45, 34.45, 90.0, 35.67, 34.9, 43.5, 34.6, 33.7];

    fn flagged(flags: &[bool]) -> Vec<usize> {
        flags
            .iter()
            .enumerate()
            .filter(|(_, &f)| f)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn time_gaps() {
        let start = parse_datetime("1980-01-19").unwrap();
        let times: Vec<_> = (0..48).map(|h| start + Duration::hours(h)).collect();

        assert!(has_time_gaps(&times, Duration::minutes(6)));
        assert!(!has_time_gaps(&times, Duration::hours(1)));
    }

    #[test]
    fn monotonic() {
        assert!(is_monotonically_increasing(&[1, 2, 3]));
        assert!(!is_monotonically_increasing(&[2, 1, 2, 3]));
    }

    #[test]
    fn flatline() {
        let mut values: Vec<f64> = (0..10).map(|i| i as f64 * 0.3).collect();
        values.extend(vec![10.0; 15]);
        values.extend((0..10).map(|i| i as f64 * 0.7));

        let flags = is_flatline(&values, 10, None);

        assert_eq!(flagged(&flags), (10..25).collect::<Vec<_>>());
        assert!(flagged(&is_flatline(&values, 16, None)).is_empty());
    }

    #[test]
    fn spikes() {
        assert_eq!(flagged(&is_spike(&SPIKY, 3, 3.0, false)), vec![3, 6]);
        assert_eq!(flagged(&is_spike(&SPIKY, 3, 3.0, true)), vec![3]);

        let filtered = filter_spikes(&SPIKY, 3, 3.0, true);
        assert!(filtered[3].is_nan());
        assert_eq!(filtered[6], 43.5);
    }

    #[test]
    fn thresholds() {
        let values = [0.1, 20.0, 30.0, 35.5, 34.9, 43.5, 34.6, 40.0];
        let result = threshold_series(&values, Some(30.0), Some(40.0));

        let kept: Vec<bool> = result.iter().map(|v| v.is_finite()).collect();
        assert_eq!(kept, vec![false, false, true, true, true, false, true, true]);
    }

    #[test]
    fn tukey() {
        assert_eq!(flagged(&tukey53h(&SPIKY, 1.5)), vec![3]);
    }
}
