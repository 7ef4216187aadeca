//! Small shared statistics helpers used by the Aggregator and Confidence
//! Scorer (spec §4.5, §4.6, §9).

use crate::model::MetricStatistics;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

pub fn population_stdev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn min_max(values: &[f64]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    if values.is_empty() {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

/// Arithmetic mean after discarding the single largest and smallest value
/// once N >= 4; below that, a plain mean (spec §4.5, §9 — the
/// specification's documented choice over always dropping one from each
/// end, which collapses to the median at N=3).
pub fn trimmed_mean(values: &[f64]) -> f64 {
    let n = values.len();
    if n >= 4 {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let trimmed = &sorted[1..n - 1];
        mean(trimmed)
    } else {
        mean(values)
    }
}

/// Circular mean of a set of compass directions in degrees: sum unit
/// vectors, take atan2, normalize into [0, 360). Never use a naive
/// arithmetic mean on directions — it miscomputes near the 0/360 seam
/// (spec §9).
pub fn circular_mean_deg(directions_deg: &[f64]) -> f64 {
    if directions_deg.is_empty() {
        return 0.0;
    }
    let (sin_sum, cos_sum) = directions_deg.iter().fold((0.0_f64, 0.0_f64), |(s, c), d| {
        let r = d.to_radians();
        (s + r.sin(), c + r.cos())
    });
    let mean_rad = sin_sum.atan2(cos_sum);
    let mut deg = mean_rad.to_degrees();
    if deg < 0.0 {
        deg += 360.0;
    }
    deg
}

pub fn stats(values: &[f64]) -> MetricStatistics {
    let (min, max) = min_max(values);
    MetricStatistics {
        mean: mean(values),
        median: median(values),
        min,
        max,
        stdev: population_stdev(values),
        range: max - min,
    }
}

/// Per-element outlier flags for one metric across a set of models, using a
/// median/MAD-based z-score rather than the group mean and population
/// stdev: with a handful of models, one extreme value pulls the population
/// stdev up right when it's computed, which shrinks its own z-score and can
/// mask the very outlier a straight mean/stdev check is meant to catch
/// (spec §4.5, §9). The MAD is scaled by 0.6745 so it lines up with an
/// ordinary stdev on normal data; when the MAD itself is 0 (half or more of
/// the values tied on the median) it falls back to the mean absolute
/// deviation, scaled by 0.7979 for the same reason. A cutoff of 2 applies
/// uniformly, as the source's varying 1σ/2σ thresholds do not.
pub fn outlier_flags(values: &[f64]) -> Vec<bool> {
    if values.len() < 2 {
        return vec![false; values.len()];
    }
    let med = median(values);
    let abs_devs: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    let mad = median(&abs_devs);
    let sigma = if mad > 0.0 { mad / 0.6745 } else { mean(&abs_devs) / 0.7979 };
    if sigma <= 0.0 {
        return vec![false; values.len()];
    }
    abs_devs.iter().map(|d| d / sigma > 2.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trimmed_mean_drops_extremes_at_n4() {
        let values = vec![20.0, 20.0, 20.0, 35.0];
        assert!((trimmed_mean(&values) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn trimmed_mean_is_plain_mean_below_n4() {
        let values = vec![10.0, 20.0, 30.0];
        assert!((trimmed_mean(&values) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn circular_mean_handles_the_0_360_seam() {
        let directions = vec![350.0, 10.0];
        let mean = circular_mean_deg(&directions);
        assert!((mean - 0.0).abs() < 1e-6 || (mean - 360.0).abs() < 1e-6);
    }

    #[test]
    fn circular_mean_is_not_the_naive_average() {
        // Naive average of 350 and 10 is 180 — exactly backwards.
        let directions = vec![350.0, 10.0];
        let naive = mean(&directions);
        let circular = circular_mean_deg(&directions);
        assert!((naive - 180.0).abs() < 1e-9);
        assert!((circular - 180.0).abs() > 90.0);
    }

    #[test]
    fn outlier_flags_never_flag_identical_values() {
        let values = vec![20.0, 20.0, 20.0, 20.0];
        assert_eq!(outlier_flags(&values), vec![false; 4]);
    }

    #[test]
    fn outlier_flags_catch_a_lone_value_masked_by_its_own_weight() {
        // Plain population stdev puts |35-23.75|/6.50 at just 1.73, under a
        // 2-sigma cutoff, because 35 itself inflates the group stdev.
        let values = vec![20.0, 20.0, 20.0, 35.0];
        let flags = outlier_flags(&values);
        assert_eq!(flags, vec![false, false, false, true]);
    }

    #[test]
    fn outlier_flags_tolerate_ordinary_model_spread() {
        let values = vec![20.0, 20.5, 19.5];
        assert_eq!(outlier_flags(&values), vec![false; 3]);
    }
}
