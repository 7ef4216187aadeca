//! Confidence Scorer (spec §4.6, §9).
//!
//! Combines three factors into a single [0, 1] score: how much the models
//! spread apart, how many of them agree, and how far into the future the
//! point being scored sits. Spread is computed from the *range* of the wind
//! ensemble, not its standard deviation — the specification's corrected
//! reading of a unit-confusion bug in the source it was distilled from
//! (spec §9).

use crate::model::{ConfidenceLevel, ModelConsensus};

const SPREAD_WEIGHT: f64 = 0.5;
const AGREEMENT_WEIGHT: f64 = 0.3;
const HORIZON_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct SpreadInputs {
    pub temperature_stdev_c: f64,
    pub wind_range_ms: f64,
    /// Fraction (0..1) of models predicting measurable precipitation at this
    /// point. Near 0 or 1 means the models agree; near 0.5 means they don't.
    pub precipitation_ensemble_probability: f64,
    pub humidity_range_percent: f64,
}

#[derive(Debug, Clone)]
pub struct ConfidenceFactor {
    pub name: String,
    pub weight: f64,
    pub raw_score: f64,
    pub weighted_contribution: f64,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct ConfidenceOutcome {
    pub level: ConfidenceLevel,
    pub factors: Vec<ConfidenceFactor>,
    pub explanation: String,
}

pub fn compute(
    consensus: &ModelConsensus,
    spread: &SpreadInputs,
    total_models: usize,
    days_ahead: i64,
) -> ConfidenceOutcome {
    let temp_factor = linear_factor(spread.temperature_stdev_c, 1.5, 4.0);
    let wind_factor = linear_factor(spread.wind_range_ms * 3.6, 10.0, 25.0);
    let p = spread.precipitation_ensemble_probability;
    let precip_factor = if p >= 0.8 || p <= 0.2 { 1.0 } else { 0.5 };
    let humidity_factor = linear_factor(spread.humidity_range_percent, 10.0, 30.0);

    let spread_score = (temp_factor + wind_factor + precip_factor + humidity_factor) / 4.0;

    let agreement_score = if total_models == 0 {
        0.5
    } else {
        0.3 + 0.7 * (consensus.models_in_agreement.len() as f64 / total_models as f64)
    };

    let horizon_score = (1.0 - 0.05 * days_ahead.max(0).min(10) as f64).max(0.5);

    let score = spread_score * SPREAD_WEIGHT
        + agreement_score * AGREEMENT_WEIGHT
        + horizon_score * HORIZON_WEIGHT;
    let level = ConfidenceLevel::from_score(score.clamp(0.0, 1.0));

    let factors = vec![
        ConfidenceFactor {
            name: "spread".to_string(),
            weight: SPREAD_WEIGHT,
            raw_score: spread_score,
            weighted_contribution: spread_score * SPREAD_WEIGHT,
            detail: format!(
                "temperature stdev {:.1}°C, wind range {:.1} km/h, humidity range {:.0}%, precipitation ensemble {:.0}%",
                spread.temperature_stdev_c,
                spread.wind_range_ms * 3.6,
                spread.humidity_range_percent,
                spread.precipitation_ensemble_probability * 100.0,
            ),
        },
        ConfidenceFactor {
            name: "agreement".to_string(),
            weight: AGREEMENT_WEIGHT,
            raw_score: agreement_score,
            weighted_contribution: agreement_score * AGREEMENT_WEIGHT,
            detail: format!(
                "{} of {} models in agreement",
                consensus.models_in_agreement.len(),
                total_models
            ),
        },
        ConfidenceFactor {
            name: "time horizon".to_string(),
            weight: HORIZON_WEIGHT,
            raw_score: horizon_score,
            weighted_contribution: horizon_score * HORIZON_WEIGHT,
            detail: format!("{days_ahead} day(s) ahead"),
        },
    ];

    let explanation = explain(&level, &factors);

    ConfidenceOutcome { level, factors, explanation }
}

fn linear_factor(value: f64, low: f64, high: f64) -> f64 {
    if value <= low {
        1.0
    } else if value >= high {
        0.3
    } else {
        1.0 - 0.7 * (value - low) / (high - low)
    }
}

fn explain(level: &ConfidenceLevel, factors: &[ConfidenceFactor]) -> String {
    let weakest = factors.iter().min_by(|a, b| a.raw_score.partial_cmp(&b.raw_score).unwrap());
    match weakest {
        Some(factor) => format!(
            "{} confidence ({:.0}%): limited mainly by {} — {}",
            level.level.as_str(),
            level.score * 100.0,
            factor.name,
            factor.detail
        ),
        None => format!("{} confidence ({:.0}%)", level.level.as_str(), level.score * 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn consensus(agree: usize) -> ModelConsensus {
        let models: BTreeSet<crate::model::ModelId> =
            crate::model::ModelId::ALL.into_iter().take(agree).collect();
        ModelConsensus {
            agreement_score: agree as f64 / 3.0,
            models_in_agreement: models,
            outlier_models: BTreeSet::new(),
            temperature: crate::model::MetricStatistics {
                mean: 20.0,
                median: 20.0,
                min: 20.0,
                max: 20.0,
                stdev: 0.0,
                range: 0.0,
            },
            precipitation: crate::model::MetricStatistics {
                mean: 0.0,
                median: 0.0,
                min: 0.0,
                max: 0.0,
                stdev: 0.0,
                range: 0.0,
            },
            wind: crate::model::MetricStatistics {
                mean: 3.0,
                median: 3.0,
                min: 3.0,
                max: 3.0,
                stdev: 0.0,
                range: 0.0,
            },
        }
    }

    #[test]
    fn full_agreement_zero_spread_near_term_is_high() {
        let c = consensus(3);
        let spread = SpreadInputs {
            temperature_stdev_c: 0.0,
            wind_range_ms: 0.0,
            precipitation_ensemble_probability: 0.0,
            humidity_range_percent: 0.0,
        };
        let outcome = compute(&c, &spread, 3, 0);
        assert_eq!(outcome.level.level, crate::model::ConfidenceLabel::High);
        assert!(outcome.level.score >= 0.85, "score was {}", outcome.level.score);
    }

    #[test]
    fn high_temperature_spread_lowers_the_spread_factor() {
        let c = consensus(2);
        let spread = SpreadInputs {
            temperature_stdev_c: 6.0,
            wind_range_ms: 0.0,
            precipitation_ensemble_probability: 0.0,
            humidity_range_percent: 0.0,
        };
        let outcome = compute(&c, &spread, 3, 0);
        let spread_factor = outcome.factors.iter().find(|f| f.name == "spread").unwrap();
        assert!(spread_factor.raw_score < 1.0);
    }

    #[test]
    fn longer_horizon_never_raises_confidence() {
        let c = consensus(3);
        let spread = SpreadInputs {
            temperature_stdev_c: 1.0,
            wind_range_ms: 1.0,
            precipitation_ensemble_probability: 0.1,
            humidity_range_percent: 5.0,
        };
        let near = compute(&c, &spread, 3, 0);
        let far = compute(&c, &spread, 3, 9);
        assert!(far.level.score <= near.level.score);
    }

    #[test]
    fn horizon_factor_floors_at_half_weight() {
        let c = consensus(3);
        let spread = SpreadInputs {
            temperature_stdev_c: 0.0,
            wind_range_ms: 0.0,
            precipitation_ensemble_probability: 0.0,
            humidity_range_percent: 0.0,
        };
        let far = compute(&c, &spread, 3, 30);
        let horizon_factor = far.factors.iter().find(|f| f.name == "time horizon").unwrap();
        assert!((horizon_factor.raw_score - 0.5).abs() < 1e-9);
    }
}
