//! Aggregator (spec §4.5, §9).
//!
//! Synthesizes N independent [`ModelForecast`]s into one consensus
//! [`AggregatedForecast`]. Timestamps/dates are inner-joined across every
//! contributing model first; everything downstream — consensus values,
//! per-metric statistics, outlier classification, and model weights —
//! operates only on that common grid.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::confidence::{self, SpreadInputs};
use crate::error::{WeatherError, WeatherResult};
use crate::model::{
    AggregatedDailyForecast, AggregatedForecast, AggregatedHourlyForecast, CloudCoverSummary,
    DailyForecast, DailyMetricRanges, HourlyForecast, HourlyMetricRanges, MetricStatistics,
    MinMax, ModelConsensus, ModelForecast, ModelId, ModelWeight, PrecipitationSummary, SunTimes,
    WeatherMetrics, WindSummary,
};
use crate::stats;
use crate::units::{
    Celsius, DegreesCompass, Hectopascals, Meters, MetersPerSecond, Millimeters, Percent,
    Probability, UvIndex, WmoCode,
};

/// A model counts as an overall outlier once it is flagged an outlier on at
/// least this fraction of aligned timesteps for temperature, precipitation,
/// or wind (spec §4.5, §9).
const OVERALL_OUTLIER_THRESHOLD: f64 = 0.25;

/// Coordinates across contributing forecasts must agree within this
/// distance, or aggregation refuses to proceed (spec §4.5).
const COORDINATE_AGREEMENT_KM: f64 = 1.0;

/// A model is considered to have reported precipitation at a timestep once
/// the reading exceeds this threshold; used for the ensemble-probability
/// consensus rule (spec §4.5).
const PRECIP_REPORTING_THRESHOLD_MM: f64 = 0.1;

pub fn aggregate(forecasts: Vec<ModelForecast>) -> WeatherResult<AggregatedForecast> {
    if forecasts.is_empty() {
        return Err(WeatherError::InvalidInput("no model forecasts to aggregate".to_string()));
    }

    let base = forecasts[0].coordinates;
    for f in &forecasts {
        if base.distance_km(f.coordinates) > COORDINATE_AGREEMENT_KM {
            return Err(WeatherError::InvalidInput(
                "model forecasts disagree on coordinates by more than 1 km".to_string(),
            ));
        }
    }

    let n = forecasts.len();
    let models: Vec<ModelId> = forecasts.iter().map(|f| f.model).collect();

    let mut hourly_grid: BTreeSet<DateTime<Utc>> =
        forecasts[0].hourly.iter().map(|h| h.timestamp).collect();
    for f in &forecasts[1..] {
        let times: HashSet<DateTime<Utc>> = f.hourly.iter().map(|h| h.timestamp).collect();
        hourly_grid.retain(|t| times.contains(t));
    }
    if hourly_grid.is_empty() {
        return Err(WeatherError::InvalidInput(
            "no overlapping hourly timestamps across model forecasts".to_string(),
        ));
    }

    let mut daily_grid: BTreeSet<NaiveDate> = forecasts[0].daily.iter().map(|d| d.date).collect();
    for f in &forecasts[1..] {
        let dates: HashSet<NaiveDate> = f.daily.iter().map(|d| d.date).collect();
        daily_grid.retain(|d| dates.contains(d));
    }
    if daily_grid.is_empty() {
        return Err(WeatherError::InvalidInput(
            "no overlapping daily dates across model forecasts".to_string(),
        ));
    }

    let hourly_index: Vec<HashMap<DateTime<Utc>, WeatherMetrics>> = forecasts
        .iter()
        .map(|f| f.hourly.iter().map(|h| (h.timestamp, h.metrics)).collect())
        .collect();
    let daily_index: Vec<HashMap<NaiveDate, &DailyForecast>> = forecasts
        .iter()
        .map(|f| f.daily.iter().map(|d| (d.date, d)).collect())
        .collect();

    let grid_start = *hourly_grid.iter().next().unwrap();
    let mut outlier_tally: HashMap<ModelId, [usize; 3]> =
        models.iter().map(|m| (*m, [0usize; 3])).collect();
    let total_steps = hourly_grid.len();

    let mut hourly_points = Vec::with_capacity(hourly_grid.len());
    for timestamp in &hourly_grid {
        let readings: Vec<(ModelId, WeatherMetrics)> = models
            .iter()
            .zip(hourly_index.iter())
            .filter_map(|(m, idx)| idx.get(timestamp).map(|w| (*m, *w)))
            .collect();

        let (consensus, consensus_stats, ranges, flags) = hourly_point(&readings)?;
        for (model, f) in &flags {
            let tally = outlier_tally.get_mut(model).unwrap();
            for (slot, hit) in tally.iter_mut().zip(f.iter()) {
                if *hit {
                    *slot += 1;
                }
            }
        }

        let days_ahead = (timestamp.date_naive() - grid_start.date_naive()).num_days();
        let spread = SpreadInputs {
            temperature_stdev_c: consensus_stats.temperature.stdev,
            wind_range_ms: consensus_stats.wind.range,
            precipitation_ensemble_probability: consensus.precipitation_probability.value(),
            humidity_range_percent: ranges.humidity.max.value() - ranges.humidity.min.value(),
        };
        let outcome = confidence::compute(&consensus_stats, &spread, n, days_ahead);

        hourly_points.push(AggregatedHourlyForecast {
            timestamp: *timestamp,
            consensus,
            confidence: outcome.level,
            consensus_stats,
            ranges,
        });
    }

    let mut hourly_by_date: HashMap<NaiveDate, Vec<AggregatedHourlyForecast>> = HashMap::new();
    for h in &hourly_points {
        hourly_by_date.entry(h.timestamp.date_naive()).or_default().push(h.clone());
    }

    let mut daily_points = Vec::with_capacity(daily_grid.len());
    for (day_index, date) in daily_grid.iter().enumerate() {
        let readings: Vec<(ModelId, &DailyForecast)> = models
            .iter()
            .zip(daily_index.iter())
            .filter_map(|(m, idx)| idx.get(date).map(|d| (*m, *d)))
            .collect();

        let day_hourly = hourly_by_date.get(date).cloned().unwrap_or_default();
        let (consensus, consensus_stats, ranges) = daily_point(&readings, day_hourly)?;

        let spread = SpreadInputs {
            temperature_stdev_c: consensus_stats.temperature.stdev,
            wind_range_ms: consensus_stats.wind.range,
            precipitation_ensemble_probability: consensus.precipitation.probability.value(),
            humidity_range_percent: consensus.humidity.max.value() - consensus.humidity.min.value(),
        };
        let outcome = confidence::compute(&consensus_stats, &spread, n, day_index as i64);

        daily_points.push(AggregatedDailyForecast {
            date: *date,
            consensus,
            confidence: outcome.level,
            consensus_stats,
            ranges,
        });
    }

    let overall_outliers: BTreeSet<ModelId> = outlier_tally
        .iter()
        .filter(|(_, tally)| {
            tally.iter().any(|&c| c as f64 / total_steps as f64 >= OVERALL_OUTLIER_THRESHOLD)
        })
        .map(|(model, _)| *model)
        .collect();

    let weights = model_weights(&models, &overall_outliers);

    let valid_from = *hourly_grid.iter().next().unwrap();
    let valid_to = *hourly_grid.iter().next_back().unwrap() + chrono::Duration::hours(1);
    let confidence_overall = daily_points.first().map(|d| d.confidence).unwrap_or(
        crate::model::ConfidenceLevel::from_score(0.5),
    );

    Ok(AggregatedForecast {
        coordinates: base,
        generated_at: Utc::now(),
        valid_from,
        valid_to,
        models,
        model_forecasts: forecasts,
        hourly: hourly_points,
        daily: daily_points,
        weights,
        confidence: confidence_overall,
    })
}

type HourlyOutlierFlags = (WeatherMetrics, ModelConsensus, HourlyMetricRanges, Vec<(ModelId, [bool; 3])>);

fn hourly_point(readings: &[(ModelId, WeatherMetrics)]) -> WeatherResult<HourlyOutlierFlags> {
    let n = readings.len();
    let temps: Vec<f64> = readings.iter().map(|(_, m)| m.temperature.value()).collect();
    let apparent: Vec<f64> = readings.iter().map(|(_, m)| m.apparent_temperature.value()).collect();
    let precip: Vec<f64> = readings.iter().map(|(_, m)| m.precipitation.value()).collect();
    let precip_prob: Vec<f64> =
        readings.iter().map(|(_, m)| m.precipitation_probability.value()).collect();
    let wind_speed: Vec<f64> = readings.iter().map(|(_, m)| m.wind_speed.value()).collect();
    let wind_dir: Vec<f64> = readings.iter().map(|(_, m)| m.wind_direction.value()).collect();
    let wind_gust: Vec<f64> =
        readings.iter().filter_map(|(_, m)| m.wind_gust.map(|g| g.value())).collect();
    let humidity: Vec<f64> = readings.iter().map(|(_, m)| m.humidity.value()).collect();
    let pressure: Vec<f64> = readings.iter().map(|(_, m)| m.pressure.value()).collect();
    let cloud: Vec<f64> = readings.iter().map(|(_, m)| m.cloud_cover.value()).collect();
    let visibility: Vec<f64> = readings.iter().map(|(_, m)| m.visibility.value()).collect();
    let uv: Vec<f64> = readings.iter().map(|(_, m)| m.uv_index.value()).collect();
    let codes: Vec<WmoCode> = readings.iter().map(|(_, m)| m.weather_code).collect();

    let temp_stats = stats::stats(&temps);
    let precip_stats = stats::stats(&precip);
    let wind_stats = stats::stats(&wind_speed);

    let temp_outliers = stats::outlier_flags(&temps);
    let precip_outliers = stats::outlier_flags(&precip);
    let wind_outliers = stats::outlier_flags(&wind_speed);

    let models_in_agreement: BTreeSet<ModelId> = readings
        .iter()
        .enumerate()
        .filter(|(i, _)| !temp_outliers[*i])
        .map(|(_, (m, _))| *m)
        .collect();
    let outlier_models: BTreeSet<ModelId> = readings
        .iter()
        .enumerate()
        .filter(|(i, _)| temp_outliers[*i])
        .map(|(_, (m, _))| *m)
        .collect();

    let flags: Vec<(ModelId, [bool; 3])> = readings
        .iter()
        .enumerate()
        .map(|(i, (model, _))| (*model, [temp_outliers[i], precip_outliers[i], wind_outliers[i]]))
        .collect();

    let consensus = WeatherMetrics {
        temperature: Celsius::new(stats::trimmed_mean(&temps))?,
        apparent_temperature: Celsius::new(stats::trimmed_mean(&apparent))?,
        humidity: Percent::new(stats::mean(&humidity))?,
        pressure: Hectopascals::new(stats::mean(&pressure))?,
        wind_speed: MetersPerSecond::new(stats::median(&wind_speed))?,
        wind_direction: DegreesCompass::new(stats::circular_mean_deg(&wind_dir))?,
        wind_gust: if wind_gust.is_empty() {
            None
        } else {
            Some(MetersPerSecond::new(wind_gust.iter().copied().fold(0.0, f64::max))?)
        },
        precipitation: Millimeters::new(stats::mean(&precip))?,
        precipitation_probability: Probability::new(
            precip.iter().filter(|&&v| v > PRECIP_REPORTING_THRESHOLD_MM).count() as f64
                / n as f64,
        )?,
        cloud_cover: Percent::new(stats::mean(&cloud))?,
        visibility: Meters::new(stats::mean(&visibility))?,
        uv_index: UvIndex::new(uv.iter().copied().fold(0.0, f64::max))?,
        weather_code: plurality_code(&codes),
    };

    let (hum_min, hum_max) = stats::min_max(&humidity);
    let (pres_min, pres_max) = stats::min_max(&pressure);
    let (cloud_min, cloud_max) = stats::min_max(&cloud);
    let (uv_min, uv_max) = stats::min_max(&uv);

    let ranges = HourlyMetricRanges {
        temperature: MinMax { min: Celsius::new(temp_stats.min)?, max: Celsius::new(temp_stats.max)? },
        precipitation: MinMax {
            min: Millimeters::new(precip_stats.min)?,
            max: Millimeters::new(precip_stats.max)?,
        },
        wind_speed: MinMax {
            min: MetersPerSecond::new(wind_stats.min)?,
            max: MetersPerSecond::new(wind_stats.max)?,
        },
        humidity: MinMax { min: Percent::new(hum_min)?, max: Percent::new(hum_max)? },
        pressure: MinMax { min: Hectopascals::new(pres_min)?, max: Hectopascals::new(pres_max)? },
        cloud_cover: MinMax { min: Percent::new(cloud_min)?, max: Percent::new(cloud_max)? },
        uv_index: MinMax { min: UvIndex::new(uv_min)?, max: UvIndex::new(uv_max)? },
    };

    let consensus_stats = ModelConsensus {
        agreement_score: models_in_agreement.len() as f64 / n as f64,
        models_in_agreement,
        outlier_models,
        temperature: temp_stats,
        precipitation: precip_stats,
        wind: wind_stats,
    };

    Ok((consensus, consensus_stats, ranges, flags))
}

fn daily_point(
    readings: &[(ModelId, &DailyForecast)],
    hourly: Vec<AggregatedHourlyForecast>,
) -> WeatherResult<(DailyForecast, ModelConsensus, DailyMetricRanges)> {
    let n = readings.len();
    let mins: Vec<f64> = readings.iter().map(|(_, d)| d.temperature.min.value()).collect();
    let maxs: Vec<f64> = readings.iter().map(|(_, d)| d.temperature.max.value()).collect();
    let temp_repr: Vec<f64> =
        mins.iter().zip(maxs.iter()).map(|(lo, hi)| (lo + hi) / 2.0).collect();
    let precip_totals: Vec<f64> = readings.iter().map(|(_, d)| d.precipitation.total.value()).collect();
    let precip_probs: Vec<f64> = readings.iter().map(|(_, d)| d.precipitation.probability.value()).collect();
    let precip_hours: Vec<f64> =
        readings.iter().map(|(_, d)| d.precipitation.hours_of_rain as f64).collect();
    let wind_avgs: Vec<f64> = readings.iter().map(|(_, d)| d.wind.avg.value()).collect();
    let wind_maxs: Vec<f64> = readings.iter().map(|(_, d)| d.wind.max.value()).collect();
    let wind_dirs: Vec<f64> = readings.iter().map(|(_, d)| d.wind.dominant_direction.value()).collect();
    let humidity_mins: Vec<f64> = readings.iter().map(|(_, d)| d.humidity.min.value()).collect();
    let humidity_maxs: Vec<f64> = readings.iter().map(|(_, d)| d.humidity.max.value()).collect();
    let pressure_mins: Vec<f64> = readings.iter().map(|(_, d)| d.pressure.min.value()).collect();
    let pressure_maxs: Vec<f64> = readings.iter().map(|(_, d)| d.pressure.max.value()).collect();
    let cloud_avgs: Vec<f64> = readings.iter().map(|(_, d)| d.cloud_cover.avg.value()).collect();
    let cloud_maxs: Vec<f64> = readings.iter().map(|(_, d)| d.cloud_cover.max.value()).collect();
    let uv_maxs: Vec<f64> = readings.iter().map(|(_, d)| d.uv_max.value()).collect();
    let sunrises: Vec<DateTime<Utc>> = readings.iter().map(|(_, d)| d.sun.sunrise).collect();
    let sunsets: Vec<DateTime<Utc>> = readings.iter().map(|(_, d)| d.sun.sunset).collect();
    let daylight: Vec<f64> = readings.iter().map(|(_, d)| d.sun.daylight_seconds as f64).collect();
    let codes: Vec<WmoCode> = readings.iter().map(|(_, d)| d.dominant_weather_code).collect();

    let temp_stats = stats::stats(&temp_repr);
    let precip_stats = stats::stats(&precip_totals);
    let wind_stats = stats::stats(&wind_avgs);

    let temp_outliers = stats::outlier_flags(&temp_repr);
    let models_in_agreement: BTreeSet<ModelId> = readings
        .iter()
        .enumerate()
        .filter(|(i, _)| !temp_outliers[*i])
        .map(|(_, (m, _))| *m)
        .collect();
    let outlier_models: BTreeSet<ModelId> = readings
        .iter()
        .enumerate()
        .filter(|(i, _)| temp_outliers[*i])
        .map(|(_, (m, _))| *m)
        .collect();

    let consensus_stats = ModelConsensus {
        agreement_score: models_in_agreement.len() as f64 / n as f64,
        models_in_agreement,
        outlier_models,
        temperature: temp_stats,
        precipitation: precip_stats,
        wind: wind_stats,
    };

    let consensus = DailyForecast {
        date: readings[0].1.date,
        temperature: MinMax {
            min: Celsius::new(stats::trimmed_mean(&mins))?,
            max: Celsius::new(stats::trimmed_mean(&maxs))?,
        },
        humidity: MinMax {
            min: Percent::new(stats::mean(&humidity_mins))?,
            max: Percent::new(stats::mean(&humidity_maxs))?,
        },
        pressure: MinMax {
            min: Hectopascals::new(stats::mean(&pressure_mins))?,
            max: Hectopascals::new(stats::mean(&pressure_maxs))?,
        },
        precipitation: PrecipitationSummary {
            total: Millimeters::new(stats::mean(&precip_totals))?,
            probability: Probability::new(stats::mean(&precip_probs))?,
            hours_of_rain: stats::mean(&precip_hours).round().clamp(0.0, 24.0) as u8,
        },
        wind: WindSummary {
            avg: MetersPerSecond::new(stats::median(&wind_avgs))?,
            max: MetersPerSecond::new(wind_maxs.iter().copied().fold(0.0, f64::max))?,
            dominant_direction: DegreesCompass::new(stats::circular_mean_deg(&wind_dirs))?,
        },
        cloud_cover: CloudCoverSummary {
            avg: Percent::new(stats::mean(&cloud_avgs))?,
            max: Percent::new(cloud_maxs.iter().copied().fold(0.0, f64::max))?,
        },
        uv_max: UvIndex::new(uv_maxs.iter().copied().fold(0.0, f64::max))?,
        sun: SunTimes {
            sunrise: mean_datetime(&sunrises),
            sunset: mean_datetime(&sunsets),
            daylight_seconds: stats::mean(&daylight).max(0.0) as u32,
        },
        dominant_weather_code: plurality_code(&codes),
        hourly,
    };

    let (temp_lo, temp_hi) = stats::min_max(&temp_repr);
    let (precip_lo, precip_hi) = stats::min_max(&precip_totals);
    let (wind_lo, wind_hi) = stats::min_max(&wind_avgs);
    let ranges = DailyMetricRanges {
        temperature: MinMax { min: Celsius::new(temp_lo)?, max: Celsius::new(temp_hi)? },
        precipitation_total: MinMax {
            min: Millimeters::new(precip_lo)?,
            max: Millimeters::new(precip_hi)?,
        },
        wind_avg: MinMax { min: MetersPerSecond::new(wind_lo)?, max: MetersPerSecond::new(wind_hi)? },
    };

    Ok((consensus, consensus_stats, ranges))
}

fn mean_datetime(times: &[DateTime<Utc>]) -> DateTime<Utc> {
    if times.is_empty() {
        return Utc::now();
    }
    let avg = times.iter().map(|t| t.timestamp()).sum::<i64>() / times.len() as i64;
    Utc.timestamp_opt(avg, 0).single().unwrap_or_else(Utc::now)
}

/// Plurality vote over WMO codes; ties broken by the larger code value
/// (spec §4.5).
fn plurality_code(codes: &[WmoCode]) -> WmoCode {
    let mut counts: HashMap<u16, usize> = HashMap::new();
    for c in codes {
        *counts.entry(c.value()).or_insert(0) += 1;
    }
    let max_count = counts.values().copied().max().unwrap_or(0);
    let winner = counts
        .iter()
        .filter(|(_, &c)| c == max_count)
        .map(|(&code, _)| code)
        .max()
        .unwrap_or(0);
    WmoCode::new(winner).unwrap_or(WmoCode::new(0).unwrap())
}

/// Equal baseline weight, halved for models flagged as overall outliers,
/// then renormalized to sum to 1 (spec §4.5).
fn model_weights(models: &[ModelId], overall_outliers: &BTreeSet<ModelId>) -> Vec<ModelWeight> {
    let n = models.len();
    let baseline = 1.0 / n as f64;
    let raw: Vec<(ModelId, f64)> = models
        .iter()
        .map(|m| {
            let w = if overall_outliers.contains(m) { baseline * 0.5 } else { baseline };
            (*m, w)
        })
        .collect();
    let total: f64 = raw.iter().map(|(_, w)| *w).sum();

    raw.into_iter()
        .map(|(model, w)| {
            let rationale = if overall_outliers.contains(&model) {
                "flagged an outlier on a quarter or more of aligned timesteps; weight halved"
                    .to_string()
            } else {
                "tracked the consensus across aligned timesteps".to_string()
            };
            ModelWeight { model, weight: w / total, rationale }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinates;
    use chrono::Duration;

    fn metrics(temp: f64, precip: f64, wind: f64, code: u16) -> WeatherMetrics {
        WeatherMetrics {
            temperature: Celsius::new(temp).unwrap(),
            apparent_temperature: Celsius::new(temp).unwrap(),
            humidity: Percent::new(50.0).unwrap(),
            pressure: Hectopascals::new(1013.0).unwrap(),
            wind_speed: MetersPerSecond::new(wind).unwrap(),
            wind_direction: DegreesCompass::new(180.0).unwrap(),
            wind_gust: None,
            precipitation: Millimeters::new(precip).unwrap(),
            precipitation_probability: Probability::new(0.1).unwrap(),
            cloud_cover: Percent::new(20.0).unwrap(),
            visibility: Meters::new(10_000.0).unwrap(),
            uv_index: UvIndex::new(2.0).unwrap(),
            weather_code: WmoCode::new(code).unwrap(),
        }
    }

    fn sample_forecast(model: ModelId, temp: f64) -> ModelForecast {
        let coords = Coordinates::new(10.0, 10.0).unwrap();
        let start = Utc::now();
        let hourly: Vec<HourlyForecast> = (0..24)
            .map(|h| HourlyForecast {
                timestamp: start + Duration::hours(h),
                metrics: metrics(temp, 0.0, 3.0, 1),
            })
            .collect();
        let daily = vec![DailyForecast {
            date: start.date_naive(),
            temperature: MinMax { min: Celsius::new(temp - 2.0).unwrap(), max: Celsius::new(temp + 2.0).unwrap() },
            humidity: MinMax { min: Percent::new(40.0).unwrap(), max: Percent::new(60.0).unwrap() },
            pressure: MinMax { min: Hectopascals::new(1010.0).unwrap(), max: Hectopascals::new(1015.0).unwrap() },
            precipitation: PrecipitationSummary {
                total: Millimeters::new(0.0).unwrap(),
                probability: Probability::new(0.1).unwrap(),
                hours_of_rain: 0,
            },
            wind: WindSummary {
                avg: MetersPerSecond::new(3.0).unwrap(),
                max: MetersPerSecond::new(5.0).unwrap(),
                dominant_direction: DegreesCompass::new(180.0).unwrap(),
            },
            cloud_cover: CloudCoverSummary { avg: Percent::new(20.0).unwrap(), max: Percent::new(30.0).unwrap() },
            uv_max: UvIndex::new(3.0).unwrap(),
            sun: SunTimes { sunrise: start, sunset: start + Duration::hours(10), daylight_seconds: 36000 },
            dominant_weather_code: WmoCode::new(1).unwrap(),
            hourly: hourly.clone(),
        }];
        ModelForecast {
            model,
            coordinates: coords,
            generated_at: start,
            valid_from: start,
            valid_to: start + Duration::hours(24),
            hourly,
            daily,
        }
    }

    #[test]
    fn rejects_empty_forecast_list() {
        let result = aggregate(vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn single_forecast_has_full_agreement() {
        let f = sample_forecast(ModelId::Ecmwf, 20.0);
        let agg = aggregate(vec![f]).unwrap();
        assert_eq!(agg.hourly[0].consensus_stats.agreement_score, 1.0);
        assert!(agg.hourly[0].consensus_stats.outlier_models.is_empty());
    }

    #[test]
    fn rejects_coordinates_that_disagree() {
        let mut far = sample_forecast(ModelId::Gfs, 20.0);
        far.coordinates = Coordinates::new(40.0, 40.0).unwrap();
        let result = aggregate(vec![sample_forecast(ModelId::Ecmwf, 20.0), far]);
        assert!(result.is_err());
    }

    #[test]
    fn agreeing_models_all_stay_in_agreement() {
        let forecasts = vec![
            sample_forecast(ModelId::Ecmwf, 20.0),
            sample_forecast(ModelId::Gfs, 20.5),
            sample_forecast(ModelId::Icon, 19.5),
        ];
        let agg = aggregate(forecasts).unwrap();
        assert_eq!(agg.hourly[0].consensus_stats.models_in_agreement.len(), 3);
        assert!(agg.hourly[0].consensus_stats.outlier_models.is_empty());
    }

    #[test]
    fn weights_sum_to_one() {
        let forecasts = vec![
            sample_forecast(ModelId::Ecmwf, 20.0),
            sample_forecast(ModelId::Gfs, 20.0),
            sample_forecast(ModelId::Icon, 35.0),
        ];
        let agg = aggregate(forecasts).unwrap();
        let total: f64 = agg.weights.iter().map(|w| w.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
