//! Narrative Builder (spec §4.7).
//!
//! Turns an [`AggregatedForecast`] into plain-English text: a one-sentence
//! headline, a short body, alert strings, and a note per outlier model.
//! Pure and total — it never fails, degrading to neutral output on an
//! empty aggregate (spec §7).

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{AggregatedForecast, AggregatedHourlyForecast};
use crate::units::WeatherCategory;

const HEADLINE_WINDOW_HOURS: usize = 48;
const AGREEMENT_THRESHOLD: f64 = 0.7;
const EXTENDED_RANGE_DAYS: usize = 5;
const HIGH_TEMP_ALERT_C: f64 = 35.0;
const LOW_TEMP_ALERT_C: f64 = -10.0;
const HEAVY_PRECIP_ALERT_MM: f64 = 50.0;
const HIGH_WIND_ALERT_MS: f64 = 15.0;
const NOTABLE_WIND_MS: f64 = 10.0;
const TEMPERATURE_DISAGREEMENT_C: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narrative {
    pub headline: String,
    pub body: String,
    pub alerts: Vec<String>,
    pub model_notes: Vec<String>,
}

pub fn narrative(aggregated: &AggregatedForecast) -> Narrative {
    Narrative {
        headline: build_headline(aggregated),
        body: build_body(aggregated),
        alerts: build_alerts(aggregated),
        model_notes: build_model_notes(aggregated),
    }
}

fn build_headline(aggregated: &AggregatedForecast) -> String {
    let window: Vec<&AggregatedHourlyForecast> =
        aggregated.hourly.iter().take(HEADLINE_WINDOW_HOURS).collect();
    if window.is_empty() {
        return "No forecast data is available.".to_string();
    }

    let (dominant, agreement) = dominant_category_over_window(&window);
    let day_name = window.last().unwrap().timestamp.format("%A");

    if agreement >= AGREEMENT_THRESHOLD {
        format!("Models agree on {} conditions through {day_name}", dominant.as_str())
    } else {
        format!("Models disagree on conditions for {day_name}")
    }
}

fn dominant_category_over_window(
    window: &[&AggregatedHourlyForecast],
) -> (WeatherCategory, f64) {
    let mut hours_by_category: HashMap<WeatherCategory, usize> = HashMap::new();
    for point in window {
        *hours_by_category.entry(point.consensus.weather_code.category()).or_insert(0) += 1;
    }
    let dominant = hours_by_category
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(category, _)| *category)
        .unwrap_or(WeatherCategory::Dry);
    let agreement =
        window.iter().map(|p| p.consensus_stats.agreement_score).sum::<f64>() / window.len() as f64;
    (dominant, agreement)
}

fn build_body(aggregated: &AggregatedForecast) -> String {
    let mut sentences = Vec::new();

    if let Some(today) = aggregated.daily.first() {
        sentences.push(format!(
            "Today's temperature ranges from {:.0}\u{B0}C to {:.0}\u{B0}C.",
            today.consensus.temperature.min.value(),
            today.consensus.temperature.max.value(),
        ));
    }

    if let Some((day, probability)) = peak_precipitation_day(aggregated) {
        sentences.push(format!(
            "Peak precipitation probability is {:.0}% on {}.",
            probability * 100.0,
            day.format("%A"),
        ));
    }

    let max_wind = aggregated
        .daily
        .iter()
        .map(|d| d.consensus.wind.max.value())
        .fold(0.0_f64, f64::max);
    if max_wind >= NOTABLE_WIND_MS {
        sentences.push(format!("Expect wind gusting up to {max_wind:.0} m/s."));
    }

    sentences.push(format!(
        "Overall confidence in this forecast is {}.",
        aggregated.confidence.level.as_str(),
    ));

    sentences.join(" ")
}

fn peak_precipitation_day(aggregated: &AggregatedForecast) -> Option<(NaiveDate, f64)> {
    aggregated
        .daily
        .iter()
        .map(|d| (d.date, d.consensus.precipitation.probability.value()))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
}

fn build_alerts(aggregated: &AggregatedForecast) -> Vec<String> {
    let mut alerts = Vec::new();

    if aggregated.daily.len() > EXTENDED_RANGE_DAYS {
        alerts.push("Extended range beyond 5 days carries higher uncertainty.".to_string());
    }

    for day in &aggregated.daily {
        let c = &day.consensus;
        let day_name = day.date.format("%A");
        if c.dominant_weather_code.is_severe() {
            alerts.push(format!("Severe weather expected on {day_name}."));
        }
        if c.temperature.max.value() > HIGH_TEMP_ALERT_C {
            alerts.push(format!("Temperatures above 35\u{B0}C expected on {day_name}."));
        }
        if c.temperature.min.value() < LOW_TEMP_ALERT_C {
            alerts.push(format!("Temperatures below -10\u{B0}C expected on {day_name}."));
        }
        if c.precipitation.total.value() > HEAVY_PRECIP_ALERT_MM {
            alerts.push(format!("Heavy precipitation over 50 mm expected on {day_name}."));
        }
        if c.wind.max.value() > HIGH_WIND_ALERT_MS {
            alerts.push(format!("High winds over 15 m/s expected on {day_name}."));
        }
    }

    let mut disagreement_days: BTreeSet<NaiveDate> = BTreeSet::new();
    for hour in &aggregated.hourly {
        if hour.consensus_stats.temperature.stdev > TEMPERATURE_DISAGREEMENT_C {
            disagreement_days.insert(hour.timestamp.date_naive());
        }
    }
    for (day_index, date) in aggregated.daily.iter().map(|d| d.date).enumerate() {
        if disagreement_days.contains(&date) {
            alerts.push(format!("Significant model disagreement on day {day_index}."));
        }
    }

    alerts
}

/// A model is notable for the narrative once its consensus weight sits
/// below the mean — the halved-weight tier the Aggregator assigns to
/// overall outliers (spec §4.5, §4.7).
fn build_model_notes(aggregated: &AggregatedForecast) -> Vec<String> {
    if aggregated.weights.is_empty() || aggregated.hourly.is_empty() {
        return Vec::new();
    }

    let mean_weight =
        aggregated.weights.iter().map(|w| w.weight).sum::<f64>() / aggregated.weights.len() as f64;
    let first_timestamp = aggregated.hourly[0].timestamp;
    let consensus = &aggregated.hourly[0].consensus;

    let mut notes = Vec::new();
    for weight in &aggregated.weights {
        if weight.weight >= mean_weight - 1e-9 {
            continue;
        }
        let Some(forecast) = aggregated.model_forecasts.iter().find(|f| f.model == weight.model) else {
            continue;
        };
        let Some(hour) = forecast.hourly.iter().find(|h| h.timestamp == first_timestamp) else {
            continue;
        };

        let temp_diff = hour.metrics.temperature.value() - consensus.temperature.value();
        let precip_diff = hour.metrics.precipitation.value() - consensus.precipitation.value();

        let (description, value, unit) = if temp_diff.abs() >= precip_diff.abs() {
            if temp_diff >= 0.0 {
                ("warmer", hour.metrics.temperature.value(), "\u{B0}C")
            } else {
                ("cooler", hour.metrics.temperature.value(), "\u{B0}C")
            }
        } else if precip_diff >= 0.0 {
            ("wetter", hour.metrics.precipitation.value(), "mm")
        } else {
            ("drier", hour.metrics.precipitation.value(), "mm")
        };

        notes.push(format!(
            "{} is notably {description} at {value:.1}{unit}.",
            weight.model.display_name(),
        ));
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::model::{
        CloudCoverSummary, Coordinates, DailyForecast, HourlyForecast, MinMax, ModelForecast,
        ModelId, PrecipitationSummary, SunTimes, WeatherMetrics, WindSummary,
    };
    use crate::units::{
        Celsius, DegreesCompass, Hectopascals, Meters, MetersPerSecond, Millimeters, Percent,
        Probability, UvIndex, WmoCode,
    };
    use chrono::{Duration, Utc};

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
        let hourly: Vec<HourlyForecast> = (0..48)
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
            hourly: hourly[..24].to_vec(),
        }];
        ModelForecast {
            model,
            coordinates: coords,
            generated_at: start,
            valid_from: start,
            valid_to: start + Duration::hours(48),
            hourly,
            daily,
        }
    }

    #[test]
    fn headline_reports_agreement_when_models_align() {
        let forecasts = vec![
            sample_forecast(ModelId::Ecmwf, 20.0),
            sample_forecast(ModelId::Gfs, 20.2),
            sample_forecast(ModelId::Icon, 19.8),
        ];
        let aggregated = aggregate(forecasts).unwrap();
        let n = narrative(&aggregated);
        assert!(n.headline.starts_with("Models agree on"), "{}", n.headline);
    }

    #[test]
    fn body_always_mentions_confidence() {
        let forecasts = vec![sample_forecast(ModelId::Ecmwf, 20.0)];
        let aggregated = aggregate(forecasts).unwrap();
        let n = narrative(&aggregated);
        assert!(n.body.contains("confidence"));
    }

    #[test]
    fn hot_outlier_gets_a_model_note() {
        let forecasts = vec![
            sample_forecast(ModelId::Ecmwf, 20.0),
            sample_forecast(ModelId::Gfs, 20.0),
            sample_forecast(ModelId::Icon, 20.0),
            sample_forecast(ModelId::Gem, 35.0),
        ];
        let aggregated = aggregate(forecasts).unwrap();
        let n = narrative(&aggregated);
        assert!(n.model_notes.iter().any(|note| note.contains("GEM") && note.contains("warmer")));
    }
}
