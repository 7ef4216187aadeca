//! Model Client (spec §4.3).
//!
//! Issues one HTTP GET per (model, location) pair against the Endpoint
//! Resolver's URL, and transposes the provider's column-oriented response
//! into row-shaped [`HourlyForecast`]/[`DailyForecast`] sequences by
//! zipping columns on index, per spec §9's "decode each variable into a
//! typed column, then zip by index" guidance. Grounded on the teacher's
//! `fetch::download_forecast` column-zip idiom, ported to async and given
//! retry/backoff/timeout policy the teacher did not have.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::endpoints::{EndpointResolver, DAILY_VARIABLES, HOURLY_VARIABLES};
use crate::error::{WeatherError, WeatherResult};
use crate::model::{
    CloudCoverSummary, Coordinates, DailyForecast, HourlyForecast, MinMax, ModelForecast, ModelId,
    PrecipitationSummary, SunTimes, WeatherMetrics, WindSummary,
};
use crate::units::{
    Celsius, DegreesCompass, Hectopascals, Meters, Millimeters, MetersPerSecond, Percent,
    Probability, UvIndex, WmoCode,
};

#[derive(Debug, Clone)]
pub struct ModelClientConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for ModelClientConfig {
    fn default() -> Self {
        ModelClientConfig {
            timeout: Duration::from_secs(30),
            max_retries: 1,
            backoff_base: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelClient {
    http: reqwest::Client,
    resolver: EndpointResolver,
    config: ModelClientConfig,
}

impl ModelClient {
    pub fn new(resolver: EndpointResolver, config: ModelClientConfig) -> WeatherResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WeatherError::Unknown(e.to_string()))?;
        Ok(ModelClient { http, resolver, config })
    }

    /// Fetch a single model's forecast for `coordinates`, retrying once on
    /// transient upstream failures (spec §4.3).
    pub async fn fetch(
        &self,
        model: ModelId,
        coordinates: Coordinates,
        forecast_days: u8,
        timezone: &str,
    ) -> WeatherResult<ModelForecast> {
        if !(1..=16).contains(&forecast_days) {
            return Err(WeatherError::InvalidInput(format!(
                "forecast_days must be in [1, 16], got {forecast_days}"
            )));
        }

        let mut attempt: u32 = 0;
        loop {
            let result = self
                .try_fetch(model, coordinates, forecast_days, timezone)
                .await;
            match result {
                Ok(forecast) => return Ok(forecast),
                Err(err) if attempt < self.config.max_retries && is_transient(&err) => {
                    attempt += 1;
                    let backoff = self.config.backoff_base * 2u32.pow(attempt - 1);
                    warn!(model = model.slug(), attempt, ?backoff, "retrying transient model fetch failure");
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_fetch(
        &self,
        model: ModelId,
        coordinates: Coordinates,
        forecast_days: u8,
        timezone: &str,
    ) -> WeatherResult<ModelForecast> {
        let endpoint = self.resolver.endpoint_for(model);
        let url = self.resolver.forecast_url(model);
        let hourly_vars = HOURLY_VARIABLES.join(",");
        let daily_vars = DAILY_VARIABLES.join(",");

        #[derive(Serialize)]
        struct Query<'a> {
            latitude: f64,
            longitude: f64,
            hourly: &'a str,
            daily: &'a str,
            timezone: &'a str,
            forecast_days: u8,
            #[serde(skip_serializing_if = "Option::is_none")]
            models: Option<&'a str>,
        }

        let query = Query {
            latitude: coordinates.latitude.value(),
            longitude: coordinates.longitude.value(),
            hourly: &hourly_vars,
            daily: &daily_vars,
            timezone,
            forecast_days,
            models: endpoint.model_selector(),
        };

        debug!(model = model.slug(), url, "fetching model forecast");

        let response = self.http.get(&url).query(&query).send().await.map_err(|e| {
            if e.is_timeout() {
                WeatherError::ApiTimeout { model: model.slug().to_string() }
            } else {
                WeatherError::ApiUnavailable {
                    model: model.slug().to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(WeatherError::ApiRateLimited {
                model: Some(model.slug().to_string()),
                retry_after,
            });
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::ApiUnavailable {
                model: model.slug().to_string(),
                message: format!("HTTP {status}: {}", excerpt(&body)),
            });
        }
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::ApiInvalidResponse {
                model: Some(model.slug().to_string()),
                status: Some(status.as_u16()),
                body_excerpt: excerpt(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::ApiUnavailable { model: model.slug().to_string(), message: e.to_string() })?;

        let raw: serde_json::Value = serde_json::from_str(&body).map_err(|e| WeatherError::ApiInvalidResponse {
            model: Some(model.slug().to_string()),
            status: Some(status.as_u16()),
            body_excerpt: e.to_string(),
        })?;

        if raw.get("error").and_then(|v| v.as_bool()) == Some(true) {
            let reason = raw
                .get("reason")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown upstream error");
            return Err(WeatherError::ApiInvalidResponse {
                model: Some(model.slug().to_string()),
                status: Some(status.as_u16()),
                body_excerpt: reason.to_string(),
            });
        }

        let parsed: ForecastResponse = serde_json::from_value(raw).map_err(|e| WeatherError::ApiInvalidResponse {
            model: Some(model.slug().to_string()),
            status: Some(status.as_u16()),
            body_excerpt: e.to_string(),
        })?;

        build_model_forecast(model, parsed)
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}

fn is_transient(err: &WeatherError) -> bool {
    matches!(err, WeatherError::ApiUnavailable { .. } | WeatherError::ApiTimeout { .. })
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    latitude: f64,
    longitude: f64,
    timezone: Tz,
    hourly: HourlyColumns,
    daily: DailyColumns,
}

#[derive(Debug, Deserialize)]
struct HourlyColumns {
    time: Vec<String>,
    #[serde(flatten)]
    data: HashMap<String, Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct DailyColumns {
    time: Vec<String>,
    #[serde(flatten)]
    data: HashMap<String, Vec<serde_json::Value>>,
}

trait TakeColumn {
    fn data_mut(&mut self) -> &mut HashMap<String, Vec<serde_json::Value>>;

    fn take_field_array<T: DeserializeOwned>(&mut self, key: &str) -> Vec<Option<T>> {
        self.data_mut()
            .remove(key)
            .and_then(|v| serde_json::from_value(serde_json::Value::Array(v)).ok())
            .unwrap_or_default()
    }
}

impl TakeColumn for HourlyColumns {
    fn data_mut(&mut self) -> &mut HashMap<String, Vec<serde_json::Value>> {
        &mut self.data
    }
}

impl TakeColumn for DailyColumns {
    fn data_mut(&mut self) -> &mut HashMap<String, Vec<serde_json::Value>> {
        &mut self.data
    }
}

/// Forward/backward-fill a column so interior and edge gaps take the
/// nearest available reading (spec §4.3's temperature normalization rule).
fn nearest_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut result = values.to_vec();
    let mut last = None;
    for v in result.iter_mut() {
        match v {
            Some(x) => last = Some(*x),
            None => *v = last,
        }
    }
    let mut next = None;
    for v in result.iter_mut().rev() {
        match v {
            Some(x) => next = Some(*x),
            None => *v = next,
        }
    }
    result
}

fn zero_fill(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(0.0)).collect()
}

fn parse_local_datetime(s: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").ok()?;
    Some(tz.from_local_datetime(&naive).single()?.with_timezone(&Utc))
}

fn build_model_forecast(model: ModelId, resp: ForecastResponse) -> WeatherResult<ModelForecast> {
    let coordinates = Coordinates::new(resp.latitude, resp.longitude)?;
    let tz = resp.timezone;

    let mut hourly_cols = resp.hourly;
    let n_hourly = hourly_cols.time.len();

    let temps = nearest_fill(&hourly_cols.take_field_array::<f64>("temperature_2m"));
    let apparent = nearest_fill(&hourly_cols.take_field_array::<f64>("apparent_temperature"));
    let humidity = zero_fill(&hourly_cols.take_field_array::<f64>("relative_humidity_2m"));
    let pressure = hourly_cols.take_field_array::<f64>("surface_pressure");
    let wind_speed = zero_fill(&hourly_cols.take_field_array::<f64>("wind_speed_10m"));
    let wind_direction = zero_fill(&hourly_cols.take_field_array::<f64>("wind_direction_10m"));
    let wind_gust = hourly_cols.take_field_array::<f64>("wind_gusts_10m");
    let precipitation = zero_fill(&hourly_cols.take_field_array::<f64>("precipitation"));
    let precip_probability = zero_fill(&hourly_cols.take_field_array::<f64>("precipitation_probability"));
    let cloud_cover = zero_fill(&hourly_cols.take_field_array::<f64>("cloud_cover"));
    let visibility = hourly_cols.take_field_array::<f64>("visibility");
    let uv_index = zero_fill(&hourly_cols.take_field_array::<f64>("uv_index"));
    let weather_code = hourly_cols.take_field_array::<u16>("weather_code");

    let mut hourly = Vec::with_capacity(n_hourly);
    for i in 0..n_hourly {
        let Some(temp_c) = temps.get(i).copied().flatten() else {
            // No temperature reading anywhere in the column: drop the row
            // (spec §4.3: "if no value is available, the entire row is
            // dropped").
            continue;
        };
        let Some(timestamp) = hourly_cols.time.get(i).and_then(|t| parse_local_datetime(t, tz)) else {
            continue;
        };
        let apparent_c = apparent.get(i).copied().flatten().unwrap_or(temp_c);
        let code = weather_code
            .get(i)
            .copied()
            .flatten()
            .and_then(|c| WmoCode::new(c).ok())
            .unwrap_or(WmoCode::new(0).unwrap());

        let metrics = WeatherMetrics {
            temperature: Celsius::new(temp_c)?,
            apparent_temperature: Celsius::new(apparent_c)?,
            humidity: Percent::new(humidity.get(i).copied().unwrap_or(50.0).clamp(0.0, 100.0))?,
            pressure: Hectopascals::new(pressure.get(i).copied().flatten().unwrap_or(1013.25).clamp(800.0, 1100.0))?,
            wind_speed: MetersPerSecond::new(wind_speed.get(i).copied().unwrap_or(0.0).max(0.0))?,
            wind_direction: DegreesCompass::new(wind_direction.get(i).copied().unwrap_or(0.0).rem_euclid(360.0))?,
            wind_gust: wind_gust
                .get(i)
                .copied()
                .flatten()
                .map(|v| MetersPerSecond::new(v.max(0.0)))
                .transpose()?,
            precipitation: Millimeters::new(precipitation.get(i).copied().unwrap_or(0.0).max(0.0))?,
            precipitation_probability: Probability::new(
                (precip_probability.get(i).copied().unwrap_or(0.0) / 100.0).clamp(0.0, 1.0),
            )?,
            cloud_cover: Percent::new(cloud_cover.get(i).copied().unwrap_or(0.0).clamp(0.0, 100.0))?,
            visibility: Meters::new(visibility.get(i).copied().flatten().unwrap_or(10_000.0).max(0.0))?,
            uv_index: UvIndex::new(uv_index.get(i).copied().unwrap_or(0.0).max(0.0))?,
            weather_code: code,
        };

        hourly.push(HourlyForecast { timestamp, metrics });
    }

    let daily = build_daily_forecasts(resp.daily, tz, &hourly)?;

    let valid_from = hourly.first().map(|h| h.timestamp).unwrap_or_else(Utc::now);
    let valid_to = hourly
        .last()
        .map(|h| h.timestamp + chrono::Duration::hours(1))
        .unwrap_or(valid_from);

    Ok(ModelForecast {
        model,
        coordinates,
        generated_at: Utc::now(),
        valid_from,
        valid_to,
        hourly,
        daily,
    })
}

fn build_daily_forecasts(
    mut cols: DailyColumns,
    tz: Tz,
    hourly: &[HourlyForecast],
) -> WeatherResult<Vec<DailyForecast>> {
    let n = cols.time.len();
    let temp_max = cols.take_field_array::<f64>("temperature_2m_max");
    let temp_min = cols.take_field_array::<f64>("temperature_2m_min");
    let precip_sum = cols.take_field_array::<f64>("precipitation_sum");
    let precip_prob_max = cols.take_field_array::<f64>("precipitation_probability_max");
    let precip_hours = cols.take_field_array::<f64>("precipitation_hours");
    let wind_speed_max = cols.take_field_array::<f64>("wind_speed_10m_max");
    let wind_dir_dominant = cols.take_field_array::<f64>("wind_direction_10m_dominant");
    let sunrise_raw = cols.take_field_array::<String>("sunrise");
    let sunset_raw = cols.take_field_array::<String>("sunset");
    let daylight_duration = cols.take_field_array::<f64>("daylight_duration");
    let uv_max = cols.take_field_array::<f64>("uv_index_max");
    let weather_code = cols.take_field_array::<u16>("weather_code");

    let mut humidity_by_date: HashMap<NaiveDate, Vec<f64>> = HashMap::new();
    let mut pressure_by_date: HashMap<NaiveDate, Vec<f64>> = HashMap::new();
    let mut cloud_by_date: HashMap<NaiveDate, Vec<f64>> = HashMap::new();
    let mut hourly_by_date: HashMap<NaiveDate, Vec<HourlyForecast>> = HashMap::new();
    for h in hourly {
        let date = h.timestamp.with_timezone(&tz).date_naive();
        humidity_by_date.entry(date).or_default().push(h.metrics.humidity.value());
        pressure_by_date.entry(date).or_default().push(h.metrics.pressure.value());
        cloud_by_date.entry(date).or_default().push(h.metrics.cloud_cover.value());
        hourly_by_date.entry(date).or_default().push(*h);
    }

    let mut daily = Vec::with_capacity(n);
    for i in 0..n {
        let Some(date) = cols.time.get(i).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()) else {
            continue;
        };
        let (Some(max), Some(min)) = (temp_max.get(i).copied().flatten(), temp_min.get(i).copied().flatten())
        else {
            continue;
        };

        let humidity_values = humidity_by_date.get(&date).cloned().unwrap_or_default();
        let pressure_values = pressure_by_date.get(&date).cloned().unwrap_or_default();
        let cloud_values = cloud_by_date.get(&date).cloned().unwrap_or_default();
        let day_hourly = hourly_by_date.get(&date).cloned().unwrap_or_default();

        let sunrise = sunrise_raw
            .get(i)
            .cloned()
            .flatten()
            .and_then(|s| parse_local_datetime(&s, tz))
            .unwrap_or_else(|| tz.from_local_datetime(&date.and_hms_opt(6, 0, 0).unwrap()).unwrap().with_timezone(&Utc));
        let sunset = sunset_raw
            .get(i)
            .cloned()
            .flatten()
            .and_then(|s| parse_local_datetime(&s, tz))
            .unwrap_or_else(|| tz.from_local_datetime(&date.and_hms_opt(18, 0, 0).unwrap()).unwrap().with_timezone(&Utc));

        daily.push(DailyForecast {
            date,
            temperature: MinMax { min: Celsius::new(min)?, max: Celsius::new(max)? },
            humidity: MinMax {
                min: Percent::new(min_of(&humidity_values).unwrap_or(0.0))?,
                max: Percent::new(max_of(&humidity_values).unwrap_or(100.0))?,
            },
            pressure: MinMax {
                min: Hectopascals::new(min_of(&pressure_values).unwrap_or(1013.25))?,
                max: Hectopascals::new(max_of(&pressure_values).unwrap_or(1013.25))?,
            },
            precipitation: PrecipitationSummary {
                total: Millimeters::new(precip_sum.get(i).copied().flatten().unwrap_or(0.0).max(0.0))?,
                probability: Probability::new(
                    (precip_prob_max.get(i).copied().flatten().unwrap_or(0.0) / 100.0).clamp(0.0, 1.0),
                )?,
                hours_of_rain: precip_hours.get(i).copied().flatten().unwrap_or(0.0).round().clamp(0.0, 24.0) as u8,
            },
            wind: WindSummary {
                avg: MetersPerSecond::new(mean_of(&wind_speed_max.get(i).copied().flatten().into_iter().collect::<Vec<_>>()).unwrap_or(0.0))?,
                max: MetersPerSecond::new(wind_speed_max.get(i).copied().flatten().unwrap_or(0.0).max(0.0))?,
                dominant_direction: DegreesCompass::new(
                    wind_dir_dominant.get(i).copied().flatten().unwrap_or(0.0).rem_euclid(360.0),
                )?,
            },
            cloud_cover: CloudCoverSummary {
                avg: Percent::new(mean_of(&cloud_values).unwrap_or(0.0))?,
                max: Percent::new(max_of(&cloud_values).unwrap_or(0.0))?,
            },
            uv_max: UvIndex::new(uv_max.get(i).copied().flatten().unwrap_or(0.0).max(0.0))?,
            sun: SunTimes {
                sunrise,
                sunset,
                daylight_seconds: daylight_duration.get(i).copied().flatten().unwrap_or(0.0).max(0.0) as u32,
            },
            dominant_weather_code: weather_code
                .get(i)
                .copied()
                .flatten()
                .and_then(|c| WmoCode::new(c).ok())
                .unwrap_or(WmoCode::new(0).unwrap()),
            hourly: day_hourly,
        });
    }

    Ok(daily)
}

fn min_of(values: &[f64]) -> Option<f64> {
    values.iter().copied().fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v))))
}

fn max_of(values: &[f64]) -> Option<f64> {
    values.iter().copied().fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
}

fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_fill_fills_interior_and_edge_gaps() {
        let values = vec![None, Some(1.0), None, None, Some(4.0), None];
        let filled = nearest_fill(&values);
        assert_eq!(filled, vec![Some(1.0), Some(1.0), Some(1.0), Some(4.0), Some(4.0), Some(4.0)]);
    }

    #[test]
    fn nearest_fill_leaves_all_none_column_empty() {
        let values = vec![None, None, None];
        assert_eq!(nearest_fill(&values), vec![None, None, None]);
    }

    #[test]
    fn rejects_forecast_days_out_of_range() {
        let resolver = EndpointResolver::default();
        let client = ModelClient::new(resolver, ModelClientConfig::default()).unwrap();
        let coords = Coordinates::new(10.0, 10.0).unwrap();
        let fut = client.fetch(ModelId::Ecmwf, coords, 17, "auto");
        let result = tokio_test::block_on(fut);
        assert!(result.is_err());
    }
}
