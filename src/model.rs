//! Shared data model (spec §3): locations, per-model forecasts, and the
//! consensus/aggregated forecast that the rest of the engine is built
//! around. These are plain immutable value types; there is no in-place
//! mutation anywhere in the pipeline (spec §3 "Lifecycle").

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::units::{
    Celsius, DegreesCompass, Hectopascals, Latitude, Longitude, Meters, Millimeters,
    MetersPerSecond, Percent, Probability, UvIndex, WmoCode,
};

/// One of the seven distinct numerical weather prediction models fronted by
/// Open-Meteo (spec §1, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelId {
    Ecmwf,
    Gfs,
    Icon,
    Gem,
    Jma,
    MeteoFrance,
    Ukmo,
}

impl ModelId {
    pub const ALL: [ModelId; 7] = [
        ModelId::Ecmwf,
        ModelId::Gfs,
        ModelId::Icon,
        ModelId::Gem,
        ModelId::Jma,
        ModelId::MeteoFrance,
        ModelId::Ukmo,
    ];

    /// The identifier accepted on the command line and in API requests.
    pub fn slug(self) -> &'static str {
        match self {
            ModelId::Ecmwf => "ecmwf_ifs",
            ModelId::Gfs => "gfs_seamless",
            ModelId::Icon => "icon_seamless",
            ModelId::Gem => "gem_seamless",
            ModelId::Jma => "jma_seamless",
            ModelId::MeteoFrance => "meteofrance_seamless",
            ModelId::Ukmo => "ukmo_seamless",
        }
    }

    pub fn from_slug(slug: &str) -> Option<ModelId> {
        ModelId::ALL.into_iter().find(|m| m.slug() == slug)
    }

    /// Human-readable name used by narrative model notes (spec §4.7).
    pub fn display_name(self) -> &'static str {
        match self {
            ModelId::Ecmwf => "ECMWF IFS",
            ModelId::Gfs => "NOAA GFS",
            ModelId::Icon => "DWD ICON",
            ModelId::Gem => "CMC GEM",
            ModelId::Jma => "JMA GSM",
            ModelId::MeteoFrance => "Météo-France ARPEGE",
            ModelId::Ukmo => "UK Met Office UM",
        }
    }
}

/// Geographic coordinates, tagged to prevent accidental latitude/longitude
/// swaps (spec §3, §9).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: Latitude,
    pub longitude: Longitude,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, crate::error::WeatherError> {
        Ok(Coordinates {
            latitude: Latitude::new(latitude)?,
            longitude: Longitude::new(longitude)?,
        })
    }

    /// Great-circle distance in kilometers (haversine), used by the
    /// Aggregator's "coordinates agree within 1 km" precondition.
    pub fn distance_km(self, other: Coordinates) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let lat1 = self.latitude.value().to_radians();
        let lat2 = other.latitude.value().to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude.value() - self.longitude.value()).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_KM * c
    }
}

/// Result of resolving a free-text query to a canonical location (spec §4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingResult {
    pub name: String,
    pub coordinates: Coordinates,
    pub country: String,
    pub country_code: String,
    pub region: Option<String>,
    pub timezone: String,
    pub elevation: Option<f64>,
    pub population: Option<u64>,
}

/// Instantaneous weather reading (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherMetrics {
    pub temperature: Celsius,
    pub apparent_temperature: Celsius,
    pub humidity: Percent,
    pub pressure: Hectopascals,
    pub wind_speed: MetersPerSecond,
    pub wind_direction: DegreesCompass,
    pub wind_gust: Option<MetersPerSecond>,
    pub precipitation: Millimeters,
    pub precipitation_probability: Probability,
    pub cloud_cover: Percent,
    pub visibility: Meters,
    pub uv_index: UvIndex,
    pub weather_code: WmoCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub timestamp: DateTime<Utc>,
    pub metrics: WeatherMetrics,
}

/// A min/max pair for a single metric, reused for both per-day summary
/// ranges and per-timestep cross-model ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax<T> {
    pub min: T,
    pub max: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationSummary {
    pub total: Millimeters,
    pub probability: Probability,
    pub hours_of_rain: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSummary {
    pub avg: MetersPerSecond,
    pub max: MetersPerSecond,
    pub dominant_direction: DegreesCompass,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloudCoverSummary {
    pub avg: Percent,
    pub max: Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub daylight_seconds: u32,
}

/// Daily summary plus the 24 hourly slices that compose it (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temperature: MinMax<Celsius>,
    pub humidity: MinMax<Percent>,
    pub pressure: MinMax<Hectopascals>,
    pub precipitation: PrecipitationSummary,
    pub wind: WindSummary,
    pub cloud_cover: CloudCoverSummary,
    pub uv_max: UvIndex,
    pub sun: SunTimes,
    pub dominant_weather_code: WmoCode,
    pub hourly: Vec<HourlyForecast>,
}

/// One model's forecast for a location over its validity window (spec §3,
/// §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelForecast {
    pub model: ModelId,
    pub coordinates: Coordinates,
    pub generated_at: DateTime<Utc>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub hourly: Vec<HourlyForecast>,
    pub daily: Vec<DailyForecast>,
}

/// Mean/median/min/max/stdev/range across a set of per-model values at one
/// timestep (spec §3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub stdev: f64,
    pub range: f64,
}

/// Per-timestep agreement classification and statistics (spec §3, §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConsensus {
    pub agreement_score: f64,
    pub models_in_agreement: BTreeSet<ModelId>,
    pub outlier_models: BTreeSet<ModelId>,
    pub temperature: MetricStatistics,
    pub precipitation: MetricStatistics,
    pub wind: MetricStatistics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl ConfidenceLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLabel::High => "high",
            ConfidenceLabel::Medium => "medium",
            ConfidenceLabel::Low => "low",
        }
    }
}

/// Bounded [0,1] score with a derived qualitative level (spec §3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceLevel {
    pub level: ConfidenceLabel,
    pub score: f64,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        let level = if score >= 0.8 {
            ConfidenceLabel::High
        } else if score >= 0.5 {
            ConfidenceLabel::Medium
        } else {
            ConfidenceLabel::Low
        };
        ConfidenceLevel { level, score }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyMetricRanges {
    pub temperature: MinMax<Celsius>,
    pub precipitation: MinMax<Millimeters>,
    pub wind_speed: MinMax<MetersPerSecond>,
    pub humidity: MinMax<Percent>,
    pub pressure: MinMax<Hectopascals>,
    pub cloud_cover: MinMax<Percent>,
    pub uv_index: MinMax<UvIndex>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedHourlyForecast {
    pub timestamp: DateTime<Utc>,
    pub consensus: WeatherMetrics,
    pub confidence: ConfidenceLevel,
    pub consensus_stats: ModelConsensus,
    pub ranges: HourlyMetricRanges,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetricRanges {
    pub temperature: MinMax<Celsius>,
    pub precipitation_total: MinMax<Millimeters>,
    pub wind_avg: MinMax<MetersPerSecond>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDailyForecast {
    pub date: NaiveDate,
    pub consensus: DailyForecast,
    pub confidence: ConfidenceLevel,
    pub consensus_stats: ModelConsensus,
    pub ranges: DailyMetricRanges,
}

/// A model's contribution weight to the consensus, with a short rationale
/// (spec §3, §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeight {
    pub model: ModelId,
    pub weight: f64,
    pub rationale: String,
}

/// The single consensus forecast synthesized from N model forecasts (spec
/// §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedForecast {
    pub coordinates: Coordinates,
    pub generated_at: DateTime<Utc>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub models: Vec<ModelId>,
    pub model_forecasts: Vec<ModelForecast>,
    pub hourly: Vec<AggregatedHourlyForecast>,
    pub daily: Vec<AggregatedDailyForecast>,
    pub weights: Vec<ModelWeight>,
    pub confidence: ConfidenceLevel,
}
