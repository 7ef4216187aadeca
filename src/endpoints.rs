//! Endpoint Resolver (spec §4.2, §6, §9).
//!
//! The single point where upstream URLs and the canonical variable lists
//! are declared. Treated as compiled-in configuration; the base URL can be
//! overridden (via [`EndpointResolver::with_base_url`]) so the test suite
//! can point the Model Client and Geocoder at a mock server.

use crate::model::ModelId;

pub const DEFAULT_FORECAST_BASE_URL: &str = "https://api.open-meteo.com";
pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://geocoding-api.open-meteo.com";

/// The canonical hourly variables requested for every model, fixed across
/// models to guarantee schema parity (spec §4.2, §6).
pub const HOURLY_VARIABLES: &[&str] = &[
    "temperature_2m",
    "apparent_temperature",
    "relative_humidity_2m",
    "surface_pressure",
    "wind_speed_10m",
    "wind_direction_10m",
    "wind_gusts_10m",
    "precipitation",
    "precipitation_probability",
    "cloud_cover",
    "visibility",
    "uv_index",
    "weather_code",
];

pub const DAILY_VARIABLES: &[&str] = &[
    "temperature_2m_max",
    "temperature_2m_min",
    "apparent_temperature_max",
    "apparent_temperature_min",
    "precipitation_sum",
    "precipitation_probability_max",
    "precipitation_hours",
    "wind_speed_10m_max",
    "wind_gusts_10m_max",
    "wind_direction_10m_dominant",
    "sunrise",
    "sunset",
    "daylight_duration",
    "uv_index_max",
    "weather_code",
];

/// Where a model's forecast is fetched from: either a dedicated path, or
/// the generic multi-model endpoint with a `models=` selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEndpoint {
    Dedicated { path: &'static str },
    Multiplexed { path: &'static str, selector: &'static str },
}

impl ModelEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            ModelEndpoint::Dedicated { path } => path,
            ModelEndpoint::Multiplexed { path, .. } => path,
        }
    }

    pub fn model_selector(&self) -> Option<&'static str> {
        match self {
            ModelEndpoint::Dedicated { .. } => None,
            ModelEndpoint::Multiplexed { selector, .. } => Some(selector),
        }
    }
}

/// Maps each [`ModelId`] to its upstream URL template, and carries the
/// (possibly overridden) base URLs for the forecast and geocoding hosts.
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    forecast_base_url: String,
    geocoding_base_url: String,
}

impl Default for EndpointResolver {
    fn default() -> Self {
        EndpointResolver {
            forecast_base_url: DEFAULT_FORECAST_BASE_URL.to_string(),
            geocoding_base_url: DEFAULT_GEOCODING_BASE_URL.to_string(),
        }
    }
}

impl EndpointResolver {
    pub fn with_base_urls(forecast_base_url: impl Into<String>, geocoding_base_url: impl Into<String>) -> Self {
        EndpointResolver {
            forecast_base_url: forecast_base_url.into(),
            geocoding_base_url: geocoding_base_url.into(),
        }
    }

    /// JMA is the one model multiplexed behind the generic forecast
    /// endpoint; the rest have dedicated single-model paths (spec §4.2).
    pub fn endpoint_for(&self, model: ModelId) -> ModelEndpoint {
        match model {
            ModelId::Ecmwf => ModelEndpoint::Dedicated { path: "/v1/ecmwf" },
            ModelId::Gfs => ModelEndpoint::Dedicated { path: "/v1/gfs" },
            ModelId::Icon => ModelEndpoint::Dedicated { path: "/v1/dwd-icon" },
            ModelId::Gem => ModelEndpoint::Dedicated { path: "/v1/gem" },
            ModelId::MeteoFrance => ModelEndpoint::Dedicated { path: "/v1/meteofrance" },
            ModelId::Ukmo => ModelEndpoint::Dedicated { path: "/v1/ukmo" },
            ModelId::Jma => ModelEndpoint::Multiplexed {
                path: "/v1/forecast",
                selector: "jma_seamless",
            },
        }
    }

    pub fn forecast_url(&self, model: ModelId) -> String {
        format!("{}{}", self.forecast_base_url, self.endpoint_for(model).path())
    }

    pub fn geocoding_url(&self) -> String {
        format!("{}/v1/search", self.geocoding_base_url)
    }
}
