//! Error taxonomy for the core engine (spec §7).
//!
//! Errors are values, not exceptions: every variant carries a kind tag (via
//! [`WeatherError::kind`]) and a short [`WeatherError::user_message`]
//! suitable for direct display. Debug detail (status codes, body excerpts,
//! raw upstream error text) is carried on the variant itself and is only
//! ever surfaced through `tracing`, never through `user_message`.

use thiserror::Error;

/// The outward error taxonomy surfaced to CLI/API callers (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    RateLimited,
    ServiceUnavailable,
    Cancelled,
    InternalError,
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("no location found for '{query}'")]
    GeocodingNotFound { query: String, suggestions: Vec<String> },

    #[error("query '{query}' matched multiple locations with similar confidence")]
    GeocodingAmbiguous { query: String },

    #[error("invalid geocoding query: {message}")]
    GeocodingInvalidInput { message: String },

    #[error("geocoding service error: {message}")]
    GeocodingServiceError { message: String },

    #[error("upstream rate limited the request{}", retry_after.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    ApiRateLimited {
        model: Option<String>,
        retry_after: Option<u64>,
    },

    #[error("request to model '{model}' timed out")]
    ApiTimeout { model: String },

    #[error("model '{model}' is unavailable: {message}")]
    ApiUnavailable { model: String, message: String },

    #[error("upstream returned an invalid response{}: {body_excerpt}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    ApiInvalidResponse {
        model: Option<String>,
        status: Option<u16>,
        body_excerpt: String,
    },

    #[error("upstream authentication failed: {message}")]
    ApiAuthFailed { message: String },

    #[error("invalid configuration: {message}")]
    ConfigInvalid { message: String },

    #[error("configuration file not found: {path}")]
    ConfigMissing { path: String },

    #[error("failed to parse configuration: {message}")]
    ConfigParseError { message: String },

    #[error("cache read error: {message}")]
    CacheReadError { message: String },

    #[error("cache write error: {message}")]
    CacheWriteError { message: String },

    #[error("cached entry expired")]
    CacheExpired,

    #[error("cached entry is corrupted: {message}")]
    CacheCorrupted { message: String },

    #[error("operation was cancelled")]
    Cancelled,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl WeatherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::GeocodingNotFound { .. } => ErrorKind::NotFound,
            WeatherError::GeocodingAmbiguous { .. } => ErrorKind::InvalidInput,
            WeatherError::GeocodingInvalidInput { .. } => ErrorKind::InvalidInput,
            WeatherError::GeocodingServiceError { .. } => ErrorKind::InternalError,
            WeatherError::ApiRateLimited { .. } => ErrorKind::RateLimited,
            WeatherError::ApiTimeout { .. } => ErrorKind::ServiceUnavailable,
            WeatherError::ApiUnavailable { .. } => ErrorKind::ServiceUnavailable,
            WeatherError::ApiInvalidResponse { .. } => ErrorKind::InvalidInput,
            WeatherError::ApiAuthFailed { .. } => ErrorKind::InternalError,
            WeatherError::ConfigInvalid { .. } => ErrorKind::InternalError,
            WeatherError::ConfigMissing { .. } => ErrorKind::InternalError,
            WeatherError::ConfigParseError { .. } => ErrorKind::InternalError,
            WeatherError::CacheReadError { .. } => ErrorKind::InternalError,
            WeatherError::CacheWriteError { .. } => ErrorKind::InternalError,
            WeatherError::CacheExpired => ErrorKind::InternalError,
            WeatherError::CacheCorrupted { .. } => ErrorKind::InternalError,
            WeatherError::Cancelled => ErrorKind::Cancelled,
            WeatherError::InvalidInput(_) => ErrorKind::InvalidInput,
            WeatherError::Unknown(_) => ErrorKind::InternalError,
        }
    }

    /// Short, display-ready message. Never includes stack traces, raw
    /// upstream bodies, or endpoint URLs.
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::GeocodingNotFound { query, .. } => {
                format!("Couldn't find a location matching '{query}'.")
            }
            WeatherError::GeocodingAmbiguous { query } => {
                format!("'{query}' matches more than one location; please be more specific.")
            }
            WeatherError::GeocodingInvalidInput { .. } => {
                "Please enter a location name or coordinates.".to_string()
            }
            WeatherError::GeocodingServiceError { .. } => {
                "The geocoding service is temporarily unavailable.".to_string()
            }
            WeatherError::ApiRateLimited { .. } => {
                "The weather service is rate-limiting requests; please try again shortly."
                    .to_string()
            }
            WeatherError::ApiTimeout { model } => format!("Timed out waiting for {model}."),
            WeatherError::ApiUnavailable { model, .. } => {
                format!("{model} is temporarily unavailable.")
            }
            WeatherError::ApiInvalidResponse { .. } => {
                "The weather service returned an unexpected response.".to_string()
            }
            WeatherError::ApiAuthFailed { .. } => {
                "Could not authenticate with the weather service.".to_string()
            }
            WeatherError::ConfigInvalid { .. } | WeatherError::ConfigParseError { .. } => {
                "Configuration is invalid.".to_string()
            }
            WeatherError::ConfigMissing { .. } => "Configuration file is missing.".to_string(),
            WeatherError::CacheReadError { .. }
            | WeatherError::CacheWriteError { .. }
            | WeatherError::CacheExpired
            | WeatherError::CacheCorrupted { .. } => {
                "Could not read cached data; fetching fresh data instead.".to_string()
            }
            WeatherError::Cancelled => "The request was cancelled.".to_string(),
            WeatherError::InvalidInput(message) => message.clone(),
            WeatherError::Unknown(_) => "Something went wrong.".to_string(),
        }
    }
}

pub type WeatherResult<T> = Result<T, WeatherError>;
