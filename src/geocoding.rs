//! Geocoder (spec §4.1, §6).
//!
//! Resolves free-text queries to coordinates. A regex fast path recognizes
//! a bare `"lat, lon"` pair without a network round trip; anything else
//! falls through to Open-Meteo's geocoding search endpoint. Grounded on the
//! teacher's `location::resolve_location`, redirected from Nominatim to the
//! Open-Meteo geocoding host and ported to async.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::endpoints::EndpointResolver;
use crate::error::{WeatherError, WeatherResult};
use crate::model::{Coordinates, GeocodingResult};

const DEFAULT_SEARCH_COUNT: u8 = 5;

static COORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*$").unwrap());

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub count: u8,
    pub language: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions { count: DEFAULT_SEARCH_COUNT, language: None }
    }
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    http: reqwest::Client,
    resolver: EndpointResolver,
}

impl Geocoder {
    pub fn new(resolver: EndpointResolver) -> Self {
        Geocoder { http: reqwest::Client::new(), resolver }
    }

    /// Resolve `query` to a single location: the coordinate fast path if it
    /// parses as `"lat, lon"`, else the first upstream search match.
    pub async fn resolve(&self, query: &str, opts: &SearchOptions) -> WeatherResult<GeocodingResult> {
        if let Some(result) = self.coordinate_fast_path(query)? {
            return Ok(result);
        }

        let results = self.search(query, opts).await?;
        results.into_iter().next().ok_or_else(|| WeatherError::GeocodingNotFound {
            query: query.to_string(),
            suggestions: Vec::new(),
        })
    }

    /// Search for up to `opts.count` matches, preserving upstream order.
    pub async fn search(&self, query: &str, opts: &SearchOptions) -> WeatherResult<Vec<GeocodingResult>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(WeatherError::GeocodingInvalidInput {
                message: "query must not be empty".to_string(),
            });
        }

        if let Some(result) = self.coordinate_fast_path(trimmed)? {
            return Ok(vec![result]);
        }

        let count = opts.count.clamp(1, 10);
        let url = self.resolver.geocoding_url();

        #[derive(serde::Serialize)]
        struct Query<'a> {
            name: &'a str,
            count: u8,
            #[serde(skip_serializing_if = "Option::is_none")]
            language: Option<&'a str>,
        }

        let response = self
            .http
            .get(&url)
            .query(&Query { name: trimmed, count, language: opts.language.as_deref() })
            .send()
            .await
            .map_err(|e| WeatherError::GeocodingServiceError { message: e.to_string() })?;

        if !response.status().is_success() {
            return Err(WeatherError::GeocodingServiceError {
                message: format!("HTTP {}", response.status()),
            });
        }

        let body: GeocodingResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::GeocodingServiceError { message: e.to_string() })?;

        let results = body.results.unwrap_or_default();
        if results.is_empty() {
            return Err(WeatherError::GeocodingNotFound {
                query: trimmed.to_string(),
                suggestions: Vec::new(),
            });
        }

        results.into_iter().map(to_geocoding_result).collect()
    }

    fn coordinate_fast_path(&self, query: &str) -> WeatherResult<Option<GeocodingResult>> {
        let Some(caps) = COORD_RE.captures(query) else {
            return Ok(None);
        };
        let latitude: f64 = caps[1]
            .parse()
            .map_err(|_| WeatherError::GeocodingInvalidInput { message: "invalid latitude".to_string() })?;
        let longitude: f64 = caps[2]
            .parse()
            .map_err(|_| WeatherError::GeocodingInvalidInput { message: "invalid longitude".to_string() })?;
        let coordinates = Coordinates::new(latitude, longitude)
            .map_err(|e| WeatherError::GeocodingInvalidInput { message: e.user_message() })?;

        Ok(Some(GeocodingResult {
            name: query.trim().to_string(),
            coordinates,
            country: String::new(),
            country_code: String::new(),
            region: None,
            timezone: "auto".to_string(),
            elevation: None,
            population: None,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<RawResult>>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    country_code: Option<String>,
    admin1: Option<String>,
    timezone: Option<String>,
    elevation: Option<f64>,
    population: Option<u64>,
}

fn to_geocoding_result(raw: RawResult) -> WeatherResult<GeocodingResult> {
    Ok(GeocodingResult {
        name: raw.name,
        coordinates: Coordinates::new(raw.latitude, raw.longitude)?,
        country: raw.country.unwrap_or_default(),
        country_code: raw.country_code.unwrap_or_default(),
        region: raw.admin1,
        timezone: raw.timezone.unwrap_or_else(|| "auto".to_string()),
        elevation: raw.elevation,
        population: raw.population,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn coordinate_fast_path_skips_the_network() {
        let geocoder = Geocoder::new(EndpointResolver::with_base_urls("http://127.0.0.1:1", "http://127.0.0.1:1"));
        let result = geocoder.resolve("51.5, -0.1", &SearchOptions::default()).await.unwrap();
        assert!((result.coordinates.latitude.value() - 51.5).abs() < 1e-9);
        assert!((result.coordinates.longitude.value() - (-0.1)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_query_is_invalid_input() {
        let geocoder = Geocoder::new(EndpointResolver::default());
        let result = geocoder.search("   ", &SearchOptions::default()).await;
        assert!(matches!(result, Err(WeatherError::GeocodingInvalidInput { .. })));
    }
}
