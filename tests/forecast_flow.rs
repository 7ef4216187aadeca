//! End-to-end coverage of the fanout -> aggregate -> narrative pipeline
//! against a mocked Open-Meteo, plus the geocoding miss path.

use chrono::Utc;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weatherfuse::aggregate::aggregate;
use weatherfuse::endpoints::EndpointResolver;
use weatherfuse::error::WeatherError;
use weatherfuse::fanout::{fetch_all, FanoutOptions};
use weatherfuse::geocoding::{Geocoder, SearchOptions};
use weatherfuse::model::{Coordinates, ModelId};
use weatherfuse::model_client::{ModelClient, ModelClientConfig};
use weatherfuse::narrative::narrative;

fn hourly_times(hours: usize) -> Vec<String> {
    let start = Utc::now().date_naive().and_hms_opt(0, 0, 0).unwrap();
    (0..hours)
        .map(|h| (start + chrono::Duration::hours(h as i64)).format("%Y-%m-%dT%H:%M").to_string())
        .collect()
}

fn daily_times(days: usize) -> Vec<String> {
    let start = Utc::now().date_naive();
    (0..days).map(|d| (start + chrono::Duration::days(d as i64)).format("%Y-%m-%d").to_string()).collect()
}

/// Build a minimal Open-Meteo-shaped response body with a constant
/// temperature and precipitation probability across `days` days.
fn forecast_body(days: u8, temp: f64, precip_probability: f64) -> serde_json::Value {
    let hours = days as usize * 24;
    let times = hourly_times(hours);
    let dates = daily_times(days as usize);

    serde_json::json!({
        "latitude": 51.5,
        "longitude": -0.1,
        "timezone": "UTC",
        "hourly": {
            "time": times,
            "temperature_2m": vec![temp; hours],
            "apparent_temperature": vec![temp; hours],
            "relative_humidity_2m": vec![60.0; hours],
            "surface_pressure": vec![1013.0; hours],
            "wind_speed_10m": vec![3.0; hours],
            "wind_direction_10m": vec![180.0; hours],
            "wind_gusts_10m": vec![5.0; hours],
            "precipitation": vec![0.0; hours],
            "precipitation_probability": vec![precip_probability * 100.0; hours],
            "cloud_cover": vec![20.0; hours],
            "visibility": vec![10000.0; hours],
            "uv_index": vec![2.0; hours],
            "weather_code": vec![1; hours],
        },
        "daily": {
            "time": dates,
            "temperature_2m_max": vec![temp + 2.0; days as usize],
            "temperature_2m_min": vec![temp - 2.0; days as usize],
            "precipitation_sum": vec![0.0; days as usize],
            "precipitation_probability_max": vec![precip_probability * 100.0; days as usize],
            "precipitation_hours": vec![0.0; days as usize],
            "wind_speed_10m_max": vec![5.0; days as usize],
            "wind_gusts_10m_max": vec![8.0; days as usize],
            "wind_direction_10m_dominant": vec![180.0; days as usize],
            "sunrise": times.first().cloned().into_iter().collect::<Vec<_>>().repeat(days as usize),
            "sunset": times.first().cloned().into_iter().collect::<Vec<_>>().repeat(days as usize),
            "daylight_duration": vec![36000.0; days as usize],
            "uv_index_max": vec![3.0; days as usize],
            "weather_code": vec![1; days as usize],
        },
    })
}

async fn mock_model(server: &MockServer, path: &str, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path_regex(format!("^{path}$")))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

fn client_for(server: &MockServer) -> ModelClient {
    let resolver = EndpointResolver::with_base_urls(server.uri(), server.uri());
    ModelClient::new(
        resolver,
        ModelClientConfig { max_retries: 0, ..ModelClientConfig::default() },
    )
    .unwrap()
}

#[tokio::test]
async fn three_agreeing_models_yield_a_confident_consensus() {
    let server = MockServer::start().await;
    mock_model(&server, "/v1/ecmwf", 200, forecast_body(3, 20.0, 0.1)).await;
    mock_model(&server, "/v1/gfs", 200, forecast_body(3, 20.2, 0.1)).await;
    mock_model(&server, "/v1/dwd-icon", 200, forecast_body(3, 19.8, 0.1)).await;

    let client = client_for(&server);
    let coords = Coordinates::new(51.5, -0.1).unwrap();
    let models = vec![ModelId::Ecmwf, ModelId::Gfs, ModelId::Icon];
    let opts = FanoutOptions { forecast_days: 3, timezone: "UTC".to_string(), overall_deadline: None };

    let result = fetch_all(&client, coords, &models, &opts).await;
    assert!(result.failures.is_empty(), "{:?}", result.failures);
    assert_eq!(result.forecasts.len(), 3);

    let aggregated = aggregate(result.forecasts).unwrap();
    assert_eq!(aggregated.daily.len(), 3);
    assert_eq!(aggregated.hourly.len(), 72);

    let story = narrative(&aggregated);
    assert!(story.headline.starts_with("Models agree on"), "{}", story.headline);
    assert!(aggregated.confidence.score > 0.5);
}

#[tokio::test]
async fn one_hot_outlier_is_downweighted_and_noted() {
    let server = MockServer::start().await;
    mock_model(&server, "/v1/ecmwf", 200, forecast_body(2, 20.0, 0.1)).await;
    mock_model(&server, "/v1/gfs", 200, forecast_body(2, 20.0, 0.1)).await;
    mock_model(&server, "/v1/dwd-icon", 200, forecast_body(2, 20.0, 0.1)).await;
    mock_model(&server, "/v1/gem", 200, forecast_body(2, 35.0, 0.1)).await;

    let client = client_for(&server);
    let coords = Coordinates::new(51.5, -0.1).unwrap();
    let models = vec![ModelId::Ecmwf, ModelId::Gfs, ModelId::Icon, ModelId::Gem];
    let opts = FanoutOptions { forecast_days: 2, timezone: "UTC".to_string(), overall_deadline: None };

    let result = fetch_all(&client, coords, &models, &opts).await;
    assert_eq!(result.forecasts.len(), 4);

    let aggregated = aggregate(result.forecasts).unwrap();
    let gem_weight = aggregated.weights.iter().find(|w| w.model == ModelId::Gem).unwrap();
    let other_weight = aggregated.weights.iter().find(|w| w.model == ModelId::Ecmwf).unwrap();
    assert!(gem_weight.weight < other_weight.weight, "GEM should be downweighted");

    let story = narrative(&aggregated);
    assert!(story.model_notes.iter().any(|n| n.contains("GEM")));
}

#[tokio::test]
async fn partial_fetch_failure_still_aggregates_the_survivors() {
    let server = MockServer::start().await;
    mock_model(&server, "/v1/ecmwf", 200, forecast_body(2, 20.0, 0.1)).await;
    mock_model(&server, "/v1/gfs", 200, forecast_body(2, 20.5, 0.1)).await;
    Mock::given(method("GET"))
        .and(path_regex("^/v1/dwd-icon$"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let coords = Coordinates::new(51.5, -0.1).unwrap();
    let models = vec![ModelId::Ecmwf, ModelId::Gfs, ModelId::Icon];
    let opts = FanoutOptions { forecast_days: 2, timezone: "UTC".to_string(), overall_deadline: None };

    let result = fetch_all(&client, coords, &models, &opts).await;
    assert_eq!(result.forecasts.len(), 2);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].model, ModelId::Icon);

    let aggregated = aggregate(result.forecasts).unwrap();
    assert_eq!(aggregated.models.len(), 2);
}

#[tokio::test]
async fn geocoding_miss_surfaces_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex("^/v1/search$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })))
        .mount(&server)
        .await;

    let resolver = EndpointResolver::with_base_urls(server.uri(), server.uri());
    let geocoder = Geocoder::new(resolver);
    let result = geocoder.resolve("Nowhereville", &SearchOptions::default()).await;
    assert!(matches!(result, Err(WeatherError::GeocodingNotFound { .. })));
}

#[tokio::test]
async fn forecast_days_one_yields_one_day_and_24_hours() {
    let server = MockServer::start().await;
    mock_model(&server, "/v1/ecmwf", 200, forecast_body(1, 18.0, 0.0)).await;

    let client = client_for(&server);
    let coords = Coordinates::new(51.5, -0.1).unwrap();
    let forecast = client.fetch(ModelId::Ecmwf, coords, 1, "UTC").await.unwrap();
    assert_eq!(forecast.daily.len(), 1);
    assert_eq!(forecast.hourly.len(), 24);
}
