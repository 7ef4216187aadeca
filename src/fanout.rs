//! Fanout Coordinator (spec §4.4, §5, §9).
//!
//! Launches one independent task per requested model, awaits all of them,
//! then partitions into successes and failures — no task ever shares
//! mutable state with another, and no failure cancels or propagates past
//! the others (spec §9: "launch N independent tasks, await all, then
//! partition into successes and failures").

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::WeatherError;
use crate::model::{Coordinates, ModelForecast, ModelId};
use crate::model_client::ModelClient;

#[derive(Debug, Clone)]
pub struct FanoutOptions {
    pub forecast_days: u8,
    pub timezone: String,
    /// Overall deadline across all fetches. `None` means each fetch is
    /// bound only by its own per-request timeout (spec §5).
    pub overall_deadline: Option<Duration>,
}

impl Default for FanoutOptions {
    fn default() -> Self {
        FanoutOptions {
            forecast_days: 7,
            timezone: "auto".to_string(),
            overall_deadline: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub model: ModelId,
    pub error: WeatherError,
}

#[derive(Debug, Clone)]
pub struct FanoutResult {
    pub forecasts: Vec<ModelForecast>,
    pub failures: Vec<FetchFailure>,
    pub fetched_at: DateTime<Utc>,
    pub total_duration_ms: u64,
    pub success_rate: f64,
}

/// Fan out one [`ModelClient::fetch`] call per model in `models`, in
/// parallel, and wait for all of them to finish (successfully or not)
/// before returning.
pub async fn fetch_all(
    client: &ModelClient,
    coordinates: Coordinates,
    models: &[ModelId],
    opts: &FanoutOptions,
) -> FanoutResult {
    let start = Instant::now();

    let tasks: Vec<_> = models
        .iter()
        .copied()
        .map(|model| {
            let client = client.clone();
            let timezone = opts.timezone.clone();
            let forecast_days = opts.forecast_days;
            tokio::spawn(async move { client.fetch(model, coordinates, forecast_days, &timezone).await })
        })
        .collect();

    let joined = futures::future::join_all(tasks);

    let join_results = match opts.overall_deadline {
        Some(deadline) => match tokio::time::timeout(deadline, joined).await {
            Ok(results) => results,
            Err(_) => {
                return FanoutResult {
                    forecasts: Vec::new(),
                    failures: models
                        .iter()
                        .copied()
                        .map(|model| FetchFailure { model, error: WeatherError::Cancelled })
                        .collect(),
                    fetched_at: Utc::now(),
                    total_duration_ms: start.elapsed().as_millis() as u64,
                    success_rate: 0.0,
                };
            }
        },
        None => joined.await,
    };

    let mut forecasts = Vec::new();
    let mut failures = Vec::new();
    for (model, join_result) in models.iter().copied().zip(join_results) {
        match join_result {
            Ok(Ok(forecast)) => forecasts.push(forecast),
            Ok(Err(error)) => failures.push(FetchFailure { model, error }),
            Err(join_error) => {
                tracing::warn!(?join_error, model = model.slug(), "model fetch task panicked or was cancelled");
                failures.push(FetchFailure { model, error: WeatherError::Cancelled });
            }
        }
    }

    let total = forecasts.len() + failures.len();
    let success_rate = if total == 0 { 0.0 } else { forecasts.len() as f64 / total as f64 };

    FanoutResult {
        forecasts,
        failures,
        fetched_at: Utc::now(),
        total_duration_ms: start.elapsed().as_millis() as u64,
        success_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::EndpointResolver;
    use crate::model_client::ModelClientConfig;

    #[tokio::test]
    async fn all_failures_yield_zero_success_rate() {
        // Point the client at a non-routable base URL so every fetch fails fast.
        let resolver = EndpointResolver::with_base_urls("http://127.0.0.1:1", "http://127.0.0.1:1");
        let config = ModelClientConfig {
            timeout: Duration::from_millis(200),
            max_retries: 0,
            backoff_base: Duration::from_millis(1),
        };
        let client = ModelClient::new(resolver, config).unwrap();
        let coords = Coordinates::new(10.0, 10.0).unwrap();
        let models = vec![ModelId::Ecmwf, ModelId::Gfs, ModelId::Icon];
        let opts = FanoutOptions { forecast_days: 3, timezone: "auto".to_string(), overall_deadline: None };

        let result = fetch_all(&client, coords, &models, &opts).await;
        assert_eq!(result.success_rate, 0.0);
        assert!(result.forecasts.is_empty());
        assert_eq!(result.failures.len(), 3);
    }
}
