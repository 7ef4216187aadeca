//! Layered configuration (ambient, SPEC_FULL.md §2).
//!
//! Precedence, lowest to highest: built-in defaults, an optional TOML file
//! at `dirs::config_dir()/weatherfuse/config.toml`, then `WEATHERFUSE_*`
//! environment variables. A missing file falls back silently to defaults;
//! a file path given explicitly and not found is `ConfigMissing`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{WeatherError, WeatherResult};
use crate::model::ModelId;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub default_models: Vec<ModelId>,
    pub default_forecast_days: u8,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub forecast_base_url: String,
    pub geocoding_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_models: ModelId::ALL.to_vec(),
            default_forecast_days: 7,
            request_timeout: Duration::from_secs(30),
            max_retries: 1,
            forecast_base_url: crate::endpoints::DEFAULT_FORECAST_BASE_URL.to_string(),
            geocoding_base_url: crate::endpoints::DEFAULT_GEOCODING_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    default_models: Option<Vec<String>>,
    default_forecast_days: Option<u8>,
    request_timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    forecast_base_url: Option<String>,
    geocoding_base_url: Option<String>,
}

/// Load configuration from the default file location, falling back to
/// built-in defaults if it does not exist, then apply environment
/// overrides.
pub fn load() -> WeatherResult<Config> {
    let path = default_config_path();
    let mut config = match path {
        Some(path) if path.exists() => load_from_file(&path)?,
        _ => Config::default(),
    };
    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from an explicitly named file; missing means
/// `ConfigMissing`, not a silent fallback.
pub fn load_from_path(path: &Path) -> WeatherResult<Config> {
    if !path.exists() {
        return Err(WeatherError::ConfigMissing { path: path.display().to_string() });
    }
    let mut config = load_from_file(path)?;
    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("weatherfuse").join("config.toml"))
}

fn load_from_file(path: &Path) -> WeatherResult<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| WeatherError::ConfigParseError { message: e.to_string() })?;
    let file: FileConfig =
        toml::from_str(&text).map_err(|e| WeatherError::ConfigParseError { message: e.to_string() })?;

    let mut config = Config::default();
    if let Some(models) = file.default_models {
        config.default_models = models
            .iter()
            .map(|slug| {
                ModelId::from_slug(slug).ok_or_else(|| WeatherError::ConfigInvalid {
                    message: format!("unknown model id '{slug}' in config"),
                })
            })
            .collect::<WeatherResult<Vec<_>>>()?;
    }
    if let Some(days) = file.default_forecast_days {
        config.default_forecast_days = days;
    }
    if let Some(secs) = file.request_timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(retries) = file.max_retries {
        config.max_retries = retries;
    }
    if let Some(url) = file.forecast_base_url {
        config.forecast_base_url = url;
    }
    if let Some(url) = file.geocoding_base_url {
        config.geocoding_base_url = url;
    }
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) -> WeatherResult<()> {
    if let Ok(days) = std::env::var("WEATHERFUSE_DEFAULT_FORECAST_DAYS") {
        config.default_forecast_days = days
            .parse()
            .map_err(|_| WeatherError::ConfigInvalid { message: "invalid WEATHERFUSE_DEFAULT_FORECAST_DAYS".to_string() })?;
    }
    if let Ok(secs) = std::env::var("WEATHERFUSE_REQUEST_TIMEOUT_SECS") {
        let secs: u64 = secs
            .parse()
            .map_err(|_| WeatherError::ConfigInvalid { message: "invalid WEATHERFUSE_REQUEST_TIMEOUT_SECS".to_string() })?;
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Ok(retries) = std::env::var("WEATHERFUSE_MAX_RETRIES") {
        config.max_retries = retries
            .parse()
            .map_err(|_| WeatherError::ConfigInvalid { message: "invalid WEATHERFUSE_MAX_RETRIES".to_string() })?;
    }
    if let Ok(url) = std::env::var("WEATHERFUSE_FORECAST_BASE_URL") {
        config.forecast_base_url = url;
    }
    if let Ok(url) = std::env::var("WEATHERFUSE_GEOCODING_BASE_URL") {
        config.geocoding_base_url = url;
    }
    Ok(())
}

fn validate(config: &Config) -> WeatherResult<()> {
    if !(1..=16).contains(&config.default_forecast_days) {
        return Err(WeatherError::ConfigInvalid {
            message: "default_forecast_days must be in [1, 16]".to_string(),
        });
    }
    if config.default_models.is_empty() {
        return Err(WeatherError::ConfigInvalid {
            message: "default_models must not be empty".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_model() {
        let config = Config::default();
        assert_eq!(config.default_models.len(), 7);
    }

    #[test]
    fn rejects_missing_explicit_path() {
        let result = load_from_path(Path::new("/nonexistent/weatherfuse/config.toml"));
        assert!(matches!(result, Err(WeatherError::ConfigMissing { .. })));
    }

    #[test]
    fn parses_a_minimal_file() {
        let dir = std::env::temp_dir().join(format!("weatherfuse-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "default_forecast_days = 3\n").unwrap();
        let config = load_from_path(&path).unwrap();
        assert_eq!(config.default_forecast_days, 3);
        std::fs::remove_dir_all(&dir).ok();
    }
}
