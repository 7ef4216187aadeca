use clap::{Parser, Subcommand};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use weatherfuse::aggregate::aggregate;
use weatherfuse::config::{self, Config};
use weatherfuse::endpoints::EndpointResolver;
use weatherfuse::error::WeatherError;
use weatherfuse::fanout::{fetch_all, FanoutOptions};
use weatherfuse::geocoding::{Geocoder, SearchOptions};
use weatherfuse::logging::init_tracing;
use weatherfuse::model::{AggregatedForecast, GeocodingResult, ModelId};
use weatherfuse::model_client::{ModelClient, ModelClientConfig};
use weatherfuse::narrative::{narrative, Narrative};
use weatherfuse::table::Table;

#[derive(Parser)]
#[command(name = "weatherfuse")]
#[command(about = "Multi-model weather consensus forecasts")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and reconcile a multi-model forecast for a location
    Forecast {
        /// Location name or "lat,lon" pair
        location: String,

        /// Number of forecast days (1-16)
        #[arg(long, default_value_t = 7)]
        days: u8,

        /// Comma-separated model slugs, defaults to the full ensemble
        #[arg(long, value_delimiter = ',')]
        models: Option<Vec<String>>,

        /// Output raw JSON instead of a formatted table
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show the per-model breakdown and consensus weights for a location
    Compare {
        location: String,

        #[arg(long, default_value_t = 7)]
        days: u8,

        #[arg(long, value_delimiter = ',')]
        models: Option<Vec<String>>,

        #[arg(long)]
        json: bool,
    },
    /// Search the geocoder for a free-text location query
    Geocode {
        query: String,

        #[arg(long, default_value_t = 5)]
        count: u8,
    },
}

fn resolve_models(models: Option<Vec<String>>, config: &Config) -> anyhow::Result<Vec<ModelId>> {
    match models {
        None => Ok(config.default_models.clone()),
        Some(slugs) => slugs
            .iter()
            .map(|slug| {
                ModelId::from_slug(slug)
                    .ok_or_else(|| anyhow::anyhow!("unknown model slug '{slug}'"))
            })
            .collect(),
    }
}

fn wmo_symbol(code: u16, is_night: bool) -> &'static str {
    match code {
        0 if is_night => "\u{1F319}",
        0 => "\u{1F31E}",
        1 if is_night => "\u{1F319}",
        1 => "\u{1F324}",
        2 if is_night => "\u{2601}",
        2 => "\u{26C5}",
        3 => "\u{2601}",
        45 | 48 => "\u{1F32B}",
        51..=67 => "\u{1F327}",
        71..=75 => "\u{2744}",
        77 | 85 | 86 => "\u{1F328}",
        80..=82 if is_night => "\u{1F327}",
        80..=82 => "\u{1F326}",
        95..=99 => "\u{26C8}",
        _ => "?",
    }
}

fn weather_symbol(code: u16, hour: u32) -> String {
    let is_night = hour < 6 || hour >= 20;
    let sym = wmo_symbol(code, is_night);
    if sym.width() == 1 {
        format!("{sym} ")
    } else {
        sym.to_string()
    }
}

async fn build_clients(config: &Config) -> anyhow::Result<(Geocoder, ModelClient)> {
    let resolver = EndpointResolver::with_base_urls(
        config.forecast_base_url.clone(),
        config.geocoding_base_url.clone(),
    );
    let geocoder = Geocoder::new(resolver.clone());
    let client_config = ModelClientConfig {
        timeout: config.request_timeout,
        max_retries: config.max_retries,
        ..ModelClientConfig::default()
    };
    let client = ModelClient::new(resolver, client_config)?;
    Ok((geocoder, client))
}

fn build_daily_table(aggregated: &AggregatedForecast) -> Table {
    let dates: Vec<String> = aggregated.daily.iter().map(|d| d.date.format("%Y-%m-%d").to_string()).collect();
    let symbols: Vec<String> = aggregated
        .daily
        .iter()
        .map(|d| weather_symbol(d.consensus.dominant_weather_code.value(), 12))
        .collect();
    let temps: Vec<String> = aggregated
        .daily
        .iter()
        .map(|d| format!("{:.0}/{:.0}\u{B0}", d.consensus.temperature.min.value(), d.consensus.temperature.max.value()))
        .collect();
    let precip: Vec<String> = aggregated
        .daily
        .iter()
        .map(|d| {
            let p = d.consensus.precipitation;
            if p.total.value() < 0.1 {
                String::new()
            } else {
                format!("{:.1}mm ({:.0}%)", p.total.value(), p.probability.value() * 100.0)
            }
        })
        .collect();
    let wind: Vec<String> = aggregated
        .daily
        .iter()
        .map(|d| format!("{:.0}km/h", d.consensus.wind.avg.value() * 3.6))
        .collect();
    let confidence: Vec<String> = aggregated.daily.iter().map(|d| d.confidence.level.as_str().to_string()).collect();

    Table::new()
        .column("Date", dates)
        .column("", symbols)
        .column("Temp", temps)
        .column("Precip", precip)
        .column("Wind", wind)
        .column("Confidence", confidence)
}

fn build_weights_table(aggregated: &AggregatedForecast) -> Table {
    let models: Vec<String> = aggregated.weights.iter().map(|w| w.model.display_name().to_string()).collect();
    let weights: Vec<String> = aggregated.weights.iter().map(|w| format!("{:.2}", w.weight)).collect();
    let rationale: Vec<String> = aggregated.weights.iter().map(|w| w.rationale.clone()).collect();

    Table::new()
        .column("Model", models)
        .column("Weight", weights)
        .column("Rationale", rationale)
}

#[derive(Serialize)]
struct ForecastOutput<'a> {
    location: &'a GeocodingResult,
    forecast: &'a AggregatedForecast,
    narrative: &'a Narrative,
    failed_models: Vec<String>,
}

async fn do_forecast(location: &str, days: u8, models: Option<Vec<String>>, json: bool, verbose: bool) -> anyhow::Result<()> {
    let config = config::load()?;
    let (geocoder, client) = build_clients(&config).await?;

    let resolved = geocoder.resolve(location, &SearchOptions::default()).await?;
    let model_ids = resolve_models(models, &config)?;

    let fanout_opts = FanoutOptions {
        forecast_days: days,
        timezone: resolved.timezone.clone(),
        overall_deadline: None,
    };
    let result = fetch_all(&client, resolved.coordinates, &model_ids, &fanout_opts).await;

    if result.forecasts.is_empty() {
        anyhow::bail!("every model failed to return a forecast for '{location}'");
    }

    let failed_models: Vec<String> = result.failures.iter().map(|f| f.model.slug().to_string()).collect();
    let aggregated = aggregate(result.forecasts)?;
    let story = narrative(&aggregated);

    if json {
        let output = ForecastOutput { location: &resolved, forecast: &aggregated, narrative: &story, failed_models };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Forecast for {}", resolved.name);
    if verbose {
        println!("Grid-cell coordinates: {:.4}, {:.4}", resolved.coordinates.latitude.value(), resolved.coordinates.longitude.value());
        println!("Timezone: {}", resolved.timezone);
        println!("Models queried: {}", model_ids.iter().map(|m| m.slug()).collect::<Vec<_>>().join(", "));
        if !failed_models.is_empty() {
            println!("Models that failed: {}", failed_models.join(", "));
        }
    }

    build_daily_table(&aggregated).print();
    println!();
    println!("{}", story.headline);
    println!("{}", story.body);
    for alert in &story.alerts {
        println!("! {alert}");
    }
    for note in &story.model_notes {
        println!("- {note}");
    }
    Ok(())
}

async fn do_compare(location: &str, days: u8, models: Option<Vec<String>>, json: bool) -> anyhow::Result<()> {
    let config = config::load()?;
    let (geocoder, client) = build_clients(&config).await?;

    let resolved = geocoder.resolve(location, &SearchOptions::default()).await?;
    let model_ids = resolve_models(models, &config)?;

    let fanout_opts = FanoutOptions {
        forecast_days: days,
        timezone: resolved.timezone.clone(),
        overall_deadline: None,
    };
    let result = fetch_all(&client, resolved.coordinates, &model_ids, &fanout_opts).await;

    if result.forecasts.is_empty() {
        anyhow::bail!("every model failed to return a forecast for '{location}'");
    }

    let aggregated = aggregate(result.forecasts)?;

    if json {
        println!("{}", serde_json::to_string(&aggregated.weights)?);
        return Ok(());
    }

    println!("Model comparison for {}", resolved.name);
    build_weights_table(&aggregated).print();

    if let Some(today) = aggregated.daily.first() {
        println!();
        println!(
            "Consensus for {}: {:.0}-{:.0}\u{B0}C, agreement {:.0}%",
            today.date,
            today.consensus.temperature.min.value(),
            today.consensus.temperature.max.value(),
            today.consensus_stats.agreement_score * 100.0,
        );
        if !today.consensus_stats.outlier_models.is_empty() {
            let names: Vec<&str> = today.consensus_stats.outlier_models.iter().map(|m| m.display_name()).collect();
            println!("Outlier models today: {}", names.join(", "));
        }
    }
    Ok(())
}

async fn do_geocode(query: &str, count: u8) -> anyhow::Result<()> {
    let config = config::load()?;
    let resolver = EndpointResolver::with_base_urls(config.forecast_base_url, config.geocoding_base_url);
    let geocoder = Geocoder::new(resolver);

    let opts = SearchOptions { count, language: None };
    let results = geocoder.search(query, &opts).await?;

    let names: Vec<String> = results.iter().map(|r| r.name.clone()).collect();
    let countries: Vec<String> = results.iter().map(|r| r.country.clone()).collect();
    let coords: Vec<String> = results
        .iter()
        .map(|r| format!("{:.4}, {:.4}", r.coordinates.latitude.value(), r.coordinates.longitude.value()))
        .collect();
    let timezones: Vec<String> = results.iter().map(|r| r.timezone.clone()).collect();

    Table::new()
        .column("Name", names)
        .column("Country", countries)
        .column("Coordinates", coords)
        .column("Timezone", timezones)
        .print();
    Ok(())
}

fn print_error(err: &anyhow::Error) {
    if let Some(weather_err) = err.downcast_ref::<WeatherError>() {
        eprintln!("error: {}", weather_err.user_message());
    } else {
        eprintln!("error: {err}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Forecast { location, days, models, json, verbose } => {
            do_forecast(&location, days, models, json, verbose).await
        }
        Command::Compare { location, days, models, json } => do_compare(&location, days, models, json).await,
        Command::Geocode { query, count } => do_geocode(&query, count).await,
    };

    if let Err(err) = &result {
        print_error(err);
    }
    result
}
