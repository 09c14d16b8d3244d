use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use firewatch_core::feeds::{feed_urls_for, redact_credentials};
use firewatch_core::{
    fetch_map_key_status, ContentFetcher, CountryCode, CountryDetections, FirePipeline,
    FetchError, FirewatchConfig, HttpFetcher, MapKey, MapKeyStatus, PipelineError,
    ResolutionError,
};
use geojson::FeatureCollection;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Active fire detections from NASA FIRMS", long_about = None)]
struct Cli {
    /// FIRMS map key (32 hexadecimal characters)
    #[arg(long, env = "FIRMS_MAP_KEY", hide_env_values = true, global = true)]
    map_key: Option<String>,

    /// Optional TOML configuration file
    #[arg(long, env = "FIREWATCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the three world feed URLs for the map key
    Urls(UrlsArgs),
    /// Show transaction usage for the map key
    KeyStatus,
    /// Fetch high-confidence detections within a country
    Detect(DetectArgs),
}

#[derive(Args, Debug, Default)]
struct UrlsArgs {
    /// Print the map key instead of masking it
    #[arg(long)]
    reveal: bool,
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// ISO 3166-1 alpha-2 country code
    #[arg(long)]
    country: String,

    /// Write the result to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct DetectReport {
    country: String,
    display_name: String,
    /// `[lat, lon]`
    centroid: [f64; 2],
    detections: FeatureCollection,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(load_log_filter(None, EnvFilter::DEFAULT_ENV))
        .json()
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if is_rate_limited(&err) {
                eprintln!(
                    "FIRMS transaction limit reached for this map key. Wait about 10 minutes before retrying."
                );
            }
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Loads `.env` (or `env_file`) before reading the log filter from `var`, so a
/// filter set only in the dotenv file still applies.
fn load_log_filter(env_file: Option<&Path>, var: &str) -> EnvFilter {
    match env_file {
        Some(path) => dotenvy::from_path(path).ok(),
        None => dotenvy::dotenv().ok().map(|_| ()),
    };
    EnvFilter::from_env(var)
}

/// FIRMS signals an exhausted transaction budget the same way for feeds, the
/// status endpoint and boundary lookups.
fn is_rate_limited(err: &anyhow::Error) -> bool {
    if let Some(err) = err.downcast_ref::<PipelineError>() {
        return err.is_rate_limited();
    }
    if let Some(err) = err.downcast_ref::<FetchError>() {
        return err.is_rate_limited();
    }
    matches!(
        err.downcast_ref::<ResolutionError>(),
        Some(ResolutionError::Fetch(fetch)) if fetch.is_rate_limited()
    )
}

async fn run(cli: Cli) -> Result<()> {
    let config = FirewatchConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let key = map_key(cli.map_key.as_deref())?;

    match cli.command {
        Command::Urls(args) => {
            for (product, url) in feed_urls_for(&key).iter() {
                let shown = if args.reveal {
                    url.to_string()
                } else {
                    redact_credentials(url)
                };
                println!("{product}\t{shown}");
            }
            Ok(())
        }
        Command::KeyStatus => {
            let fetcher = HttpFetcher::new(&config)?;
            let status = fetch_map_key_status(&fetcher, &key).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Command::Detect(args) => detect(&config, &key, args).await,
    }
}

fn map_key(value: Option<&str>) -> Result<MapKey> {
    let value = value.context("a FIRMS map key is required (--map-key or FIRMS_MAP_KEY)")?;
    Ok(MapKey::parse(value.trim())?)
}

async fn detect(config: &FirewatchConfig, key: &MapKey, args: DetectArgs) -> Result<()> {
    let country = CountryCode::parse(&args.country)?;

    let pipeline = FirePipeline::from_config(config)?;
    let fetcher = pipeline.combiner().fetcher();

    let before = key_status(fetcher.as_ref(), key).await;
    let result = pipeline
        .detections_for_country(key, &country)
        .await
        .with_context(|| format!("failed to collect detections for {country}"))?;
    let after = key_status(fetcher.as_ref(), key).await;

    if let (Some(before), Some(after)) = (&before, &after) {
        info!(
            transactions_used = after.transactions_since(before),
            transactions_remaining = after.remaining(),
            "FIRMS transactions consumed"
        );
    }

    let report = build_report(&result)?;
    let json = serde_json::to_string_pretty(&report)?;
    match args.output {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), detections = result.detections.len(), "wrote detections");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Transaction accounting is informational; a failed lookup is logged and skipped.
async fn key_status(fetcher: &dyn ContentFetcher, key: &MapKey) -> Option<MapKeyStatus> {
    match fetch_map_key_status(fetcher, key).await {
        Ok(status) => Some(status),
        Err(err) => {
            warn!(error = %err, "could not read map key status");
            None
        }
    }
}

fn build_report(result: &CountryDetections) -> Result<DetectReport> {
    Ok(DetectReport {
        country: result.country.to_string(),
        display_name: result.boundary.display_name.clone(),
        centroid: result.centroid.to_array(),
        detections: result.to_feature_collection()?,
    })
}
