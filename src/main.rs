use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveTime, TimeZone};
use clap::{Parser, Subcommand};
use traveleta::{EtaPlanner, TravelEtaConfig, TravelEtaError, telemetry, web};

/// TravelETA: traffic and weather adjusted travel time between map nodes
///
/// Examples:
///   traveleta estimate A B
///   traveleta estimate a "(-15.84, -70.02)" --at 17:30 --geojson
///   traveleta locate
///   traveleta serve --port 8080
#[derive(Parser)]
#[command(name = "traveleta", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging for this crate
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Estimate travel time between two nodes
    Estimate {
        start: String,
        end: String,
        /// Local clock time (HH:MM) instead of now
        #[arg(long)]
        at: Option<String>,
        /// Print the drawn route as GeoJSON
        #[arg(long)]
        geojson: bool,
    },
    /// Fill the start point from the device location
    Locate,
    /// List the named nodes
    Nodes,
    /// Serve the map page and JSON API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        match e.downcast_ref::<TravelEtaError>() {
            Some(
                eta_error @ (TravelEtaError::Config { .. } | TravelEtaError::Api { .. }),
            ) => eprintln!("Error: {}\n  {e:#}", eta_error.user_message()),
            Some(eta_error) => eprintln!("Error: {}", eta_error.user_message()),
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = TravelEtaConfig::load_from_path(cli.config.clone())?;
    telemetry::init(&config.logging, cli.verbose)?;

    match cli.command {
        Command::Estimate {
            start,
            end,
            at,
            geojson,
        } => estimate(&config, &start, &end, at.as_deref(), geojson).await,
        Command::Locate => locate(&config).await,
        Command::Nodes => {
            for (label, coordinate) in config.resolver().nodes() {
                println!("{label}\t{}, {}", coordinate.latitude, coordinate.longitude);
            }
            Ok(())
        }
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let planner = Arc::new(EtaPlanner::from_config(&config)?);
            web::run(planner, &config.server).await
        }
    }
}

async fn estimate(
    config: &TravelEtaConfig,
    start: &str,
    end: &str,
    at: Option<&str>,
    geojson: bool,
) -> Result<()> {
    let planner = EtaPlanner::from_config(config)?;

    let now = match at {
        Some(clock) => {
            let time = NaiveTime::parse_from_str(clock, "%H:%M")
                .with_context(|| format!("Invalid time '{clock}', expected HH:MM"))?;
            let naive = planner.now().date_naive().and_time(time);
            planner
                .timezone()
                .from_local_datetime(&naive)
                .earliest()
                .ok_or_else(|| anyhow!("{clock} does not exist in {}", planner.timezone()))?
        }
        None => planner.now(),
    };

    let outcome = planner.run_at(start, end, now).await?;
    let report = outcome.report();

    println!("{}", report.time_text);
    println!("{}", report.distance_text);
    println!("{}", report.weather_text);
    eprintln!(
        "  {} -> {} | {} | x{}",
        report.start.label,
        report.end.label,
        report.traffic.describe(),
        report.eta.multiplier
    );

    if geojson {
        if let Some(snapshot) = planner.board().snapshot() {
            println!("{}", serde_json::to_string_pretty(&snapshot.scene.to_geojson())?);
        }
    }
    Ok(())
}

async fn locate(config: &TravelEtaConfig) -> Result<()> {
    let planner = EtaPlanner::from_config(config)?;
    let fix = planner.locate_device().await?;

    println!("{}", fix.start_text);
    if let Some(nearest) = fix.nearest {
        eprintln!("  Nearest node: {} ({:.2} km)", nearest.label, nearest.distance_km);
    }
    Ok(())
}
