use anyhow::Context;
use clap::{Parser, Subcommand};
use pothole_map::boundaries::load_boundaries_or_none;
use pothole_map::config::AppConfig;
use pothole_map::dashboard::Dashboard;
use pothole_map::generator::generate_records;
use pothole_map::geocode::NominatimGeocoder;
use pothole_map::geometry::GeoEngine;
use pothole_map::index::BoundaryIndex;
use pothole_map::search::resolve;
use pothole_map::server;
use pothole_map::types::records_to_geojson;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard API and static map page
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write the synthetic pothole records as GeoJSON
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Output file; stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Resolve a search query to a neighbourhood or a geocoded point
    Search {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            info!("Serving dashboard with config: {:?}", config);
            let app_config = AppConfig::load_from_file(config)?;

            // 1. Load boundaries (missing file just means no spatial filter)
            let boundaries = load_boundaries_or_none(app_config.input.boundaries.as_deref());

            // 2. Generate records
            let records = generate_records(&app_config.generator, chrono::Utc::now(), &GeoEngine);

            // 3. Wire up state + geocoder and serve
            let dashboard = Dashboard::new(records, boundaries, &app_config);
            let geocoder = NominatimGeocoder::new(app_config.geocoder.clone())
                .context("Failed to build geocoder client")?;

            server::start_server(app_config, dashboard, Arc::new(geocoder)).await?;
        }
        Commands::Generate { config, out } => {
            let app_config = AppConfig::load_from_file(config)?;
            let records = generate_records(&app_config.generator, chrono::Utc::now(), &GeoEngine);
            let json = serde_json::to_string_pretty(&records_to_geojson(&records))?;

            match out {
                Some(path) => {
                    std::fs::write(path, json)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    info!("Wrote {} records to {:?}", records.len(), path);
                }
                None => println!("{json}"),
            }
        }
        Commands::Search { config, query } => {
            let app_config = AppConfig::load_from_file(config)?;
            let boundaries = load_boundaries_or_none(app_config.input.boundaries.as_deref());
            let index = BoundaryIndex::build(boundaries.as_ref());
            let geocoder = NominatimGeocoder::new(app_config.geocoder.clone())
                .context("Failed to build geocoder client")?;

            let outcome = resolve(
                query,
                &index,
                boundaries.as_ref(),
                &geocoder,
                app_config.geocoder.zoom,
            )
            .await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
