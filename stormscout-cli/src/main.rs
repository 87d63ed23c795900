//! Stormscout CLI - scrape Storm Center outage maps.
//!
//! This binary resolves a Storm Center view's current deployment, runs the
//! adaptive quadkey descent over its cluster tiles, and writes the result
//! to stdout as GeoJSON (or as flat records with `--raw`). Logs go to
//! stderr so stdout stays pipeable.

mod error;

use clap::Parser;
use error::CliError;
use stormscout::features;
use stormscout::service::{OutageService, ServiceConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stormscout")]
#[command(version = stormscout::VERSION)]
#[command(about = "Scrape a Storm Center outage map into GeoJSON", long_about = None)]
struct Args {
    /// Storm Center instance identifier
    instance_id: String,

    /// View identifier within the instance
    view_id: String,

    /// Emit the flat outage records instead of GeoJSON features
    #[arg(long)]
    raw: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging();

    if let Err(err) = run(&args).await {
        err.exit();
    }
}

/// Logs go to stderr; stdout carries the JSON result.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: &Args) -> Result<(), CliError> {
    let service = OutageService::new(ServiceConfig::default()).map_err(CliError::Scrape)?;
    let records = service
        .scrape(&args.instance_id, &args.view_id)
        .await
        .map_err(CliError::Scrape)?;

    let output = if args.raw {
        serde_json::to_string(&records).map_err(CliError::Serialize)?
    } else {
        let collection = features::to_feature_collection(&records).map_err(CliError::Encode)?;
        serde_json::to_string_pretty(&collection).map_err(CliError::Serialize)?
    };

    println!("{output}");
    Ok(())
}
