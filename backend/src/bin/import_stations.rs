use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use backend::stations::{parse_station_records, PgStationStore};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Replace the fuel station table with a JSON price export"
)]
struct Args {
    /// Path to the JSON station export (array of station objects)
    #[arg(long)]
    input: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    tracing::info!("reading station data from {:?}", args.input);
    let file = File::open(&args.input)?;
    let records = parse_station_records(BufReader::new(file))?;
    tracing::info!("found {} unique stations", records.len());

    let store = PgStationStore::connect().await?;
    store.migrate().await?;

    let imported = store.replace_all(&records).await?;
    tracing::info!("successfully imported {imported} fuel stations");
    tracing::info!("to add coordinates, run: geocode_stations --use-state-centroids");

    Ok(())
}
