//! Coordinate backfill for imported fuel stations.
//!
//! Price exports carry no coordinates, so stations are geocoded after
//! import: either per city/state through Nominatim (slow, rate-limited to
//! one request per second) or from a built-in state centroid table, which is
//! coarse but instant. The optimizer's corridor padding is sized to tolerate
//! centroid-level accuracy.

use std::collections::HashMap;
use std::time::Duration;

use backend::providers::{Geocoder, NominatimGeocoder, DEFAULT_NOMINATIM_URL};
use backend::stations::PgStationStore;
use clap::Parser;
use once_cell::sync::Lazy;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static STATE_CENTROIDS: Lazy<HashMap<&'static str, (f64, f64)>> = Lazy::new(|| {
    HashMap::from([
        ("AL", (32.806671, -86.791130)),
        ("AK", (61.370716, -152.404419)),
        ("AZ", (33.729759, -111.431221)),
        ("AR", (34.969704, -92.373123)),
        ("CA", (36.116203, -119.681564)),
        ("CO", (39.059811, -105.311104)),
        ("CT", (41.597782, -72.755371)),
        ("DE", (39.318523, -75.507141)),
        ("FL", (27.766279, -81.686783)),
        ("GA", (33.040619, -83.643074)),
        ("HI", (21.094318, -157.498337)),
        ("ID", (44.240459, -114.478828)),
        ("IL", (40.349457, -88.986137)),
        ("IN", (39.849426, -86.258278)),
        ("IA", (42.011539, -93.210526)),
        ("KS", (38.526600, -96.726486)),
        ("KY", (37.668140, -84.670067)),
        ("LA", (31.169546, -91.867805)),
        ("ME", (44.693947, -69.381927)),
        ("MD", (39.063946, -76.802101)),
        ("MA", (42.230171, -71.530106)),
        ("MI", (43.326618, -84.536095)),
        ("MN", (45.694454, -93.900192)),
        ("MS", (32.741646, -89.678696)),
        ("MO", (38.456085, -92.288368)),
        ("MT", (46.921925, -110.454353)),
        ("NE", (41.125370, -98.268082)),
        ("NV", (38.313515, -117.055374)),
        ("NH", (43.452492, -71.563896)),
        ("NJ", (40.298904, -74.521011)),
        ("NM", (34.840515, -106.248482)),
        ("NY", (42.165726, -74.948051)),
        ("NC", (35.630066, -79.806419)),
        ("ND", (47.528912, -99.784012)),
        ("OH", (40.388783, -82.764915)),
        ("OK", (35.565342, -96.928917)),
        ("OR", (44.572021, -122.070938)),
        ("PA", (40.590752, -77.209755)),
        ("RI", (41.680893, -71.511780)),
        ("SC", (33.856892, -80.945007)),
        ("SD", (44.299782, -99.438828)),
        ("TN", (35.747845, -86.692345)),
        ("TX", (31.054487, -97.563461)),
        ("UT", (40.150032, -111.862434)),
        ("VT", (44.045876, -72.710686)),
        ("VA", (37.769337, -78.169968)),
        ("WA", (47.400902, -121.490494)),
        ("WV", (38.491226, -80.954453)),
        ("WI", (44.268543, -89.616508)),
        ("WY", (42.755966, -107.302490)),
        ("DC", (38.897438, -77.026817)),
    ])
});

#[derive(Debug, Parser)]
#[command(author, version, about = "Assign coordinates to fuel stations missing them")]
struct Args {
    /// Use state centroid coordinates instead of querying the geocoder
    #[arg(long)]
    use_state_centroids: bool,

    /// Maximum number of stations to geocode (0 = no limit)
    #[arg(long, default_value_t = 0)]
    limit: i64,
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

    let store = PgStationStore::connect().await?;
    let stations = store.stations_missing_coordinates(args.limit).await?;
    tracing::info!("geocoding {} stations", stations.len());

    let mut geocoded = 0usize;
    let mut missed = 0usize;

    if args.use_state_centroids {
        for station in &stations {
            match STATE_CENTROIDS.get(station.state.as_str()) {
                Some(&(lat, lon)) => {
                    store.set_coordinates(station.id, lat, lon).await?;
                    geocoded += 1;
                }
                None => {
                    tracing::warn!("no centroid for state '{}'", station.state);
                    missed += 1;
                }
            }
        }
    } else {
        let nominatim_url = std::env::var("NOMINATIM_URL")
            .unwrap_or_else(|_| DEFAULT_NOMINATIM_URL.to_string());
        let geocoder = NominatimGeocoder::new(nominatim_url)?;

        for station in &stations {
            let query = format!("{}, {}", station.city, station.state);
            match geocoder.geocode(&query).await {
                Ok(Some(coordinate)) => {
                    store
                        .set_coordinates(station.id, coordinate.lat, coordinate.lon)
                        .await?;
                    geocoded += 1;
                }
                Ok(None) => {
                    tracing::warn!("no geocode result for '{query}'");
                    missed += 1;
                }
                Err(err) => {
                    tracing::warn!("geocoding error for '{query}': {err}");
                    missed += 1;
                }
            }
            // Nominatim usage policy: at most one request per second.
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    tracing::info!("done: {geocoded} geocoded, {missed} missed");
    Ok(())
}
