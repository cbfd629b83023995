use std::{net::SocketAddr, sync::Arc};

use backend::corridor::SearchConfig;
use backend::providers::{NominatimGeocoder, OsrmRouter, DEFAULT_NOMINATIM_URL, DEFAULT_OSRM_URL};
use backend::stations::PgStationStore;
use backend::{create_router, optimizer::VehicleProfile, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let max_range = env_f64("VEHICLE_MAX_RANGE_MILES", 500.0);
    let mpg = env_f64("VEHICLE_MPG", 10.0);
    let vehicle = VehicleProfile::new(max_range, mpg).expect("valid vehicle configuration");
    tracing::info!("vehicle profile: {max_range} mile range at {mpg} mpg");

    let store = PgStationStore::connect().await.expect("connect to database");
    store.migrate().await.expect("run migrations");

    let nominatim_url =
        std::env::var("NOMINATIM_URL").unwrap_or_else(|_| DEFAULT_NOMINATIM_URL.to_string());
    let osrm_url = std::env::var("OSRM_URL").unwrap_or_else(|_| DEFAULT_OSRM_URL.to_string());
    let geocoder = NominatimGeocoder::new(nominatim_url).expect("build geocoder");
    let router = OsrmRouter::new(osrm_url).expect("build router");

    let state = AppState {
        stations: Arc::new(store),
        geocoder: Arc::new(geocoder),
        router: Arc::new(router),
        vehicle,
        search: SearchConfig::default(),
    };
    let app = create_router(state);

    let addr: SocketAddr = "0.0.0.0:8080".parse().expect("valid socket address");
    tracing::info!("starting backend on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
