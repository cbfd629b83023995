//! Geocoding and routing collaborators.
//!
//! The optimizer core never talks to the network; it consumes routes and
//! coordinates resolved through the [`Geocoder`] and [`RouteProvider`]
//! traits, so tests can substitute in-memory fixtures. The concrete
//! implementations here use Nominatim and OSRM, which require no API key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shared::Coordinate;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";

const USER_AGENT: &str = "FuelRouteOptimizer/1.0";
const GEOCODE_TIMEOUT_SECS: u64 = 10;
const ROUTE_TIMEOUT_SECS: u64 = 30;
const METERS_PER_MILE: f64 = 1_609.344;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("routing service error: {0}")]
    Service(String),
}

/// Resolve a free-text location to coordinates. `Ok(None)` means the
/// provider answered but found nothing.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, location: &str) -> Result<Option<Coordinate>, ProviderError>;
}

/// A driving route between two points.
#[derive(Debug, Clone)]
pub struct Route {
    pub points: Vec<Coordinate>,
    pub distance_miles: f64,
    pub duration_minutes: f64,
}

#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(&self, start: Coordinate, end: Coordinate) -> Result<Route, ProviderError>;
}

/// Evenly sample `points` down to at most `max_points`, always keeping the
/// final point so the route still ends at the destination.
pub fn simplify_points(points: &[Coordinate], max_points: usize) -> Vec<Coordinate> {
    if points.len() <= max_points {
        return points.to_vec();
    }

    let step = points.len() as f64 / max_points as f64;
    let mut simplified: Vec<Coordinate> = (0..max_points)
        .map(|i| points[(i as f64 * step) as usize])
        .collect();

    if let (Some(tail), Some(last)) = (simplified.last().copied(), points.last().copied()) {
        if tail.lat != last.lat || tail.lon != last.lon {
            simplified.push(last);
        }
    }

    simplified
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Nominatim geocoder, biased to US locations as the station data set is
/// US-only.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(GEOCODE_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, location: &str) -> Result<Option<Coordinate>, ProviderError> {
        let query = format!("{location}, USA");
        let places: Vec<NominatimPlace> = self
            .client
            .get(self.search_url())
            .query(&[
                ("q", query.as_str()),
                ("format", "json"),
                ("limit", "1"),
                ("countrycodes", "us"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        let coordinate = parse_place(&place)?;
        tracing::debug!(
            "geocoded '{location}' to ({}, {})",
            coordinate.lat,
            coordinate.lon
        );
        Ok(Some(coordinate))
    }
}

fn parse_place(place: &NominatimPlace) -> Result<Coordinate, ProviderError> {
    let lat = place
        .lat
        .parse()
        .map_err(|_| ProviderError::Service(format!("malformed latitude '{}'", place.lat)))?;
    let lon = place
        .lon
        .parse()
        .map_err(|_| ProviderError::Service(format!("malformed longitude '{}'", place.lon)))?;
    Ok(Coordinate { lat, lon })
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// OSRM driving-profile router.
pub struct OsrmRouter {
    client: Client,
    base_url: String,
}

impl OsrmRouter {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(ROUTE_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// `{base}/route/v1/driving/{lon},{lat};{lon},{lat}`
    fn route_url(&self, start: Coordinate, end: Coordinate) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.base_url.trim_end_matches('/'),
            start.lon,
            start.lat,
            end.lon,
            end.lat
        )
    }
}

#[async_trait]
impl RouteProvider for OsrmRouter {
    async fn route(&self, start: Coordinate, end: Coordinate) -> Result<Route, ProviderError> {
        let response: OsrmResponse = self
            .client
            .get(self.route_url(start, end))
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        convert_route_response(response)
    }
}

fn convert_route_response(response: OsrmResponse) -> Result<Route, ProviderError> {
    if response.code != "Ok" {
        return Err(ProviderError::Service(
            response
                .message
                .unwrap_or_else(|| format!("OSRM returned code {}", response.code)),
        ));
    }

    let Some(route) = response.routes.into_iter().next() else {
        return Err(ProviderError::Service("no route found".to_string()));
    };

    let points = route
        .geometry
        .coordinates
        .iter()
        .map(|&[lon, lat]| Coordinate { lat, lon })
        .collect();

    Ok(Route {
        points,
        distance_miles: round_to(route.distance / METERS_PER_MILE, 2),
        duration_minutes: round_to(route.duration / 60.0, 1),
    })
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
