use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::Request,
};
use backend::{
    corridor::{BoundingBox, SearchConfig},
    optimizer::VehicleProfile,
    providers::{Geocoder, ProviderError, Route, RouteProvider},
    stations::{FuelStation, StationCounts, StationStore, StoreError},
    AppState, create_router,
};
use chrono::Utc;
use hyper::StatusCode;
use serde_json::json;
use shared::{Coordinate, OptimizeResponse};
use tower::ServiceExt;

struct FixtureStore {
    stations: Vec<FuelStation>,
}

#[async_trait]
impl StationStore for FixtureStore {
    async fn stations_in_bounds(
        &self,
        bounds: &BoundingBox,
    ) -> Result<Vec<FuelStation>, StoreError> {
        let mut hits: Vec<FuelStation> = self
            .stations
            .iter()
            .filter(|s| s.coordinate().is_some_and(|c| bounds.contains(c)))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.retail_price.total_cmp(&b.retail_price));
        hits.truncate(1000);
        Ok(hits)
    }

    async fn station_counts(&self) -> Result<StationCounts, StoreError> {
        let geocoded = self
            .stations
            .iter()
            .filter(|s| s.coordinate().is_some())
            .count() as i64;
        Ok(StationCounts {
            total: self.stations.len() as i64,
            geocoded,
        })
    }
}

struct FixtureGeocoder {
    places: HashMap<String, Coordinate>,
}

#[async_trait]
impl Geocoder for FixtureGeocoder {
    async fn geocode(&self, location: &str) -> Result<Option<Coordinate>, ProviderError> {
        Ok(self.places.get(location).copied())
    }
}

struct FixtureRouter {
    route: Route,
}

#[async_trait]
impl RouteProvider for FixtureRouter {
    async fn route(&self, _start: Coordinate, _end: Coordinate) -> Result<Route, ProviderError> {
        Ok(self.route.clone())
    }
}

struct FailingRouter;

#[async_trait]
impl RouteProvider for FailingRouter {
    async fn route(&self, _start: Coordinate, _end: Coordinate) -> Result<Route, ProviderError> {
        Err(ProviderError::Service("no route found".to_string()))
    }
}

fn station(id: i32, name: &str, price: f64, lat: f64, lon: f64) -> FuelStation {
    FuelStation {
        id,
        opis_id: id,
        name: name.to_string(),
        address: format!("{id} Interstate 10"),
        city: "Columbus".to_string(),
        state: "TX".to_string(),
        rack_id: 1,
        retail_price: price,
        latitude: Some(lat),
        longitude: Some(lon),
        imported_at: Utc::now(),
    }
}

/// Straight 400-mile fixture trip between two geocodable towns, with a
/// densified west-to-east polyline along latitude 30.
fn fixture_route() -> Route {
    let points: Vec<Coordinate> = (0..=100)
        .map(|i| Coordinate {
            lat: 30.0,
            lon: -97.0 + f64::from(i) * 0.02,
        })
        .collect();
    Route {
        points,
        distance_miles: 400.0,
        duration_minutes: 360.0,
    }
}

fn fixture_geocoder() -> FixtureGeocoder {
    FixtureGeocoder {
        places: HashMap::from([
            (
                "Westville, TX".to_string(),
                Coordinate {
                    lat: 30.0,
                    lon: -97.0,
                },
            ),
            (
                "Eastville, TX".to_string(),
                Coordinate {
                    lat: 30.0,
                    lon: -95.0,
                },
            ),
        ]),
    }
}

fn fixture_stations() -> Vec<FuelStation> {
    vec![
        station(1, "PRICEY FUEL", 3.45, 30.0, -96.5),
        station(2, "CHEAP FUEL", 2.50, 30.0, -96.0),
        station(3, "UNLOCATED FUEL", 1.99, 0.0, 0.0),
    ]
    .into_iter()
    .map(|mut s| {
        if s.name == "UNLOCATED FUEL" {
            s.latitude = None;
            s.longitude = None;
        }
        s
    })
    .collect()
}

fn test_app_with_router(router: Arc<dyn RouteProvider>) -> axum::Router {
    let state = AppState {
        stations: Arc::new(FixtureStore {
            stations: fixture_stations(),
        }),
        geocoder: Arc::new(fixture_geocoder()),
        router,
        vehicle: VehicleProfile::default(),
        search: SearchConfig::default(),
    };
    create_router(state)
}

fn test_app() -> axum::Router {
    test_app_with_router(Arc::new(FixtureRouter {
        route: fixture_route(),
    }))
}

fn post_route(payload: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/route")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn route_endpoint_plans_cheapest_stop() {
    let app = test_app();
    // Half a tank covers 250 of 400 miles, so exactly one stop is needed and
    // the cheaper mid-route station must win.
    let payload = json!({
        "start": "Westville, TX",
        "finish": "Eastville, TX",
        "start_fuel_level": 0.5
    });

    let response = app.oneshot(post_route(payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body: OptimizeResponse = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body.fuel_stops.len(), 1);
    let stop = &body.fuel_stops[0];
    assert_eq!(stop.station.name, "CHEAP FUEL");
    assert!(stop.gallons_to_add > 0.0 && stop.gallons_to_add <= 50.0);
    assert!((stop.cost - stop.gallons_to_add * 2.50).abs() < 0.02);

    assert_eq!(body.summary.number_of_stops, 1);
    assert_eq!(body.summary.total_gallons_purchased, stop.gallons_to_add);
    assert_eq!(body.summary.total_fuel_cost, stop.cost);
    assert_eq!(body.summary.total_distance_miles, 400.0);
    assert_eq!(body.summary.total_gallons_needed, 40.0);
    assert!((body.summary.average_price_per_gallon - 2.50).abs() < 0.01);

    assert_eq!(body.start_location.address, "Westville, TX");
    assert_eq!(body.route.geometry.kind, "LineString");
    assert!(body.route.geometry.coordinates.len() <= 101);
}

#[tokio::test]
async fn route_within_range_needs_no_stops() {
    let app = test_app();
    let payload = json!({
        "start": "Westville, TX",
        "finish": "Eastville, TX"
    });

    let response = app.oneshot(post_route(payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body: OptimizeResponse = serde_json::from_slice(&bytes).unwrap();

    assert!(body.fuel_stops.is_empty());
    assert_eq!(body.summary.number_of_stops, 0);
    assert_eq!(body.summary.total_gallons_purchased, 0.0);
    assert_eq!(body.summary.average_price_per_gallon, 0.0);
}

#[tokio::test]
async fn route_unknown_location_is_client_error() {
    let app = test_app();
    let payload = json!({
        "start": "Nowhereville, ZZ",
        "finish": "Eastville, TX"
    });

    let response = app.oneshot(post_route(payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Nowhereville, ZZ"), "got: {message}");
}

#[tokio::test]
async fn route_rejects_out_of_range_fuel_level() {
    let app = test_app();
    let payload = json!({
        "start": "Westville, TX",
        "finish": "Eastville, TX",
        "start_fuel_level": 1.5
    });

    let response = app.oneshot(post_route(payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn route_missing_field_is_client_error() {
    let app = test_app();
    let payload = json!({ "start": "Westville, TX" });

    let response = app.oneshot(post_route(payload)).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn route_provider_failure_is_bad_gateway() {
    let app = test_app_with_router(Arc::new(FailingRouter));
    let payload = json!({
        "start": "Westville, TX",
        "finish": "Eastville, TX"
    });

    let response = app.oneshot(post_route(payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn health_reports_station_counts() {
    let app = test_app();
    let request = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["fuel_stations_loaded"], 3);
    assert_eq!(body["stations_with_coordinates"], 2);
}
