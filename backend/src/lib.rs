pub mod corridor;
pub mod error;
pub mod geometry;
pub mod optimizer;
pub mod providers;
pub mod stations;

use std::sync::Arc;

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, routing::post, Json,
    Router,
};
use shared::{
    ApiError, LineStringGeometry, LocationInfo, OptimizeRequest, OptimizeResponse, RouteInfo,
};
use tower_http::cors::CorsLayer;

use crate::corridor::SearchConfig;
use crate::error::RouteError;
use crate::optimizer::{OptimizerError, VehicleProfile};
use crate::providers::{simplify_points, Geocoder, ProviderError, RouteProvider};
use crate::stations::{StationStore, StoreError};

/// Point cap for the polyline handed to corridor search and projection.
const CORRIDOR_MAX_POINTS: usize = 300;
/// Point cap for the geometry echoed back in the response payload.
const RESPONSE_MAX_POINTS: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub stations: Arc<dyn StationStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub router: Arc<dyn RouteProvider>,
    pub vehicle: VehicleProfile,
    pub search: SearchConfig,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/route", post(route_handler))
        .route("/api/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn route_handler(
    State(state): State<AppState>,
    Json(req): Json<OptimizeRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    optimize_trip(&state, req)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn optimize_trip(
    state: &AppState,
    req: OptimizeRequest,
) -> Result<OptimizeResponse, RouteError> {
    let start = state
        .geocoder
        .geocode(&req.start)
        .await?
        .ok_or_else(|| RouteError::LocationNotFound(req.start.clone()))?;
    let end = state
        .geocoder
        .geocode(&req.finish)
        .await?
        .ok_or_else(|| RouteError::LocationNotFound(req.finish.clone()))?;

    let route = state.router.route(start, end).await?;
    tracing::info!(
        "route '{}' -> '{}': {} miles, {} points",
        req.start,
        req.finish,
        route.distance_miles,
        route.points.len()
    );
    if route.points.len() < 2 {
        return Err(OptimizerError::DegenerateRoute(route.points.len()).into());
    }

    // Projection cost is O(segments x candidates), so the optimizer works on
    // a thinned copy of the polyline.
    let corridor_points = simplify_points(&route.points, CORRIDOR_MAX_POINTS);
    let candidates =
        corridor::stations_near_route(state.stations.as_ref(), &corridor_points, &state.search)
            .await?;

    let fuel_stops = optimizer::find_optimal_stops(
        &corridor_points,
        route.distance_miles,
        &candidates,
        &state.vehicle,
        req.start_fuel_level,
    )?;
    let summary = optimizer::trip_summary(route.distance_miles, &fuel_stops, &state.vehicle);
    tracing::info!(
        "planned {} fuel stops, estimated cost {}",
        summary.number_of_stops,
        summary.total_fuel_cost
    );

    let response_points = simplify_points(&route.points, RESPONSE_MAX_POINTS);

    Ok(OptimizeResponse {
        start_location: LocationInfo {
            address: req.start,
            longitude: start.lon,
            latitude: start.lat,
        },
        end_location: LocationInfo {
            address: req.finish,
            longitude: end.lon,
            latitude: end.lat,
        },
        route: RouteInfo {
            distance_miles: route.distance_miles,
            duration_minutes: route.duration_minutes,
            geometry: LineStringGeometry::from_points(&response_points),
        },
        fuel_stops,
        summary,
    })
}

async fn health_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let counts = state
        .stations
        .station_counts()
        .await
        .map_err(|err| error_response(err.into()))?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "fuel_stations_loaded": counts.total,
        "stations_with_coordinates": counts.geocoded,
    })))
}

fn error_response(err: RouteError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        RouteError::LocationNotFound(_) => StatusCode::BAD_REQUEST,
        RouteError::Optimizer(OptimizerError::InvalidConfiguration(_)) => StatusCode::BAD_REQUEST,
        RouteError::Optimizer(OptimizerError::DegenerateRoute(_)) => StatusCode::BAD_GATEWAY,
        RouteError::Provider(ProviderError::Http(_) | ProviderError::Service(_)) => {
            StatusCode::BAD_GATEWAY
        }
        RouteError::Store(StoreError::Connection(_) | StoreError::Config(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        RouteError::Store(StoreError::InvalidData(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("optimization failed: {err}");
    } else {
        tracing::debug!("rejected request: {err}");
    }

    (
        status,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}
