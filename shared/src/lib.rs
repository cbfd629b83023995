use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub start: String,
    pub finish: String,
    #[serde(default = "default_fuel_level")]
    pub start_fuel_level: f64,
}

pub fn default_fuel_level() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationInfo {
    pub address: String,
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineStringGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<[f64; 2]>,
}

impl LineStringGeometry {
    pub fn from_points(points: &[Coordinate]) -> Self {
        Self {
            kind: "LineString".to_string(),
            coordinates: points.iter().map(|p| [p.lon, p.lat]).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteInfo {
    pub distance_miles: f64,
    pub duration_minutes: f64,
    pub geometry: LineStringGeometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub price_per_gallon: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// A recommended refueling stop, expressed in route-relative miles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelStop {
    pub station: StationInfo,
    pub distance_from_start: f64,
    pub distance_from_route: f64,
    pub gallons_to_add: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub total_distance_miles: f64,
    pub total_gallons_needed: f64,
    pub total_gallons_purchased: f64,
    pub total_fuel_cost: f64,
    pub average_price_per_gallon: f64,
    pub number_of_stops: usize,
    pub vehicle_mpg: f64,
    pub vehicle_max_range: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResponse {
    pub start_location: LocationInfo,
    pub end_location: LocationInfo,
    pub route: RouteInfo,
    pub fuel_stops: Vec<FuelStop>,
    pub summary: TripSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
