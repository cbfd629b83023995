//! Greedy fuel stop selection over a projected station list.
//!
//! Every function here is synchronous and side-effect free; candidate
//! stations and route geometry are supplied already resolved, so the module
//! needs no network or storage access and identical inputs always produce
//! identical plans.

use std::cmp::Ordering;

use shared::{Coordinate, FuelStop, StationInfo, TripSummary};

use crate::geometry::project_onto_route;
use crate::stations::FuelStation;

/// Fraction of the tank held in reserve; the vehicle plans to refuel before
/// dropping below it.
pub const SAFETY_MARGIN: f64 = 0.10;

#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("invalid vehicle configuration: {0}")]
    InvalidConfiguration(String),
    #[error("route must contain at least 2 points, got {0}")]
    DegenerateRoute(usize),
}

/// Vehicle parameters the plan is computed against.
#[derive(Debug, Clone, Copy)]
pub struct VehicleProfile {
    pub max_range_miles: f64,
    pub mpg: f64,
}

impl VehicleProfile {
    pub fn new(max_range_miles: f64, mpg: f64) -> Result<Self, OptimizerError> {
        if !max_range_miles.is_finite() || max_range_miles <= 0.0 {
            return Err(OptimizerError::InvalidConfiguration(format!(
                "max_range_miles must be positive, got {max_range_miles}"
            )));
        }
        if !mpg.is_finite() || mpg <= 0.0 {
            return Err(OptimizerError::InvalidConfiguration(format!(
                "mpg must be positive, got {mpg}"
            )));
        }
        Ok(Self {
            max_range_miles,
            mpg,
        })
    }

    pub fn tank_capacity_gallons(&self) -> f64 {
        self.max_range_miles / self.mpg
    }

    /// Usable range once the safety margin is reserved.
    pub fn effective_range_miles(&self) -> f64 {
        self.max_range_miles * (1.0 - SAFETY_MARGIN)
    }
}

impl Default for VehicleProfile {
    fn default() -> Self {
        Self {
            max_range_miles: 500.0,
            mpg: 10.0,
        }
    }
}

/// A candidate station expressed in route-relative coordinates.
#[derive(Debug, Clone)]
pub struct ProjectedStation {
    pub station: FuelStation,
    pub position: Coordinate,
    pub distance_along_route: f64,
    pub distance_from_route: f64,
}

impl ProjectedStation {
    pub fn price(&self) -> f64 {
        self.station.retail_price
    }

    fn station_info(&self) -> StationInfo {
        StationInfo {
            id: self.station.id,
            name: self.station.name.clone(),
            address: self.station.address.clone(),
            city: self.station.city.clone(),
            state: self.station.state.clone(),
            price_per_gallon: self.station.retail_price,
            latitude: self.position.lat,
            longitude: self.position.lon,
        }
    }
}

/// Project every candidate with known coordinates onto the route and sort
/// ascending by along-route distance. The sort is stable, so stations that
/// project to the same position keep their incoming (price) order.
pub fn project_stations(route: &[Coordinate], stations: &[FuelStation]) -> Vec<ProjectedStation> {
    let mut projected: Vec<ProjectedStation> = stations
        .iter()
        .filter_map(|station| {
            let position = station.coordinate()?;
            let projection = project_onto_route(position, route);
            Some(ProjectedStation {
                station: station.clone(),
                position,
                distance_along_route: projection.distance_along_route,
                distance_from_route: projection.distance_from_route,
            })
        })
        .collect();

    projected.sort_by(|a, b| {
        a.distance_along_route
            .partial_cmp(&b.distance_along_route)
            .unwrap_or(Ordering::Equal)
    });

    projected
}

/// True when `a` beats `b`: cheaper wins, and on a price tie the station
/// further along the route wins (fewer stops overall).
fn beats(a: &ProjectedStation, b: &ProjectedStation) -> bool {
    a.price() < b.price()
        || (a.price() == b.price() && a.distance_along_route > b.distance_along_route)
}

/// Run the greedy range-constrained selection over an already-projected,
/// distance-sorted station list.
///
/// State is (position, remaining range). Each iteration refuels at the best
/// station inside the comfortable-range window ahead, or stretches to the
/// nearest station ahead when the window is empty. The vehicle departs every
/// stop with a full tank; the purchased volume only models the top-up cost.
/// When no station is ahead at all, the stops accumulated so far are
/// returned as-is: an unreachable destination is not an error here.
pub fn select_stops(
    projected: &[ProjectedStation],
    total_distance: f64,
    vehicle: &VehicleProfile,
    start_fuel_level: f64,
) -> Result<Vec<FuelStop>, OptimizerError> {
    if !(0.0..=1.0).contains(&start_fuel_level) {
        return Err(OptimizerError::InvalidConfiguration(format!(
            "start_fuel_level must be within 0.0..=1.0, got {start_fuel_level}"
        )));
    }
    let vehicle = VehicleProfile::new(vehicle.max_range_miles, vehicle.mpg)?;

    let effective_range = vehicle.effective_range_miles();
    let tank_capacity = vehicle.tank_capacity_gallons();

    let mut stops = Vec::new();
    let mut position = 0.0;
    let mut range = vehicle.max_range_miles * start_fuel_level;

    while position < total_distance {
        if range >= total_distance - position {
            break;
        }

        let in_window = |s: &&ProjectedStation| {
            s.distance_along_route > position
                && s.distance_along_route <= position + effective_range
        };
        let best_in_window = projected.iter().filter(in_window).fold(
            None::<&ProjectedStation>,
            |best, candidate| match best {
                Some(current) if !beats(candidate, current) => Some(current),
                _ => Some(candidate),
            },
        );

        let winner = match best_in_window {
            Some(station) => station,
            // Nothing within comfortable range: stretch to the nearest
            // station ahead, or give up and return the partial plan.
            None => match projected.iter().find(|s| s.distance_along_route > position) {
                Some(station) => station,
                None => break,
            },
        };

        let distance_to_station = winner.distance_along_route - position;
        let fuel_used = distance_to_station / vehicle.mpg;
        let remaining_fuel = range / vehicle.mpg - fuel_used;
        let gallons_to_add = (tank_capacity - remaining_fuel.max(0.0)).clamp(0.0, tank_capacity);
        let cost = gallons_to_add * winner.price();

        stops.push(FuelStop {
            station: winner.station_info(),
            distance_from_start: round_to(winner.distance_along_route, 1),
            distance_from_route: round_to(winner.distance_from_route, 1),
            gallons_to_add: round_to(gallons_to_add, 2),
            cost: round_to(cost, 2),
        });

        position = winner.distance_along_route;
        range = vehicle.max_range_miles;
    }

    Ok(stops)
}

/// Project candidates onto the route, then run the greedy selection.
pub fn find_optimal_stops(
    route: &[Coordinate],
    total_distance: f64,
    stations: &[FuelStation],
    vehicle: &VehicleProfile,
    start_fuel_level: f64,
) -> Result<Vec<FuelStop>, OptimizerError> {
    if route.len() < 2 {
        return Err(OptimizerError::DegenerateRoute(route.len()));
    }

    let projected = project_stations(route, stations);
    let stops = select_stops(&projected, total_distance, vehicle, start_fuel_level)?;
    tracing::debug!(
        "selected {} stops from {} projected candidates",
        stops.len(),
        projected.len()
    );
    Ok(stops)
}

/// Aggregate a stop plan into trip statistics.
pub fn trip_summary(total_distance: f64, stops: &[FuelStop], vehicle: &VehicleProfile) -> TripSummary {
    let total_gallons: f64 = stops.iter().map(|stop| stop.gallons_to_add).sum();
    let total_fuel_cost: f64 = stops.iter().map(|stop| stop.cost).sum();

    let avg_price = if total_gallons > 0.0 {
        total_fuel_cost / total_gallons
    } else {
        0.0
    };

    TripSummary {
        total_distance_miles: round_to(total_distance, 1),
        total_gallons_needed: round_to(total_distance / vehicle.mpg, 2),
        total_gallons_purchased: round_to(total_gallons, 2),
        total_fuel_cost: round_to(total_fuel_cost, 2),
        average_price_per_gallon: round_to(avg_price, 3),
        number_of_stops: stops.len(),
        vehicle_mpg: vehicle.mpg,
        vehicle_max_range: vehicle.max_range_miles,
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
