use shared::Coordinate;

use crate::stations::{FuelStation, StationStore, StoreError};

/// Degrees of padding applied around the route's bounding box. Roughly 120
/// miles, generous enough to tolerate stations geocoded to city or state
/// centroids.
pub const BBOX_PADDING_DEGREES: f64 = 2.0;

/// Upper bound on candidate stations returned from a corridor query.
pub const MAX_CANDIDATE_STATIONS: i64 = 1_000;

#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.lat >= self.min_lat
            && coord.lat <= self.max_lat
            && coord.lon >= self.min_lon
            && coord.lon <= self.max_lon
    }

    /// Axis-aligned bounds of a route polyline, padded by `padding` degrees
    /// on every side. Returns `None` for an empty polyline.
    pub fn from_route_points(points: &[Coordinate], padding: f64) -> Option<Self> {
        let first = points.first()?;

        let mut bounds = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };

        for point in &points[1..] {
            bounds.min_lat = bounds.min_lat.min(point.lat);
            bounds.max_lat = bounds.max_lat.max(point.lat);
            bounds.min_lon = bounds.min_lon.min(point.lon);
            bounds.max_lon = bounds.max_lon.max(point.lon);
        }

        bounds.min_lat -= padding;
        bounds.max_lat += padding;
        bounds.min_lon -= padding;
        bounds.max_lon += padding;

        Some(bounds)
    }
}

/// Corridor search parameters.
///
/// `search_radius_miles` is kept as configuration, but eligibility is decided
/// by the padded bounding box alone; no per-station radius filter is applied
/// after the box query.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub search_radius_miles: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_radius_miles: 150.0,
        }
    }
}

/// Candidate stations for a route: every station with coordinates inside the
/// padded route bounding box, cheapest first, capped at
/// [`MAX_CANDIDATE_STATIONS`]. An empty route yields no candidates.
pub async fn stations_near_route(
    store: &dyn StationStore,
    route_points: &[Coordinate],
    config: &SearchConfig,
) -> Result<Vec<FuelStation>, StoreError> {
    let Some(bounds) = BoundingBox::from_route_points(route_points, BBOX_PADDING_DEGREES) else {
        return Ok(Vec::new());
    };

    let stations = store.stations_in_bounds(&bounds).await?;
    tracing::debug!(
        "corridor query (radius {} mi) returned {} candidate stations in {:?}",
        config.search_radius_miles,
        stations.len(),
        bounds
    );
    Ok(stations)
}
