use shared::Coordinate;

const EARTH_RADIUS_MILES: f64 = 3_959.0;

/// Great-circle distance between two points in miles (haversine).
pub fn haversine_miles(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_MILES * c
}

/// Distance in miles from `point` to the nearest point on the segment
/// `[seg_start, seg_end]`, endpoints included.
///
/// The projection is done in plain degree space, which treats the segment as
/// locally planar. Only valid for short segments; routes are expected to be
/// densified/simplified to segments of at most a few miles.
pub fn point_to_segment_miles(point: Coordinate, seg_start: Coordinate, seg_end: Coordinate) -> f64 {
    let (px, py) = (point.lon, point.lat);
    let (x1, y1) = (seg_start.lon, seg_start.lat);
    let (x2, y2) = (seg_end.lon, seg_end.lat);

    let dx = x2 - x1;
    let dy = y2 - y1;

    if dx == 0.0 && dy == 0.0 {
        return haversine_miles(point, seg_start);
    }

    let t = (((px - x1) * dx + (py - y1) * dy) / (dx * dx + dy * dy)).clamp(0.0, 1.0);

    let nearest = Coordinate {
        lon: x1 + t * dx,
        lat: y1 + t * dy,
    };

    haversine_miles(point, nearest)
}

/// A point expressed in route-relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteProjection {
    /// Miles from the route start to the nearest point on the route.
    pub distance_along_route: f64,
    /// Lateral offset from the route in miles.
    pub distance_from_route: f64,
}

/// Project `point` onto the polyline `route`, returning its position on the
/// route's 1-D distance axis and its lateral offset.
///
/// Walks consecutive segments accumulating haversine lengths and keeps the
/// segment with the smallest lateral distance. The along-segment offset of
/// the nearest point is estimated from the point's distances to the two
/// segment endpoints; the estimate is capped at one mile into the segment.
/// This is an approximation of arc-length parameterization, not an exact
/// spherical projection; accuracy degrades on long segments.
///
/// A route with fewer than two points yields a zero along-route distance and
/// an infinite lateral distance.
pub fn project_onto_route(point: Coordinate, route: &[Coordinate]) -> RouteProjection {
    let mut cumulative_distance = 0.0;
    let mut min_distance_from_route = f64::INFINITY;
    let mut distance_at_nearest = 0.0;

    for window in route.windows(2) {
        let p1 = window[0];
        let p2 = window[1];

        let segment_dist = haversine_miles(p1, p2);
        let dist_from_route = point_to_segment_miles(point, p1, p2);

        if dist_from_route < min_distance_from_route {
            min_distance_from_route = dist_from_route;

            let dist_to_p1 = haversine_miles(point, p1);
            let dist_to_p2 = haversine_miles(point, p2);

            let offset = if segment_dist > 0.0 {
                ((dist_to_p1 * dist_to_p1 - dist_to_p2 * dist_to_p2
                    + segment_dist * segment_dist)
                    / (2.0 * segment_dist * segment_dist)
                    * segment_dist)
                    .clamp(0.0, 1.0)
            } else {
                0.0
            };

            distance_at_nearest = cumulative_distance + offset;
        }

        cumulative_distance += segment_dist;
    }

    RouteProjection {
        distance_along_route: distance_at_nearest,
        distance_from_route: min_distance_from_route,
    }
}

/// Total polyline length in miles.
pub fn polyline_miles(route: &[Coordinate]) -> f64 {
    route.windows(2).map(|w| haversine_miles(w[0], w[1])).sum()
}
