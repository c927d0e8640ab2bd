//! Route following for cruising vehicles.

use crate::spatial::{bearing, end_location, great_circle_distance, LatLon};

/// Moves `distance_m` along `[location] + route`.
///
/// Returns the new location and the waypoints still ahead of it. When the
/// distance covers the whole route the vehicle ends on the last waypoint with an
/// empty plan; an empty route leaves the vehicle where it is.
pub fn advance_along_route(location: LatLon, route: &[LatLon], distance_m: f64) -> (LatLon, Vec<LatLon>) {
    let mut left = distance_m;
    let mut from = location;
    for (i, &to) in route.iter().enumerate() {
        let leg = great_circle_distance(from, to);
        if left < leg {
            let next = end_location(from, left, bearing(from, to));
            // Keep the leg's target so the vehicle never cuts the corner.
            return (next, route[i..].to_vec());
        }
        left -= leg;
        from = to;
    }
    match route.last() {
        Some(&last) => (last, Vec::new()),
        None => (location, Vec::new()),
    }
}
