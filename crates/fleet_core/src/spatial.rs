//! Spatial operations: great-circle geometry and H3 cell conversion.
//!
//! This module provides:
//!
//! - **LatLon**: plain geographic point in degrees
//! - **Distance calculations**: Haversine distance in metres, route lengths
//! - **Dead reckoning**: initial bearing and destination point along a bearing
//! - **Bounds**: bounding box used for spawning vehicles and demand
//!
//! Default resolution for cell keys is 9 (~240m cell size), suitable for city-scale simulations.

use std::fmt;

use h3o::{CellIndex, LatLng, Resolution};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Resolution used for route cache keys and pooling origin checks.
pub const DEFAULT_RESOLUTION: Resolution = Resolution::Nine;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// H3 cell containing this point, or `None` for non-finite coordinates.
    pub fn to_cell(self, resolution: Resolution) -> Option<CellIndex> {
        LatLng::new(self.lat, self.lon)
            .ok()
            .map(|ll| ll.to_cell(resolution))
    }

    /// Centroid of an H3 cell.
    pub fn from_cell(cell: CellIndex) -> Self {
        let ll: LatLng = cell.into();
        Self::new(ll.lat(), ll.lng())
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Haversine distance between two points in metres.
pub fn great_circle_distance(a: LatLon, b: LatLon) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lon.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lon.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Sum of great-circle leg lengths along `points`, in metres.
pub fn path_length(points: &[LatLon]) -> f64 {
    points
        .windows(2)
        .map(|leg| great_circle_distance(leg[0], leg[1]))
        .sum()
}

/// Initial bearing from `from` towards `to`, in radians clockwise from north.
pub fn bearing(from: LatLon, to: LatLon) -> f64 {
    let (lat1, lat2) = (from.lat.to_radians(), to.lat.to_radians());
    let dlon = (to.lon - from.lon).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x)
}

/// Point reached after travelling `distance_m` from `start` along `bearing_rad`.
pub fn end_location(start: LatLon, distance_m: f64, bearing_rad: f64) -> LatLon {
    let delta = distance_m / EARTH_RADIUS_M;
    let lat1 = start.lat.to_radians();
    let lon1 = start.lon.to_radians();
    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * bearing_rad.cos()).asin();
    let lon2 = lon1
        + (bearing_rad.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());
    LatLon::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl Default for Bounds {
    /// Manhattan, roughly.
    fn default() -> Self {
        Self {
            lat_min: 40.70,
            lat_max: 40.82,
            lon_min: -74.02,
            lon_max: -73.93,
        }
    }
}

impl Bounds {
    pub fn contains(&self, point: LatLon) -> bool {
        point.lat >= self.lat_min
            && point.lat <= self.lat_max
            && point.lon >= self.lon_min
            && point.lon <= self.lon_max
    }

    pub fn center(&self) -> LatLon {
        LatLon::new(
            (self.lat_min + self.lat_max) * 0.5,
            (self.lon_min + self.lon_max) * 0.5,
        )
    }

    /// Uniformly sampled point inside the box.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> LatLon {
        LatLon::new(
            rng.gen_range(self.lat_min..=self.lat_max),
            rng.gen_range(self.lon_min..=self.lon_max),
        )
    }
}
