//! Routing collaborator: shortest paths and travel times between points.
//!
//! The engine depends only on [`RoutingEngine`], stored as a boxed ECS resource
//! ([`RoutingResource`]). [`GridRouter`] is the bundled implementation; it walks
//! the H3 grid between the two endpoints and assumes a constant cruise speed.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use bevy_ecs::prelude::Resource;
use h3o::{CellIndex, Resolution};
use lru::LruCache;
use tracing::warn;

use crate::scenario::RoutingConfig;
use crate::spatial::{path_length, LatLon, DEFAULT_RESOLUTION};

/// A drivable path and the time it takes.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Waypoints from the origin to the destination, inclusive.
    pub path: Vec<LatLon>,
    /// Travel time in seconds.
    pub triptime: f64,
}

impl Route {
    /// Routes that cannot be driven: no waypoints or no travel time.
    pub fn is_degenerate(&self) -> bool {
        self.path.is_empty() || self.triptime <= 0.0
    }

    pub fn length_m(&self) -> f64 {
        path_length(&self.path)
    }
}

/// Key of a precomputed repositioning route: the cell the vehicle is in and the
/// cell it should move towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteCacheKey {
    pub location: CellIndex,
    pub anchor: CellIndex,
}

pub trait RoutingEngine: Send + Sync {
    /// Routes every `(origin, destination)` pair; the output has one route per
    /// pair, in input order.
    fn route(&self, od_pairs: &[(LatLon, LatLon)]) -> Vec<Route>;

    /// Looks up a cached repositioning route.
    fn get_route_cache(&self, key: RouteCacheKey) -> Option<Route>;
}

#[derive(Resource)]
pub struct RoutingResource(pub Box<dyn RoutingEngine>);

/// Routes along H3 grid paths at a constant speed.
pub struct GridRouter {
    resolution: Resolution,
    speed_mps: f64,
    cache: Mutex<LruCache<RouteCacheKey, Route>>,
}

impl GridRouter {
    pub fn new(config: &RoutingConfig) -> Self {
        let resolution = Resolution::try_from(config.resolution).unwrap_or_else(|_| {
            warn!(resolution = config.resolution, "invalid H3 resolution, using default");
            DEFAULT_RESOLUTION
        });
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            resolution,
            speed_mps: config.cruise_speed_mps.max(f64::EPSILON),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn speed_mps(&self) -> f64 {
        self.speed_mps
    }

    /// Builds the route between two points. Intermediate waypoints are the centres
    /// of the grid cells between the endpoint cells; the endpoints are kept exact.
    pub fn route_between(&self, origin: LatLon, destination: LatLon) -> Route {
        let mut path = vec![origin];
        if let (Some(from), Some(to)) = (origin.to_cell(self.resolution), destination.to_cell(self.resolution)) {
            path.extend(interior_cells(from, to).into_iter().map(LatLon::from_cell));
        }
        path.push(destination);
        let triptime = path_length(&path) / self.speed_mps;
        Route { path, triptime }
    }

    fn cached_route(&self, key: RouteCacheKey) -> Route {
        let compute = || self.route_between(LatLon::from_cell(key.location), LatLon::from_cell(key.anchor));
        let Ok(mut cache) = self.cache.lock() else {
            return compute();
        };
        if let Some(route) = cache.get(&key) {
            return route.clone();
        }
        let route = compute();
        cache.put(key, route.clone());
        route
    }
}

/// Cells strictly between `from` and `to` along the grid path. Empty when the two
/// are neighbours, equal, or too far apart for a grid path.
fn interior_cells(from: CellIndex, to: CellIndex) -> Vec<CellIndex> {
    let Ok(path) = from.grid_path_cells(to) else {
        return Vec::new();
    };
    let cells: Vec<CellIndex> = path.filter_map(Result::ok).collect();
    if cells.len() <= 2 {
        return Vec::new();
    }
    cells[1..cells.len() - 1].to_vec()
}

impl RoutingEngine for GridRouter {
    fn route(&self, od_pairs: &[(LatLon, LatLon)]) -> Vec<Route> {
        od_pairs
            .iter()
            .map(|&(origin, destination)| self.route_between(origin, destination))
            .collect()
    }

    fn get_route_cache(&self, key: RouteCacheKey) -> Option<Route> {
        let route = self.cached_route(key);
        (!route.is_degenerate()).then_some(route)
    }
}
