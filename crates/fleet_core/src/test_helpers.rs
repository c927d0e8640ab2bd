//! Shared fixtures for unit tests, integration tests and benches.
//!
//! Every location sits inside the default demand area (midtown Manhattan).

use bevy_ecs::prelude::World;
use h3o::CellIndex;

use crate::customer::CustomerRequest;
use crate::ids::{CustomerId, VehicleId};
use crate::scenario::{build_scenario, ScenarioParams};
use crate::spatial::{LatLon, DEFAULT_RESOLUTION};
use crate::store::{CustomerStore, VehicleStore};
use crate::vehicle::{AgentType, Vehicle, VehicleProfile};

/// A standard pickup point used across tests.
pub const TEST_PICKUP: LatLon = LatLon::new(40.7505, -73.9934);

/// A dropoff roughly 1.5 km north-east of [`TEST_PICKUP`].
pub const TEST_DROPOFF: LatLon = LatLon::new(40.7614, -73.9776);

/// A point a few hundred metres from [`TEST_PICKUP`].
pub const TEST_NEARBY: LatLon = LatLon::new(40.7527, -73.9910);

/// The H3 cell of [`TEST_PICKUP`] at the default resolution.
///
/// # Panics
///
/// Panics if the constant is not a valid coordinate (should never happen).
pub fn test_pickup_cell() -> CellIndex {
    TEST_PICKUP
        .to_cell(DEFAULT_RESOLUTION)
        .expect("TEST_PICKUP should map to an H3 cell")
}

/// A request from [`TEST_PICKUP`] to [`TEST_DROPOFF`] issued at `requested_at`.
pub fn test_request(id: u64, requested_at: u64) -> CustomerRequest {
    CustomerRequest {
        id: CustomerId(id),
        origin: TEST_PICKUP,
        destination: TEST_DROPOFF,
        requested_at,
        trip_time: 300.0,
        max_wait: 600.0,
    }
}

/// An Idle dummy vehicle with the default profile.
pub fn test_vehicle(id: u64, location: LatLon) -> Vehicle {
    Vehicle::new(VehicleId(id), location, AgentType::Dummy, VehicleProfile::default())
}

/// A world built from `params` with no vehicles populated.
///
/// This is a convenience function for tests that place their own vehicles; use
/// `build_scenario` directly for a randomly populated fleet.
pub fn create_test_world(params: ScenarioParams) -> World {
    let mut world = World::new();
    build_scenario(&mut world, params.with_num_vehicles(0));
    world
}

pub fn insert_vehicle(world: &mut World, vehicle: Vehicle) {
    world.resource_mut::<VehicleStore>().insert(vehicle);
}

pub fn insert_request(world: &mut World, request: CustomerRequest) {
    world.resource_mut::<CustomerStore>().insert_requests(vec![request]);
}
