//! Dispatch coordinator: rest breaks and repositioning moves.

use bevy_ecs::prelude::{Res, ResMut, World};
use bevy_ecs::system::SystemState;
use rand::Rng;
use tracing::{debug, warn};

use super::require;
use crate::clock::SimulationClock;
use crate::error::{ReferenceError, SimResult};
use crate::ids::VehicleId;
use crate::routing::{RouteCacheKey, RoutingResource};
use crate::scenario::{MarketConfig, SimRng, SimulationFlags};
use crate::spatial::LatLon;
use crate::store::VehicleStore;
use crate::telemetry::SimTelemetry;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchAction {
    /// Rest in place for a random share of the configured off duration.
    OffDuty,
    /// Cruise along a precomputed route.
    CachedRoute(RouteCacheKey),
    /// Cruise to a point; routed in one batch with the other destination commands.
    Destination(LatLon),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchCommand {
    pub vehicle_id: VehicleId,
    pub action: DispatchAction,
}

#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub dispatched: Vec<VehicleId>,
    /// Vehicles left untouched because no usable route was found.
    pub unroutable: Vec<VehicleId>,
    pub skipped: Vec<ReferenceError>,
}

/// Applies dispatch commands. Off-duty and cached-route commands are applied in
/// order; destination commands are then routed with a single call to the routing
/// engine, which is not called at all when there are none.
pub fn dispatch_vehicles(world: &mut World, commands: &[DispatchCommand]) -> SimResult<DispatchOutcome> {
    let mut state: SystemState<(
        Option<Res<SimulationClock>>,
        Option<Res<SimulationFlags>>,
        Option<Res<MarketConfig>>,
        Option<Res<RoutingResource>>,
        Option<ResMut<SimRng>>,
        Option<ResMut<VehicleStore>>,
        Option<ResMut<SimTelemetry>>,
    )> = SystemState::new(world);
    let (clock, flags, market, routing, rng, vehicles, telemetry) = state.get_mut(world);
    let now = require(clock, "SimulationClock")?.now();
    let log_vehicle = require(flags, "SimulationFlags")?.log_vehicle;
    let off_duration = require(market, "MarketConfig")?.off_duration.max(0.0);
    let routing = require(routing, "RoutingResource")?;
    let mut rng = require(rng, "SimRng")?;
    let mut vehicles = require(vehicles, "VehicleStore")?;
    let mut telemetry = require(telemetry, "SimTelemetry")?;

    let mut outcome = DispatchOutcome::default();
    let mut pending: Vec<(VehicleId, LatLon, LatLon)> = Vec::new();

    for command in commands {
        let Some(vehicle) = vehicles.get_mut(command.vehicle_id) else {
            warn!(vehicle = %command.vehicle_id, "dispatch skipped: unknown vehicle");
            outcome.skipped.push(ReferenceError::UnknownVehicle(command.vehicle_id));
            continue;
        };
        let event = match command.action {
            DispatchAction::OffDuty => {
                let duration = rng.0.gen_range(0.5 * off_duration..=1.5 * off_duration);
                vehicle.take_rest(duration)?
            }
            DispatchAction::CachedRoute(key) => match routing.0.get_route_cache(key) {
                Some(route) if !route.is_degenerate() => vehicle.cruise(route.path, route.triptime)?,
                _ => {
                    debug!(vehicle = %command.vehicle_id, ?key, "no cached route, vehicle left in place");
                    outcome.unroutable.push(command.vehicle_id);
                    continue;
                }
            },
            DispatchAction::Destination(point) => {
                pending.push((command.vehicle_id, vehicle.location(), point));
                continue;
            }
        };
        if log_vehicle {
            telemetry.record_vehicle_event(now, vehicle, event);
        }
        outcome.dispatched.push(command.vehicle_id);
    }

    if pending.is_empty() {
        return Ok(outcome);
    }

    let od_pairs: Vec<(LatLon, LatLon)> = pending.iter().map(|&(_, from, to)| (from, to)).collect();
    let routes = routing.0.route(&od_pairs);
    for ((id, _, to), route) in pending.into_iter().zip(routes) {
        if route.is_degenerate() {
            debug!(vehicle = %id, destination = %to, "degenerate route, vehicle left in place");
            outcome.unroutable.push(id);
            continue;
        }
        let Some(vehicle) = vehicles.get_mut(id) else {
            continue;
        };
        let event = vehicle.cruise(route.path, route.triptime)?;
        if log_vehicle {
            telemetry.record_vehicle_event(now, vehicle, event);
        }
        outcome.dispatched.push(id);
    }

    Ok(outcome)
}
