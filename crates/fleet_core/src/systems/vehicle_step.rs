//! Steps every vehicle's state machine and retires vehicles that exit the market.

use bevy_ecs::prelude::{Res, ResMut};
use tracing::error;

use crate::clock::SimulationClock;
use crate::customer::choice::FareResource;
use crate::error::SimError;
use crate::runner::SimFault;
use crate::scenario::{MarketConfig, SimulationFlags};
use crate::store::{CustomerStore, VehicleStore};
use crate::telemetry::SimTelemetry;

/// Vehicles are stepped in insertion order. A failing vehicle is logged with its
/// full state, recorded as the run's fault, and stops this tick; the remaining
/// systems are skipped by their run condition.
#[allow(clippy::too_many_arguments)]
pub fn vehicle_step_system(
    clock: Res<SimulationClock>,
    flags: Res<SimulationFlags>,
    market: Res<MarketConfig>,
    fares: Res<FareResource>,
    mut vehicles: ResMut<VehicleStore>,
    mut customers: ResMut<CustomerStore>,
    mut telemetry: ResMut<SimTelemetry>,
    mut fault: ResMut<SimFault>,
) {
    let now = clock.now();
    let dt = clock.timestep_secs();
    let mut exiting = Vec::new();

    for vehicle in vehicles.iter_mut() {
        match vehicle.step(dt, &mut customers, fares.0.as_ref()) {
            Ok(Some(event)) if flags.log_vehicle => telemetry.record_vehicle_event(now, vehicle, event),
            Ok(_) => {}
            Err(source) => {
                error!(vehicle = ?vehicle, %source, "vehicle step failed");
                fault.raise(SimError::VehicleStep {
                    snapshot: Box::new(vehicle.clone()),
                    source,
                });
                return;
            }
        }
        if vehicle.exit_market(&market) {
            exiting.push(vehicle.id());
        }
    }

    for id in exiting {
        if let Some(vehicle) = vehicles.remove(id) {
            telemetry.record_score(now, &vehicle);
        }
    }
}
