//! Injects the requests issued during the current tick.

use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::SimulationClock;
use crate::demand::DemandResource;
use crate::store::CustomerStore;

pub fn demand_system(
    clock: Res<SimulationClock>,
    mut demand: ResMut<DemandResource>,
    mut customers: ResMut<CustomerStore>,
) {
    let requests = demand.0.generate(clock.now(), clock.timestep());
    customers.insert_requests(requests);
}
