use bevy_ecs::prelude::World;
use rand::Rng;
use tracing::info;

use crate::agents::PricingAgents;
use crate::clock::SimulationClock;
use crate::customer::choice::{AcceptanceResource, FareResource, PooledFare, WillingnessToPay};
use crate::demand::{DemandResource, PoissonDemand};
use crate::ids::VehicleId;
use crate::pricing::{CostPlusPricing, PricingModelResource};
use crate::routing::{GridRouter, RoutingResource};
use crate::runner::SimFault;
use crate::scenario::params::{FleetComposition, FleetCounts, ScenarioParams, SimRng};
use crate::spatial::LatLon;
use crate::store::{CustomerStore, VehicleStore};
use crate::telemetry::SimTelemetry;
use crate::vehicle::{AgentType, Vehicle};

/// Installs every resource the tick schedule and the coordinators need, then
/// populates `params.num_vehicles` vehicles at random points of the demand area.
///
/// Collaborators get their bundled implementations; replace the resources
/// afterwards to plug in others.
pub fn build_scenario(world: &mut World, params: ScenarioParams) {
    world.insert_resource(SimulationClock::new(params.start_time, params.timestep_secs.max(1)));
    world.insert_resource(params.flags);
    world.insert_resource(params.market);
    world.insert_resource(params.policy);
    world.insert_resource(params.fleet);
    world.insert_resource(FleetCounts::default());
    world.insert_resource(SimRng::seeded(params.seed));
    world.insert_resource(VehicleStore::default());
    world.insert_resource(CustomerStore::default());
    world.insert_resource(SimTelemetry::default());
    world.insert_resource(SimFault::default());
    world.insert_resource(PricingAgents::default());
    world.insert_resource(PricingModelResource(Box::new(CostPlusPricing)));
    world.insert_resource(RoutingResource(Box::new(GridRouter::new(&params.routing))));
    world.insert_resource(DemandResource(Box::new(PoissonDemand::new(params.demand.clone()))));
    world.insert_resource(AcceptanceResource(Box::new(WillingnessToPay::new(params.acceptance))));
    world.insert_resource(FareResource(Box::new(PooledFare::new(params.fare))));

    let bounds = params.demand.bounds;
    for id in 0..params.num_vehicles as u64 {
        let location = bounds.sample(&mut world.resource_mut::<SimRng>().0);
        populate_vehicle(world, VehicleId(id), location);
    }
    info!(
        vehicles = params.num_vehicles,
        pooling = params.flags.enable_pooling,
        pricing = params.flags.enable_pricing,
        "scenario built"
    );
}

/// Adds an Idle vehicle at `location`.
///
/// The agent type follows the fleet quotas: a coin flip picks dummy while dummy
/// quota remains; otherwise learned while learned quota remains; otherwise dummy.
pub fn populate_vehicle(world: &mut World, id: VehicleId, location: LatLon) -> AgentType {
    let composition = *world.resource::<FleetComposition>();
    let coin = world.resource_mut::<SimRng>().0.gen_range(0..2u8);
    let agent_type = {
        let mut counts = world.resource_mut::<FleetCounts>();
        let agent_type = pick_agent_type(coin, &composition, &counts);
        match agent_type {
            AgentType::Dummy => counts.dummy += 1,
            AgentType::Learned => counts.learned += 1,
        }
        agent_type
    };
    world
        .resource_mut::<VehicleStore>()
        .insert(Vehicle::new(id, location, agent_type, composition.profile));
    agent_type
}

fn pick_agent_type(coin: u8, composition: &FleetComposition, counts: &FleetCounts) -> AgentType {
    if coin == 0 && counts.dummy < composition.dummy_vehicles {
        AgentType::Dummy
    } else if counts.learned < composition.learned_vehicles {
        AgentType::Learned
    } else {
        AgentType::Dummy
    }
}
