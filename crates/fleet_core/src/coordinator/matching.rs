//! Matching coordinator: central quote, per-agent price negotiation and the
//! accept/reject outcome for each vehicle-customer pair.

use bevy_ecs::prelude::{Res, ResMut, World};
use bevy_ecs::system::SystemState;
use tracing::warn;

use super::require;
use crate::agents::PricingAgents;
use crate::clock::SimulationClock;
use crate::customer::choice::AcceptanceResource;
use crate::customer::CustomerRequest;
use crate::error::{ReferenceError, SimResult};
use crate::ids::{CustomerId, VehicleId};
use crate::pricing::{PriceInputs, PricingModelResource};
use crate::scenario::SimulationFlags;
use crate::spatial::great_circle_distance;
use crate::store::{CustomerStore, VehicleStore};
use crate::telemetry::SimTelemetry;
use crate::vehicle::VehicleEvent;

/// An unpriced vehicle-customer pairing proposed by the policy layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchProposal {
    pub vehicle_id: VehicleId,
    pub customer_id: CustomerId,
    /// Pickup travel time in seconds.
    pub duration: f64,
    /// Pickup travel distance in metres.
    pub distance: f64,
}

/// A priced pairing, ready for negotiation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCommand {
    pub vehicle_id: VehicleId,
    pub customer_id: CustomerId,
    pub duration: f64,
    pub distance: f64,
    pub init_price: f64,
}

#[derive(Debug, Default)]
pub struct MatchOutcome {
    /// Requests whose customer turned the offer down, one entry per rejection.
    pub rejected: Vec<CustomerRequest>,
    pub accepted: Vec<MatchCommand>,
    pub skipped: Vec<ReferenceError>,
}

/// Prices each proposal once with the configured [`PricingModel`](crate::pricing::PricingModel).
///
/// The priced distance is the pickup distance plus the great-circle length of the
/// customer's trip; the priced duration is the proposal's pickup time.
pub fn quote_proposals(
    world: &World,
    proposals: &[MatchProposal],
) -> SimResult<(Vec<MatchCommand>, Vec<ReferenceError>)> {
    let pricing = require(world.get_resource::<PricingModelResource>(), "PricingModelResource")?;
    let vehicles = require(world.get_resource::<VehicleStore>(), "VehicleStore")?;
    let customers = require(world.get_resource::<CustomerStore>(), "CustomerStore")?;

    let mut commands = Vec::with_capacity(proposals.len());
    let mut skipped = Vec::new();
    for proposal in proposals {
        let Some(vehicle) = vehicles.get(proposal.vehicle_id) else {
            warn!(vehicle = %proposal.vehicle_id, "quote skipped: unknown vehicle");
            skipped.push(ReferenceError::UnknownVehicle(proposal.vehicle_id));
            continue;
        };
        let Some(customer) = customers.get(proposal.customer_id) else {
            warn!(customer = %proposal.customer_id, "quote skipped: unknown customer");
            skipped.push(ReferenceError::UnknownCustomer(proposal.customer_id));
            continue;
        };
        let total_distance =
            proposal.distance + great_circle_distance(customer.origin(), customer.destination());
        let inputs = PriceInputs::for_vehicle(vehicle.profile(), total_distance, proposal.duration);
        commands.push(MatchCommand {
            vehicle_id: proposal.vehicle_id,
            customer_id: proposal.customer_id,
            duration: proposal.duration,
            distance: proposal.distance,
            init_price: pricing.0.quote(&inputs),
        });
    }
    Ok((commands, skipped))
}

/// Applies match commands in order.
///
/// With pricing enabled the vehicle's agent strategy sets the offered price and the
/// customer decides; otherwise every command is accepted at its quoted price. With
/// pooling enabled vehicles only queue customers during the loop and every vehicle
/// that accepted at least one command is committed to Assigned once at the end.
pub fn match_vehicles(world: &mut World, commands: &[MatchCommand]) -> SimResult<MatchOutcome> {
    let mut state: SystemState<(
        Option<Res<SimulationClock>>,
        Option<Res<SimulationFlags>>,
        Option<Res<PricingAgents>>,
        Option<Res<AcceptanceResource>>,
        Option<ResMut<VehicleStore>>,
        Option<ResMut<CustomerStore>>,
        Option<ResMut<SimTelemetry>>,
    )> = SystemState::new(world);
    let (clock, flags, agents, acceptance, vehicles, customers, telemetry) = state.get_mut(world);
    let now = require(clock, "SimulationClock")?.now();
    let flags = *require(flags, "SimulationFlags")?;
    let agents = require(agents, "PricingAgents")?;
    let acceptance = require(acceptance, "AcceptanceResource")?;
    let mut vehicles = require(vehicles, "VehicleStore")?;
    let mut customers = require(customers, "CustomerStore")?;
    let mut telemetry = require(telemetry, "SimTelemetry")?;

    let mut outcome = MatchOutcome::default();
    let mut pooled: Vec<VehicleId> = Vec::new();

    for command in commands {
        let Some(vehicle) = vehicles.get_mut(command.vehicle_id) else {
            warn!(vehicle = %command.vehicle_id, "match skipped: unknown vehicle");
            outcome.skipped.push(ReferenceError::UnknownVehicle(command.vehicle_id));
            continue;
        };
        let Some(customer) = customers.get_mut(command.customer_id) else {
            warn!(customer = %command.customer_id, "match skipped: unknown customer");
            outcome.skipped.push(ReferenceError::UnknownCustomer(command.customer_id));
            continue;
        };

        let (accepted, price) = if flags.enable_pricing {
            let price = agents
                .for_agent(vehicle.agent_type())
                .decide(vehicle, command.init_price, customer.request());
            let accepted = acceptance.0.accept_or_reject(customer, price, vehicle, command.duration);
            (accepted, price)
        } else {
            (true, command.init_price)
        };

        if !accepted {
            customer.reject_offer();
            outcome.rejected.push(customer.request().clone());
            continue;
        }

        vehicle.ensure_can_take_customer()?;
        customer.wait_for_vehicle(command.duration, price)?;
        let event = vehicle.head_for_customer(
            customer.origin(),
            command.duration,
            command.customer_id,
            command.distance,
            flags.enable_pooling,
        )?;
        if flags.log_vehicle {
            telemetry.record_vehicle_event(now, vehicle, event);
        }
        if flags.enable_pooling && !pooled.contains(&command.vehicle_id) {
            pooled.push(command.vehicle_id);
        }
        outcome.accepted.push(*command);
    }

    for id in pooled {
        let Some(vehicle) = vehicles.get_mut(id) else {
            continue;
        };
        if vehicle.commit_assignment()? && flags.log_vehicle {
            telemetry.record_vehicle_event(now, vehicle, VehicleEvent::Assigned);
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::PriceDecision;
    use crate::customer::choice::RideAcceptance;
    use crate::customer::{Customer, CustomerStatus};
    use crate::error::{InvariantViolation, SimError};
    use crate::pricing::{CostPlusPricing, PricingModel};
    use crate::scenario::{build_scenario, ScenarioParams};
    use crate::spatial::LatLon;
    use crate::vehicle::{AgentType, Vehicle, VehicleProfile, VehicleStatus};

    const ORIGIN: LatLon = LatLon::new(40.7500, -73.9900);
    const DESTINATION: LatLon = LatLon::new(40.7600, -73.9800);

    struct Never;

    impl RideAcceptance for Never {
        fn accept_or_reject(&self, _: &Customer, _: f64, _: &Vehicle, _: f64) -> bool {
            false
        }
    }

    struct Always;

    impl RideAcceptance for Always {
        fn accept_or_reject(&self, _: &Customer, _: f64, _: &Vehicle, _: f64) -> bool {
            true
        }
    }

    struct Double;

    impl PriceDecision for Double {
        fn decide(&self, _: &Vehicle, init_price: f64, _: &CustomerRequest) -> f64 {
            init_price * 2.0
        }
    }

    fn world(params: ScenarioParams) -> World {
        let mut world = World::new();
        build_scenario(&mut world, params.with_num_vehicles(0));
        world
    }

    fn add_vehicle(world: &mut World, id: u64, agent_type: AgentType) {
        world.resource_mut::<VehicleStore>().insert(Vehicle::new(
            VehicleId(id),
            LatLon::new(40.7450, -73.9950),
            agent_type,
            VehicleProfile::default(),
        ));
    }

    fn add_customer(world: &mut World, id: u64) {
        world.resource_mut::<CustomerStore>().insert_requests(vec![CustomerRequest {
            id: CustomerId(id),
            origin: ORIGIN,
            destination: DESTINATION,
            requested_at: 0,
            trip_time: 180.0,
            max_wait: 600.0,
        }]);
    }

    fn command(vehicle: u64, customer: u64) -> MatchCommand {
        MatchCommand {
            vehicle_id: VehicleId(vehicle),
            customer_id: CustomerId(customer),
            duration: 300.0,
            distance: 700.0,
            init_price: 9.5,
        }
    }

    #[test]
    fn accepted_command_assigns_vehicle_and_matches_customer() {
        let mut world = world(ScenarioParams::default());
        add_vehicle(&mut world, 1, AgentType::Dummy);
        add_customer(&mut world, 10);

        let outcome = match_vehicles(&mut world, &[command(1, 10)]).expect("match");
        assert_eq!(outcome.accepted, vec![command(1, 10)]);
        assert!(outcome.rejected.is_empty());

        let vehicle = world.resource::<VehicleStore>().get(VehicleId(1)).cloned().expect("vehicle");
        assert_eq!(vehicle.status(), VehicleStatus::Assigned);
        assert_eq!(vehicle.current_capacity(), 1);
        assert_eq!(vehicle.destination(), ORIGIN);
        assert_eq!(vehicle.time_to_destination(), 300.0);
        assert_eq!(vehicle.travel_distance(), 700.0);

        let store = world.resource::<CustomerStore>();
        let customer = store.get(CustomerId(10)).expect("customer");
        assert_eq!(customer.status(), CustomerStatus::Matched);
        assert_eq!(customer.pickup_eta(), 300.0);
        assert_eq!(customer.accepted_price(), Some(9.5));
    }

    #[test]
    fn unknown_ids_are_skipped_and_reported() {
        let mut world = world(ScenarioParams::default());
        add_vehicle(&mut world, 1, AgentType::Dummy);
        add_customer(&mut world, 10);

        let outcome =
            match_vehicles(&mut world, &[command(5, 10), command(1, 99), command(1, 10)]).expect("match");
        assert_eq!(
            outcome.skipped,
            vec![
                ReferenceError::UnknownVehicle(VehicleId(5)),
                ReferenceError::UnknownCustomer(CustomerId(99)),
            ]
        );
        assert_eq!(outcome.accepted.len(), 1);
    }

    #[test]
    fn rejected_offer_leaves_state_and_reenters_pool() {
        let mut world = world(ScenarioParams::default().with_pricing(true));
        world.insert_resource(AcceptanceResource(Box::new(Never)));
        add_vehicle(&mut world, 1, AgentType::Dummy);
        add_customer(&mut world, 10);
        assert_eq!(world.resource_mut::<CustomerStore>().take_request_pool().len(), 1);

        let outcome = match_vehicles(&mut world, &[command(1, 10)]).expect("match");
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].id, CustomerId(10));

        let vehicle = world.resource::<VehicleStore>().get(VehicleId(1)).cloned().expect("vehicle");
        assert_eq!(vehicle.status(), VehicleStatus::Idle);
        assert_eq!(vehicle.current_capacity(), 0);

        let mut store = world.resource_mut::<CustomerStore>();
        assert_eq!(store.get(CustomerId(10)).map(|c| c.status()), Some(CustomerStatus::Waiting));
        let pool = store.take_request_pool();
        assert_eq!(pool.len(), 1, "rejected customers carry over to the next pool");
    }

    #[test]
    fn learned_agents_set_their_own_price() {
        let mut world = world(ScenarioParams::default().with_pricing(true));
        world.insert_resource(AcceptanceResource(Box::new(Always)));
        world.insert_resource(PricingAgents::default().with_learned(Box::new(Double)));
        add_vehicle(&mut world, 1, AgentType::Learned);
        add_vehicle(&mut world, 2, AgentType::Dummy);
        add_customer(&mut world, 10);
        add_customer(&mut world, 11);

        match_vehicles(&mut world, &[command(1, 10), command(2, 11)]).expect("match");
        let store = world.resource::<CustomerStore>();
        assert_eq!(store.get(CustomerId(10)).and_then(|c| c.accepted_price()), Some(19.0));
        assert_eq!(store.get(CustomerId(11)).and_then(|c| c.accepted_price()), Some(9.5));
    }

    #[test]
    fn pooled_vehicle_commits_once_after_all_commands() {
        let mut world = world(ScenarioParams::default().with_pooling(true).with_vehicle_log(true));
        add_vehicle(&mut world, 1, AgentType::Dummy);
        add_customer(&mut world, 10);
        add_customer(&mut world, 11);

        let outcome = match_vehicles(&mut world, &[command(1, 10), command(1, 11)]).expect("match");
        assert_eq!(outcome.accepted.len(), 2);

        let vehicle = world.resource::<VehicleStore>().get(VehicleId(1)).cloned().expect("vehicle");
        assert_eq!(vehicle.status(), VehicleStatus::Assigned);
        assert_eq!(vehicle.current_capacity(), 2);
        assert_eq!(vehicle.queued_customers(), &[CustomerId(10), CustomerId(11)]);

        let events: Vec<_> = world
            .resource::<SimTelemetry>()
            .vehicle_events
            .iter()
            .map(|e| e.event)
            .collect();
        assert_eq!(events, vec!["head_for_customer", "head_for_customer", "assigned"]);
    }

    #[test]
    fn matching_an_already_matched_customer_is_fatal() {
        let mut world = world(ScenarioParams::default());
        add_vehicle(&mut world, 1, AgentType::Dummy);
        add_vehicle(&mut world, 2, AgentType::Dummy);
        add_customer(&mut world, 10);

        let err = match_vehicles(&mut world, &[command(1, 10), command(2, 10)]).expect_err("double match");
        assert!(matches!(
            err,
            SimError::Invariant(InvariantViolation::CustomerStatus { customer: CustomerId(10), .. })
        ));
    }

    #[test]
    fn quotes_cover_pickup_and_trip_distance() {
        let mut world = world(ScenarioParams::default());
        add_vehicle(&mut world, 1, AgentType::Dummy);
        add_customer(&mut world, 10);

        let proposals = [
            MatchProposal {
                vehicle_id: VehicleId(1),
                customer_id: CustomerId(10),
                duration: 300.0,
                distance: 700.0,
            },
            MatchProposal {
                vehicle_id: VehicleId(1),
                customer_id: CustomerId(77),
                duration: 300.0,
                distance: 700.0,
            },
        ];
        let (commands, skipped) = quote_proposals(&world, &proposals).expect("quote");
        assert_eq!(skipped, vec![ReferenceError::UnknownCustomer(CustomerId(77))]);
        assert_eq!(commands.len(), 1);

        let expected = CostPlusPricing.quote(&PriceInputs::for_vehicle(
            &VehicleProfile::default(),
            700.0 + great_circle_distance(ORIGIN, DESTINATION),
            300.0,
        ));
        assert!((commands[0].init_price - expected).abs() < 1e-9);
        assert_eq!(commands[0].duration, 300.0);
    }

    #[test]
    fn longer_pickup_raises_the_quote() {
        let mut world = world(ScenarioParams::default());
        add_vehicle(&mut world, 1, AgentType::Dummy);
        add_customer(&mut world, 10);
        assert!(VehicleProfile::default().price_per_wait_min > 0.0);

        let proposal = |duration| MatchProposal {
            vehicle_id: VehicleId(1),
            customer_id: CustomerId(10),
            duration,
            distance: 700.0,
        };
        let (commands, _) = quote_proposals(&world, &[proposal(60.0), proposal(1_200.0)]).expect("quote");
        let (short, long) = (commands[0].init_price, commands[1].init_price);
        assert!(long > short, "{long} should exceed {short}");

        let free_wait = VehicleProfile {
            price_per_wait_min: 0.0,
            ..VehicleProfile::default()
        };
        let quote = |duration| {
            CostPlusPricing.quote(&PriceInputs::for_vehicle(&free_wait, 1_000.0, duration))
        };
        assert!(quote(1_200.0) >= quote(60.0));
    }

    #[test]
    fn full_vehicle_leaves_customer_waiting() {
        let mut world = world(ScenarioParams::default());
        add_vehicle(&mut world, 1, AgentType::Dummy);
        add_customer(&mut world, 10);
        add_customer(&mut world, 11);

        let err = match_vehicles(&mut world, &[command(1, 10), command(1, 11)]).expect_err("busy vehicle");
        assert!(matches!(
            err,
            SimError::Invariant(InvariantViolation::VehicleUnavailable { vehicle: VehicleId(1), .. })
        ));
        let store = world.resource::<CustomerStore>();
        assert_eq!(store.get(CustomerId(10)).map(|c| c.status()), Some(CustomerStatus::Matched));
        assert_eq!(store.get(CustomerId(11)).map(|c| c.status()), Some(CustomerStatus::Waiting));
        assert_eq!(store.get(CustomerId(11)).and_then(|c| c.accepted_price()), None);
    }
}
