//! Per-agent price negotiation strategies.
//!
//! Each vehicle carries an [`AgentType`]; the coordinator asks the matching strategy
//! in [`PricingAgents`] for the price to offer a customer.

use bevy_ecs::prelude::Resource;

use crate::customer::CustomerRequest;
use crate::vehicle::{AgentType, Vehicle};

pub trait PriceDecision: Send + Sync {
    /// Price the vehicle offers for `request`, given the centrally quoted `init_price`.
    fn decide(&self, vehicle: &Vehicle, init_price: f64, request: &CustomerRequest) -> f64;
}

/// Offers the quoted price unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyPricingAgent;

impl PriceDecision for DummyPricingAgent {
    fn decide(&self, _vehicle: &Vehicle, init_price: f64, _request: &CustomerRequest) -> f64 {
        init_price
    }
}

/// Strategy table keyed by agent type. Both slots default to [`DummyPricingAgent`].
#[derive(Resource)]
pub struct PricingAgents {
    pub dummy: Box<dyn PriceDecision>,
    pub learned: Box<dyn PriceDecision>,
}

impl Default for PricingAgents {
    fn default() -> Self {
        Self {
            dummy: Box::new(DummyPricingAgent),
            learned: Box::new(DummyPricingAgent),
        }
    }
}

impl PricingAgents {
    pub fn with_learned(mut self, learned: Box<dyn PriceDecision>) -> Self {
        self.learned = learned;
        self
    }

    pub fn for_agent(&self, agent_type: AgentType) -> &dyn PriceDecision {
        match agent_type {
            AgentType::Dummy => self.dummy.as_ref(),
            AgentType::Learned => self.learned.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{CustomerId, VehicleId};
    use crate::spatial::LatLon;
    use crate::vehicle::VehicleProfile;

    struct Markup(f64);

    impl PriceDecision for Markup {
        fn decide(&self, _vehicle: &Vehicle, init_price: f64, _request: &CustomerRequest) -> f64 {
            init_price * self.0
        }
    }

    #[test]
    fn strategy_is_selected_by_agent_type() {
        let agents = PricingAgents::default().with_learned(Box::new(Markup(2.0)));
        let at = LatLon::new(40.75, -73.99);
        let request = CustomerRequest {
            id: CustomerId(1),
            origin: at,
            destination: at,
            requested_at: 0,
            trip_time: 60.0,
            max_wait: 60.0,
        };
        let dummy = Vehicle::new(VehicleId(1), at, AgentType::Dummy, VehicleProfile::default());
        let learned = Vehicle::new(VehicleId(2), at, AgentType::Learned, VehicleProfile::default());

        let price = |v: &Vehicle| agents.for_agent(v.agent_type()).decide(v, 10.0, &request);
        assert_eq!(price(&dummy), 10.0);
        assert_eq!(price(&learned), 20.0);
    }
}
