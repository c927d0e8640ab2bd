//! Scenario setup: turn serializable parameters into simulation resources and
//! populate the initial fleet.

mod build;
mod params;

pub use build::{build_scenario, populate_vehicle};
pub use params::{
    AcceptanceConfig, DemandConfig, FareConfig, FleetComposition, FleetCounts, MarketConfig,
    PolicyConfig, RoutingConfig, ScenarioParams, SimRng, SimulationFlags,
};
