#![allow(dead_code)]

use bevy_ecs::prelude::World;
use fleet_core::scenario::{MarketConfig, ScenarioParams};
use fleet_core::test_helpers::create_test_world;
use fleet_core::vehicle::VehicleProfile;

/// Builder configuration for reproducible test worlds.
#[derive(Clone, Debug)]
pub struct TestWorldConfig {
    pub seed: u64,
    pub timestep_secs: u64,
    pub pooling: bool,
    pub pricing: bool,
    pub log_vehicle: bool,
    pub requests_per_hour: f64,
    pub market: MarketConfig,
    pub profile: VehicleProfile,
}

impl Default for TestWorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            timestep_secs: 60,
            pooling: false,
            pricing: false,
            log_vehicle: true,
            requests_per_hour: 0.0,
            market: MarketConfig::default(),
            profile: VehicleProfile::default(),
        }
    }
}

/// Helper that builds a scenario world without a populated fleet, so tests
/// place every vehicle and customer themselves.
#[derive(Debug, Default)]
pub struct TestWorldBuilder {
    config: TestWorldConfig,
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn with_timestep_secs(mut self, timestep_secs: u64) -> Self {
        self.config.timestep_secs = timestep_secs;
        self
    }

    pub fn with_pooling(mut self, enabled: bool) -> Self {
        self.config.pooling = enabled;
        self
    }

    pub fn with_pricing(mut self, enabled: bool) -> Self {
        self.config.pricing = enabled;
        self
    }

    /// Background demand; zero (the default) keeps the customer store under the
    /// test's control.
    pub fn with_requests_per_hour(mut self, requests_per_hour: f64) -> Self {
        self.config.requests_per_hour = requests_per_hour;
        self
    }

    pub fn with_market(mut self, market: MarketConfig) -> Self {
        self.config.market = market;
        self
    }

    pub fn with_profile(mut self, profile: VehicleProfile) -> Self {
        self.config.profile = profile;
        self
    }

    pub fn params(&self) -> ScenarioParams {
        let TestWorldConfig {
            seed,
            timestep_secs,
            pooling,
            pricing,
            log_vehicle,
            requests_per_hour,
            market,
            profile,
        } = self.config.clone();
        ScenarioParams::default()
            .with_seed(seed)
            .with_timestep_secs(timestep_secs)
            .with_pooling(pooling)
            .with_pricing(pricing)
            .with_vehicle_log(log_vehicle)
            .with_requests_per_hour(requests_per_hour)
            .with_market(market)
            .with_vehicle_profile(profile)
    }

    pub fn build(self) -> World {
        create_test_world(self.params())
    }
}
