use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::clock::{ONE_HOUR_SECS, ONE_MIN_SECS};
use crate::spatial::Bounds;
use crate::vehicle::VehicleProfile;

/// Feature switches read by the coordinators and vehicle logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct SimulationFlags {
    /// Several customers may share one vehicle; assignments commit per matching round.
    pub enable_pooling: bool,
    /// Vehicles negotiate prices and customers may reject them.
    pub enable_pricing: bool,
    /// Record one line per vehicle state change.
    pub log_vehicle: bool,
}

/// Working-time limits and rest length, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct MarketConfig {
    /// A vehicle that has just finished a job leaves after this much work.
    pub min_working_time: f64,
    /// A vehicle that has been idle leaves after this much work.
    pub max_working_time: f64,
    /// Mean rest length; samples are uniform in [0.5, 1.5] times this.
    pub off_duration: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            min_working_time: (6 * ONE_HOUR_SECS) as f64,
            max_working_time: (10 * ONE_HOUR_SECS) as f64,
            off_duration: (30 * ONE_MIN_SECS) as f64,
        }
    }
}

/// How many vehicles of each agent type to populate, and the profile they share.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct FleetComposition {
    pub dummy_vehicles: usize,
    pub learned_vehicles: usize,
    pub profile: VehicleProfile,
}

impl Default for FleetComposition {
    fn default() -> Self {
        Self {
            dummy_vehicles: 100,
            learned_vehicles: 0,
            profile: VehicleProfile::default(),
        }
    }
}

/// Vehicles populated so far, per agent type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Resource)]
pub struct FleetCounts {
    pub dummy: usize,
    pub learned: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandConfig {
    pub requests_per_hour: f64,
    /// Patience of a waiting customer, in seconds.
    pub max_wait_secs: f64,
    /// Speed used to estimate trip times, metres per second.
    pub avg_speed_mps: f64,
    pub min_trip_distance_m: f64,
    pub bounds: Bounds,
    pub seed: u64,
    pub first_customer_id: u64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            requests_per_hour: 600.0,
            max_wait_secs: (10 * ONE_MIN_SECS) as f64,
            avg_speed_mps: 8.0,
            min_trip_distance_m: 500.0,
            bounds: Bounds::default(),
            seed: 0,
            first_customer_id: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceConfig {
    /// Price a customer accepts for a zero-length trip.
    pub base_willingness: f64,
    pub willingness_per_km: f64,
    /// Longest pickup ETA a customer accepts, in seconds.
    pub max_pickup_wait_secs: f64,
    /// Probability of accepting an offer that passes both limits.
    pub accept_probability: f64,
    pub seed: u64,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            base_willingness: 6.0,
            willingness_per_km: 2.5,
            max_pickup_wait_secs: (15 * ONE_MIN_SECS) as f64,
            accept_probability: 0.9,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FareConfig {
    /// Fraction taken off each fare on a shared ride.
    pub pool_discount: f64,
}

impl Default for FareConfig {
    fn default() -> Self {
        Self { pool_discount: 0.25 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// H3 resolution of the routing grid and route cache keys (0-15).
    pub resolution: u8,
    pub cruise_speed_mps: f64,
    pub cache_capacity: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            resolution: 9,
            cruise_speed_mps: 8.0,
            cache_capacity: 10_000,
        }
    }
}

/// Thresholds of the nearest-vehicle policy run between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct PolicyConfig {
    /// Requests farther than this from every free vehicle wait for the next round.
    pub max_pickup_distance_m: f64,
    /// Idle vehicles move towards the busiest pickup cell after this long.
    pub reposition_after_idle_secs: f64,
    /// Idle vehicles go off duty after this long.
    pub rest_after_idle_secs: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_pickup_distance_m: 5_000.0,
            reposition_after_idle_secs: (20 * ONE_MIN_SECS) as f64,
            rest_after_idle_secs: (2 * ONE_HOUR_SECS) as f64,
        }
    }
}

/// Shared RNG for population and dispatch sampling.
#[derive(Debug, Clone, Resource)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

/// Parameters for building a simulation scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub seed: u64,
    /// Simulation start, in seconds.
    pub start_time: u64,
    pub timestep_secs: u64,
    /// Vehicles populated at build time. Agent types follow `fleet` quotas.
    pub num_vehicles: usize,
    pub flags: SimulationFlags,
    pub market: MarketConfig,
    pub fleet: FleetComposition,
    pub demand: DemandConfig,
    pub acceptance: AcceptanceConfig,
    pub fare: FareConfig,
    pub routing: RoutingConfig,
    pub policy: PolicyConfig,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            seed: 0,
            start_time: 0,
            timestep_secs: ONE_MIN_SECS,
            num_vehicles: 100,
            flags: SimulationFlags::default(),
            market: MarketConfig::default(),
            fleet: FleetComposition::default(),
            demand: DemandConfig::default(),
            acceptance: AcceptanceConfig::default(),
            fare: FareConfig::default(),
            routing: RoutingConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl ScenarioParams {
    /// Seeds every random source in the scenario from one value.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.demand.seed = seed;
        self.acceptance.seed = seed.wrapping_add(1);
        self
    }

    pub fn with_timestep_secs(mut self, timestep_secs: u64) -> Self {
        self.timestep_secs = timestep_secs.max(1);
        self
    }

    pub fn with_start_time(mut self, start_time: u64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_num_vehicles(mut self, num_vehicles: usize) -> Self {
        self.num_vehicles = num_vehicles;
        self
    }

    pub fn with_pooling(mut self, enabled: bool) -> Self {
        self.flags.enable_pooling = enabled;
        self
    }

    pub fn with_pricing(mut self, enabled: bool) -> Self {
        self.flags.enable_pricing = enabled;
        self
    }

    pub fn with_vehicle_log(mut self, enabled: bool) -> Self {
        self.flags.log_vehicle = enabled;
        self
    }

    pub fn with_requests_per_hour(mut self, requests_per_hour: f64) -> Self {
        self.demand.requests_per_hour = requests_per_hour;
        self
    }

    /// Quota of vehicles per agent type used by population.
    pub fn with_fleet_mix(mut self, dummy: usize, learned: usize) -> Self {
        self.fleet.dummy_vehicles = dummy;
        self.fleet.learned_vehicles = learned;
        self
    }

    pub fn with_market(mut self, market: MarketConfig) -> Self {
        self.market = market;
        self
    }

    pub fn with_vehicle_profile(mut self, profile: VehicleProfile) -> Self {
        self.fleet.profile = profile;
        self
    }

    pub fn with_acceptance(mut self, acceptance: AcceptanceConfig) -> Self {
        self.acceptance = acceptance;
        self
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }
}
