//! Fixed-step simulation clock.
//!
//! Time is measured in whole simulation seconds. The clock only moves when the
//! tick schedule advances it, after customers, vehicles and demand have been
//! processed for the current instant.

use bevy_ecs::prelude::Resource;

pub const ONE_MIN_SECS: u64 = 60;
pub const ONE_HOUR_SECS: u64 = 60 * ONE_MIN_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Resource)]
pub struct SimulationClock {
    start: u64,
    now: u64,
    timestep: u64,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(0, ONE_MIN_SECS)
    }
}

impl SimulationClock {
    pub fn new(start: u64, timestep: u64) -> Self {
        debug_assert!(timestep > 0, "timestep must be positive");
        Self {
            start,
            now: start,
            timestep,
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    /// Timestep as fractional seconds, the unit vehicle and customer timers use.
    pub fn timestep_secs(&self) -> f64 {
        self.timestep as f64
    }

    pub fn elapsed(&self) -> u64 {
        self.now - self.start
    }

    /// Moves time forward by one timestep and returns the new time.
    pub fn advance(&mut self) -> u64 {
        self.now += self.timestep;
        self.now
    }

    pub fn is_hour_boundary(&self) -> bool {
        self.now % ONE_HOUR_SECS == 0
    }
}
