#![allow(dead_code)]

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use fleet_core::error::SimResult;
use fleet_core::runner::{run_tick, run_ticks, tick_schedule};

/// Helper that owns a reusable `Schedule` so tests can step ticks one at a time.
pub struct TickRunner {
    schedule: Schedule,
}

impl Default for TickRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TickRunner {
    pub fn new() -> Self {
        Self {
            schedule: tick_schedule(),
        }
    }

    pub fn tick(&mut self, world: &mut World) -> SimResult<()> {
        run_tick(world, &mut self.schedule)
    }

    pub fn ticks(&mut self, world: &mut World, ticks: usize) -> SimResult<()> {
        run_ticks(world, &mut self.schedule, ticks)
    }
}
