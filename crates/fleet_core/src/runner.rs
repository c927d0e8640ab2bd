//! Simulation runner: the fixed per-tick schedule and the loops that drive it.
//!
//! A tick steps customers, steps vehicles, injects demand and advances the clock,
//! always in that order. The policy layer (matching and dispatch) runs between
//! ticks through the hook of [`run_ticks_with_hook`].

use bevy_ecs::prelude::{Res, Resource, Schedule, World};
use bevy_ecs::schedule::{ExecutorKind, IntoSystemConfigs};

use crate::error::{SimError, SimResult};
use crate::systems::{advance_clock_system, customer_step_system, demand_system, vehicle_step_system};

/// The fatal error that stopped the run, if any.
#[derive(Debug, Default, Resource)]
pub struct SimFault(Option<SimError>);

impl SimFault {
    pub fn raise(&mut self, error: SimError) {
        if self.0.is_none() {
            self.0 = Some(error);
        }
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn error(&self) -> Option<&SimError> {
        self.0.as_ref()
    }

    pub fn take(&mut self) -> Option<SimError> {
        self.0.take()
    }
}

/// Condition: no fatal error has been raised.
fn no_fault(fault: Res<SimFault>) -> bool {
    !fault.is_set()
}

/// Builds the tick schedule. Systems run one after another on the calling thread.
pub fn tick_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            customer_step_system.run_if(no_fault),
            vehicle_step_system.run_if(no_fault),
            demand_system.run_if(no_fault),
            advance_clock_system.run_if(no_fault),
        )
            .chain(),
    );
    schedule
}

/// Runs one tick. A fault raised during the tick is taken out of the world and
/// returned; the world is left as it was when the fault occurred.
pub fn run_tick(world: &mut World, schedule: &mut Schedule) -> SimResult<()> {
    if !world.contains_resource::<SimFault>() {
        world.insert_resource(SimFault::default());
    }
    schedule.run(world);
    match world.resource_mut::<SimFault>().take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Runs `ticks` ticks, stopping at the first fault.
pub fn run_ticks(world: &mut World, schedule: &mut Schedule, ticks: usize) -> SimResult<()> {
    for _ in 0..ticks {
        run_tick(world, schedule)?;
    }
    Ok(())
}

/// Runs `ticks` ticks and calls `hook` after each one. A hook error stops the run.
pub fn run_ticks_with_hook<F>(world: &mut World, schedule: &mut Schedule, ticks: usize, mut hook: F) -> SimResult<()>
where
    F: FnMut(&mut World) -> SimResult<()>,
{
    for _ in 0..ticks {
        run_tick(world, schedule)?;
        hook(world)?;
    }
    Ok(())
}
