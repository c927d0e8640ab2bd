//! Advances simulation time by one timestep and emits the hourly progress signal.

use bevy_ecs::prelude::ResMut;
use tracing::info;

use crate::clock::{SimulationClock, ONE_HOUR_SECS};
use crate::telemetry::SimTelemetry;

pub fn advance_clock_system(mut clock: ResMut<SimulationClock>, mut telemetry: ResMut<SimTelemetry>) {
    let now = clock.advance();
    if clock.is_hour_boundary() {
        info!(
            hour = now / ONE_HOUR_SECS,
            elapsed_secs = clock.elapsed(),
            arrived = telemetry.customers_arrived,
            disappeared = telemetry.customers_disappeared,
            "simulation progress"
        );
        telemetry.record_progress(now);
    }
}
