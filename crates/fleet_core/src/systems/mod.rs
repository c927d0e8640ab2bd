//! Per-tick systems, run in this order by [`crate::runner::tick_schedule`]:
//! customers, vehicles, demand, clock.

pub mod clock;
pub mod customer_step;
pub mod demand;
pub mod vehicle_step;

pub use clock::advance_clock_system;
pub use customer_step::customer_step_system;
pub use demand::demand_system;
pub use vehicle_step::vehicle_step_system;
