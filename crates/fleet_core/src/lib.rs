pub mod agents;
pub mod clock;
pub mod coordinator;
pub mod customer;
pub mod demand;
pub mod distributions;
pub mod error;
pub mod ids;
pub mod policy;
pub mod pricing;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod spatial;
pub mod store;
pub mod systems;
pub mod telemetry;
pub mod telemetry_export;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;
pub mod vehicle;
