//! Error taxonomy.
//!
//! Two kinds of failure never share a type:
//!
//! - [`ReferenceError`]: a command names a vehicle or customer that is not in the
//!   stores. The command is skipped, a warning is logged and the run continues.
//! - [`SimError`]: a broken precondition inside the engine (see
//!   [`InvariantViolation`]) or a fault while stepping a vehicle. The caller must
//!   stop the run.
//!
//! Sink and export failures have their own [`TelemetryError`].

use thiserror::Error;

use crate::customer::CustomerStatus;
use crate::ids::{CustomerId, VehicleId};
use crate::spatial::LatLon;
use crate::vehicle::{Vehicle, VehicleStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("invalid vehicle id {0}")]
    UnknownVehicle(VehicleId),

    #[error("invalid customer id {0}")]
    UnknownCustomer(CustomerId),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("vehicle {vehicle} cannot take a command while {status:?}")]
    VehicleUnavailable {
        vehicle: VehicleId,
        status: VehicleStatus,
    },

    #[error("vehicle {vehicle} is full ({max_capacity} seats)")]
    CapacityExceeded { vehicle: VehicleId, max_capacity: u32 },

    #[error("vehicle {vehicle} at {location} cannot pick up {customer} waiting at {origin}")]
    PickupLocationMismatch {
        vehicle: VehicleId,
        customer: CustomerId,
        location: LatLon,
        origin: LatLon,
    },

    #[error("vehicle {vehicle} at {location} cannot drop off {customer} bound for {destination}")]
    DropoffLocationMismatch {
        vehicle: VehicleId,
        customer: CustomerId,
        location: LatLon,
        destination: LatLon,
    },

    #[error("vehicle {vehicle} reached its pickup with no queued customers")]
    NothingToPickUp { vehicle: VehicleId },

    #[error("vehicle {vehicle} reached its dropoff with no customers on board")]
    NothingToDropOff { vehicle: VehicleId },

    #[error("vehicle {vehicle} has no accepted customer to commit")]
    NothingToCommit { vehicle: VehicleId },

    #[error("customer {customer} assigned to vehicle {vehicle} is no longer in the store")]
    MissingCustomer {
        vehicle: VehicleId,
        customer: CustomerId,
    },

    #[error("customer {customer} expected {expected:?} but was {actual:?}")]
    CustomerStatus {
        customer: CustomerId,
        expected: CustomerStatus,
        actual: CustomerStatus,
    },

    #[error("vehicle {vehicle} was given an empty route or non-positive trip time")]
    DegenerateRoute { vehicle: VehicleId },
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("vehicle {} failed while stepping: {source}", .snapshot.id())]
    VehicleStep {
        snapshot: Box<Vehicle>,
        #[source]
        source: InvariantViolation,
    },

    #[error("simulation world is missing resource {0}")]
    MissingResource(&'static str),
}

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("csv sink error: {0}")]
    Csv(#[from] csv::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
