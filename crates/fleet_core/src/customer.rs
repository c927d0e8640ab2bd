//! Customer lifecycle: Waiting → Matched → Riding → Arrived, or Waiting → Disappeared.
//!
//! Customers only change status through the operations below. Matching is driven by
//! the coordinator, boarding and alighting by the vehicle that serves them, and the
//! patience timeout by [`Customer::step`].

pub mod choice;

use serde::{Deserialize, Serialize};

use crate::error::InvariantViolation;
use crate::ids::CustomerId;
use crate::spatial::LatLon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerStatus {
    Waiting,
    Matched,
    Riding,
    Arrived,
    Disappeared,
}

/// A ride request as produced by the demand generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRequest {
    pub id: CustomerId,
    pub origin: LatLon,
    pub destination: LatLon,
    /// Simulation time (seconds) the request was issued.
    pub requested_at: u64,
    /// Expected ride time from origin to destination, in seconds.
    pub trip_time: f64,
    /// Longest the customer waits for a match before leaving, in seconds.
    pub max_wait: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    request: CustomerRequest,
    status: CustomerStatus,
    accepted_price: Option<f64>,
    /// Seconds spent in the current Waiting or Riding phase.
    elapsed: f64,
    /// Pickup ETA promised when matched.
    pickup_eta: f64,
    fresh: bool,
    carry_over: bool,
    rejections: u32,
}

impl Customer {
    pub fn new(request: CustomerRequest) -> Self {
        Self {
            request,
            status: CustomerStatus::Waiting,
            accepted_price: None,
            elapsed: 0.0,
            pickup_eta: 0.0,
            fresh: true,
            carry_over: false,
            rejections: 0,
        }
    }

    pub fn id(&self) -> CustomerId {
        self.request.id
    }

    pub fn request(&self) -> &CustomerRequest {
        &self.request
    }

    pub fn origin(&self) -> LatLon {
        self.request.origin
    }

    pub fn destination(&self) -> LatLon {
        self.request.destination
    }

    pub fn trip_time(&self) -> f64 {
        self.request.trip_time
    }

    pub fn status(&self) -> CustomerStatus {
        self.status
    }

    pub fn accepted_price(&self) -> Option<f64> {
        self.accepted_price
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn pickup_eta(&self) -> f64 {
        self.pickup_eta
    }

    pub fn rejections(&self) -> u32 {
        self.rejections
    }

    pub fn is_arrived(&self) -> bool {
        self.status == CustomerStatus::Arrived
    }

    pub fn is_disappeared(&self) -> bool {
        self.status == CustomerStatus::Disappeared
    }

    /// Advances the Waiting/Riding timer; a Waiting customer past its patience leaves.
    pub fn step(&mut self, timestep: f64) {
        match self.status {
            CustomerStatus::Waiting => {
                self.elapsed += timestep;
                if self.elapsed > self.request.max_wait {
                    self.status = CustomerStatus::Disappeared;
                }
            }
            CustomerStatus::Riding => self.elapsed += timestep,
            CustomerStatus::Matched | CustomerStatus::Arrived | CustomerStatus::Disappeared => {}
        }
    }

    /// Waiting → Matched once a vehicle has accepted the ride at `price`.
    pub fn wait_for_vehicle(&mut self, pickup_eta: f64, price: f64) -> Result<(), InvariantViolation> {
        self.expect_status(CustomerStatus::Waiting)?;
        self.status = CustomerStatus::Matched;
        self.pickup_eta = pickup_eta;
        self.accepted_price = Some(price);
        self.fresh = false;
        self.carry_over = false;
        Ok(())
    }

    /// Matched → Riding when the vehicle reaches the origin.
    pub fn ride_on(&mut self) -> Result<(), InvariantViolation> {
        self.expect_status(CustomerStatus::Matched)?;
        self.status = CustomerStatus::Riding;
        self.elapsed = 0.0;
        Ok(())
    }

    /// Riding → Arrived when the vehicle reaches the destination.
    pub fn get_off(&mut self) -> Result<(), InvariantViolation> {
        self.expect_status(CustomerStatus::Riding)?;
        self.status = CustomerStatus::Arrived;
        Ok(())
    }

    pub(crate) fn in_request_pool(&self) -> bool {
        self.fresh || self.carry_over
    }

    pub(crate) fn leave_request_pool(&mut self) {
        self.fresh = false;
        self.carry_over = false;
    }

    /// Keeps the customer in the next tick's request pool after a rejected offer.
    pub fn reject_offer(&mut self) {
        self.rejections += 1;
        self.flag_carry_over();
    }

    pub(crate) fn flag_carry_over(&mut self) {
        self.carry_over = true;
    }

    fn expect_status(&self, expected: CustomerStatus) -> Result<(), InvariantViolation> {
        if self.status == expected {
            Ok(())
        } else {
            Err(InvariantViolation::CustomerStatus {
                customer: self.id(),
                expected,
                actual: self.status,
            })
        }
    }
}
