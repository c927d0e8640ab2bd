//! Vehicle record and its behavior state machine.
//!
//! A vehicle is in exactly one [`Behavior`]; the numeric [`VehicleStatus`] code is
//! derived from it and never stored on its own.
//!
//! | From | Trigger | To |
//! |---|---|---|
//! | Idle/Cruising | [`Vehicle::cruise`] | Cruising |
//! | Idle/Cruising | [`Vehicle::head_for_customer`], pooling off | Assigned |
//! | Idle/Cruising | [`Vehicle::commit_assignment`], pooling on | Assigned |
//! | Idle/Cruising | [`Vehicle::take_rest`] | OffDuty |
//! | Cruising/OffDuty | timer reaches 0 | Idle |
//! | Assigned | timer reaches 0 | Occupied (pickup) |
//! | Occupied | timer reaches 0 | Idle (dropoff, fares settled) |

pub mod movement;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::customer::choice::FareModel;
use crate::error::InvariantViolation;
use crate::ids::{CustomerId, VehicleId};
use crate::scenario::MarketConfig;
use crate::spatial::{great_circle_distance, path_length, LatLon};
use crate::store::CustomerStore;

use movement::advance_along_route;

/// Which pricing strategy negotiates on the vehicle's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentType {
    Dummy,
    Learned,
}

/// Cost and capacity parameters of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleProfile {
    pub max_capacity: u32,
    /// Price per metre travelled.
    pub price_per_travel_m: f64,
    /// Price per minute of trip time.
    pub price_per_wait_min: f64,
    /// Fuel price per litre.
    pub gas_price: f64,
    /// Kilometres per litre.
    pub mileage: f64,
    /// Fixed per-trip amount.
    pub base_fare: f64,
}

impl Default for VehicleProfile {
    fn default() -> Self {
        Self {
            max_capacity: 4,
            price_per_travel_m: 0.001,
            price_per_wait_min: 0.25,
            gas_price: 1.5,
            mileage: 12.0,
            base_fare: 2.5,
        }
    }
}

/// Numeric status code; also the index of the per-state duration totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum VehicleStatus {
    Idle = 0,
    Cruising = 1,
    Occupied = 2,
    Assigned = 3,
    OffDuty = 4,
}

impl VehicleStatus {
    pub const COUNT: usize = 5;

    pub fn code(self) -> u8 {
        self as u8
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    Idle,
    Cruising,
    /// Heading to the pickup point of the queued customers.
    Assigned,
    /// Carrying passengers, in boarding order.
    Occupied { onboard: VecDeque<CustomerId> },
    OffDuty,
}

impl Behavior {
    pub fn status(&self) -> VehicleStatus {
        match self {
            Behavior::Idle => VehicleStatus::Idle,
            Behavior::Cruising => VehicleStatus::Cruising,
            Behavior::Assigned => VehicleStatus::Assigned,
            Behavior::Occupied { .. } => VehicleStatus::Occupied,
            Behavior::OffDuty => VehicleStatus::OffDuty,
        }
    }

    /// Only idle and cruising vehicles accept commands.
    pub fn available(&self) -> bool {
        matches!(self, Behavior::Idle | Behavior::Cruising)
    }
}

/// State changes worth a line in the vehicle event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleEvent {
    Cruise,
    HeadForCustomer,
    Assigned,
    TakeRest,
    Pickup,
    Dropoff,
    Park,
}

impl VehicleEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleEvent::Cruise => "cruise",
            VehicleEvent::HeadForCustomer => "head_for_customer",
            VehicleEvent::Assigned => "assigned",
            VehicleEvent::TakeRest => "take_rest",
            VehicleEvent::Pickup => "pickup",
            VehicleEvent::Dropoff => "dropoff",
            VehicleEvent::Park => "park",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    id: VehicleId,
    agent_type: AgentType,
    profile: VehicleProfile,
    location: LatLon,
    destination: LatLon,
    /// Seconds until `destination` is reached.
    time_to_destination: f64,
    /// Metres per second along `route`.
    speed: f64,
    behavior: Behavior,
    current_capacity: u32,
    assigned_customer: Option<CustomerId>,
    /// Matched customers not yet on board, in assignment order.
    queued_customers: Vec<CustomerId>,
    route: Vec<LatLon>,
    travel_distance: f64,
    earnings: f64,
    working_time: f64,
    idle_duration: f64,
    pickup_time: f64,
    state_durations: [f64; VehicleStatus::COUNT],
}

impl Vehicle {
    pub fn new(id: VehicleId, location: LatLon, agent_type: AgentType, profile: VehicleProfile) -> Self {
        Self {
            id,
            agent_type,
            profile,
            location,
            destination: location,
            time_to_destination: 0.0,
            speed: 0.0,
            behavior: Behavior::Idle,
            current_capacity: 0,
            assigned_customer: None,
            queued_customers: Vec::new(),
            route: Vec::new(),
            travel_distance: 0.0,
            earnings: 0.0,
            working_time: 0.0,
            idle_duration: 0.0,
            pickup_time: 0.0,
            state_durations: [0.0; VehicleStatus::COUNT],
        }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    pub fn profile(&self) -> &VehicleProfile {
        &self.profile
    }

    pub fn location(&self) -> LatLon {
        self.location
    }

    pub fn destination(&self) -> LatLon {
        self.destination
    }

    pub fn time_to_destination(&self) -> f64 {
        self.time_to_destination
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn status(&self) -> VehicleStatus {
        self.behavior.status()
    }

    pub fn available(&self) -> bool {
        self.behavior.available()
    }

    pub fn current_capacity(&self) -> u32 {
        self.current_capacity
    }

    pub fn max_capacity(&self) -> u32 {
        self.profile.max_capacity
    }

    pub fn has_free_seat(&self) -> bool {
        self.current_capacity < self.profile.max_capacity
    }

    pub fn assigned_customer(&self) -> Option<CustomerId> {
        self.assigned_customer
    }

    pub fn queued_customers(&self) -> &[CustomerId] {
        &self.queued_customers
    }

    /// Customers on board, in boarding order. Empty unless Occupied.
    pub fn onboard_customers(&self) -> Vec<CustomerId> {
        match &self.behavior {
            Behavior::Occupied { onboard } => onboard.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    pub fn route(&self) -> &[LatLon] {
        &self.route
    }

    pub fn travel_distance(&self) -> f64 {
        self.travel_distance
    }

    pub fn earnings(&self) -> f64 {
        self.earnings
    }

    pub fn working_time(&self) -> f64 {
        self.working_time
    }

    pub fn idle_duration(&self) -> f64 {
        self.idle_duration
    }

    /// Trip time of the most recent pickup.
    pub fn pickup_time(&self) -> f64 {
        self.pickup_time
    }

    pub fn state_durations(&self) -> &[f64; VehicleStatus::COUNT] {
        &self.state_durations
    }

    pub fn state_duration(&self, status: VehicleStatus) -> f64 {
        self.state_durations[status.index()]
    }

    /// `[working_time, earnings, durations by status code...]`.
    pub fn score(&self) -> [f64; 2 + VehicleStatus::COUNT] {
        let mut score = [0.0; 2 + VehicleStatus::COUNT];
        score[0] = self.working_time;
        score[1] = self.earnings;
        score[2..].copy_from_slice(&self.state_durations);
        score
    }

    pub fn fuel_cost(&self) -> f64 {
        if self.profile.mileage <= 0.0 {
            return 0.0;
        }
        self.travel_distance / (self.profile.mileage * 1000.0) * self.profile.gas_price
    }

    pub fn profit(&self) -> f64 {
        self.earnings - self.fuel_cost()
    }

    /// Working time not spent assigned or occupied.
    pub fn busy_adjusted_idle_time(&self) -> f64 {
        self.working_time
            - self.state_duration(VehicleStatus::Occupied)
            - self.state_duration(VehicleStatus::Assigned)
    }

    /// Whether the vehicle leaves the market for good. Never true while unavailable.
    pub fn exit_market(&self, market: &MarketConfig) -> bool {
        if !self.available() {
            return false;
        }
        if self.idle_duration == 0.0 {
            self.working_time > market.min_working_time
        } else {
            self.working_time > market.max_working_time
        }
    }

    /// Advances the vehicle by `dt` seconds and fires any arrival transition.
    pub fn step(
        &mut self,
        dt: f64,
        customers: &mut CustomerStore,
        fares: &dyn FareModel,
    ) -> Result<Option<VehicleEvent>, InvariantViolation> {
        self.working_time += dt;
        if self.status() == VehicleStatus::Idle {
            self.state_durations[VehicleStatus::Idle.index()] += dt;
        }
        if self.available() {
            self.idle_duration += dt;
        } else {
            self.idle_duration = 0.0;
        }

        match self.behavior {
            Behavior::Idle => Ok(None),
            Behavior::Cruising => {
                if self.advance_timer(dt) {
                    Ok(Some(self.park()))
                } else {
                    self.drive(dt);
                    Ok(None)
                }
            }
            Behavior::OffDuty => Ok(self.advance_timer(dt).then(|| self.park())),
            Behavior::Assigned => {
                if self.advance_timer(dt) {
                    self.pickup(customers).map(Some)
                } else {
                    Ok(None)
                }
            }
            Behavior::Occupied { .. } => {
                if self.advance_timer(dt) {
                    self.dropoff(customers, fares).map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Follows `route` for `triptime` seconds.
    pub fn cruise(&mut self, route: Vec<LatLon>, triptime: f64) -> Result<VehicleEvent, InvariantViolation> {
        self.ensure_available()?;
        let Some(&last) = route.last() else {
            return Err(InvariantViolation::DegenerateRoute { vehicle: self.id });
        };
        if triptime <= 0.0 {
            return Err(InvariantViolation::DegenerateRoute { vehicle: self.id });
        }
        let length = path_length(&route);
        self.speed = length / triptime;
        self.travel_distance += length;
        self.route = route;
        self.set_destination(last, triptime);
        self.behavior = Behavior::Cruising;
        Ok(VehicleEvent::Cruise)
    }

    /// Queues `customer` and heads for its `origin`.
    ///
    /// With pooling the vehicle keeps its behavior until
    /// [`commit_assignment`](Self::commit_assignment), so that several customers can
    /// be queued within one matching round.
    pub fn head_for_customer(
        &mut self,
        origin: LatLon,
        triptime: f64,
        customer: CustomerId,
        distance: f64,
        pooling: bool,
    ) -> Result<VehicleEvent, InvariantViolation> {
        self.ensure_can_take_customer()?;
        self.travel_distance += distance;
        self.route.clear();
        self.set_destination(origin, triptime);
        self.assigned_customer = Some(customer);
        self.queued_customers.push(customer);
        self.current_capacity += 1;
        if !pooling {
            self.behavior = Behavior::Assigned;
        }
        Ok(VehicleEvent::HeadForCustomer)
    }

    /// Moves a vehicle with queued customers to Assigned.
    ///
    /// Returns `false` when the vehicle is already Assigned, so committing the same
    /// vehicle twice is harmless.
    pub fn commit_assignment(&mut self) -> Result<bool, InvariantViolation> {
        if self.behavior == Behavior::Assigned {
            return Ok(false);
        }
        self.ensure_available()?;
        if self.queued_customers.is_empty() {
            return Err(InvariantViolation::NothingToCommit { vehicle: self.id });
        }
        self.behavior = Behavior::Assigned;
        Ok(true)
    }

    /// Goes off duty in place for `duration` seconds.
    pub fn take_rest(&mut self, duration: f64) -> Result<VehicleEvent, InvariantViolation> {
        self.ensure_available()?;
        self.route.clear();
        self.idle_duration = 0.0;
        self.set_destination(self.location, duration);
        self.behavior = Behavior::OffDuty;
        Ok(VehicleEvent::TakeRest)
    }

    /// Fails unless `head_for_customer` would accept another customer.
    pub fn ensure_can_take_customer(&self) -> Result<(), InvariantViolation> {
        self.ensure_available()?;
        if !self.has_free_seat() {
            return Err(InvariantViolation::CapacityExceeded {
                vehicle: self.id,
                max_capacity: self.profile.max_capacity,
            });
        }
        Ok(())
    }

    fn ensure_available(&self) -> Result<(), InvariantViolation> {
        if self.available() {
            Ok(())
        } else {
            Err(InvariantViolation::VehicleUnavailable {
                vehicle: self.id,
                status: self.status(),
            })
        }
    }

    fn set_destination(&mut self, destination: LatLon, triptime: f64) {
        self.destination = destination;
        self.time_to_destination = triptime;
    }

    /// Runs the destination timer; returns true on arrival.
    fn advance_timer(&mut self, dt: f64) -> bool {
        let step = dt.min(self.time_to_destination);
        self.state_durations[self.status().index()] += step;
        self.time_to_destination -= step;
        if self.time_to_destination <= 0.0 {
            self.time_to_destination = 0.0;
            self.location = self.destination;
            true
        } else {
            false
        }
    }

    fn drive(&mut self, dt: f64) {
        let (location, remaining) = advance_along_route(self.location, &self.route, self.speed * dt);
        self.location = location;
        self.route = remaining;
    }

    fn park(&mut self) -> VehicleEvent {
        self.route.clear();
        self.behavior = Behavior::Idle;
        VehicleEvent::Park
    }

    /// Boards every queued customer. All of them are picked up at the origin of the
    /// last one queued.
    fn pickup(&mut self, customers: &mut CustomerStore) -> Result<VehicleEvent, InvariantViolation> {
        let last = *self
            .queued_customers
            .last()
            .ok_or(InvariantViolation::NothingToPickUp { vehicle: self.id })?;
        let rider = customers
            .get(last)
            .ok_or(InvariantViolation::MissingCustomer {
                vehicle: self.id,
                customer: last,
            })?;
        if self.location != rider.origin() {
            return Err(InvariantViolation::PickupLocationMismatch {
                vehicle: self.id,
                customer: last,
                location: self.location,
                origin: rider.origin(),
            });
        }
        let (destination, trip_time) = (rider.destination(), rider.trip_time());

        for &id in &self.queued_customers {
            customers
                .get_mut(id)
                .ok_or(InvariantViolation::MissingCustomer {
                    vehicle: self.id,
                    customer: id,
                })?
                .ride_on()?;
        }

        let onboard: VecDeque<CustomerId> = self.queued_customers.drain(..).collect();
        self.route.clear();
        self.assigned_customer = Some(last);
        self.set_destination(destination, trip_time);
        self.pickup_time = trip_time;
        self.behavior = Behavior::Occupied { onboard };
        Ok(VehicleEvent::Pickup)
    }

    /// Settles fares in boarding order and frees every seat.
    fn dropoff(&mut self, customers: &mut CustomerStore, fares: &dyn FareModel) -> Result<VehicleEvent, InvariantViolation> {
        let onboard = self.onboard_customers();
        let (Some(&first), Some(&last)) = (onboard.first(), onboard.last()) else {
            return Err(InvariantViolation::NothingToDropOff { vehicle: self.id });
        };
        let vehicle = self.id;
        let missing = |customer| InvariantViolation::MissingCustomer { vehicle, customer };
        let origin = customers.get(first).ok_or_else(|| missing(first))?.origin();
        let destination = customers.get(last).ok_or_else(|| missing(last))?.destination();
        if self.location != destination {
            return Err(InvariantViolation::DropoffLocationMismatch {
                vehicle: self.id,
                customer: last,
                location: self.location,
                destination,
            });
        }
        self.travel_distance += great_circle_distance(origin, destination);

        for id in onboard {
            let customer = customers.get_mut(id).ok_or_else(|| missing(id))?;
            let fare = fares.pay(customer, self.current_capacity, self.profile.base_fare);
            customer.get_off()?;
            self.earnings += fare;
        }

        self.current_capacity = 0;
        self.queued_customers.clear();
        self.route.clear();
        self.behavior = Behavior::Idle;
        Ok(VehicleEvent::Dropoff)
    }
}
