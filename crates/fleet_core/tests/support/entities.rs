#![allow(dead_code)]

use bevy_ecs::prelude::World;
use fleet_core::customer::{Customer, CustomerRequest, CustomerStatus};
use fleet_core::ids::{CustomerId, VehicleId};
use fleet_core::spatial::LatLon;
use fleet_core::store::{CustomerStore, VehicleStore};
use fleet_core::test_helpers::{insert_request, insert_vehicle, test_request, TEST_PICKUP};
use fleet_core::vehicle::{AgentType, Vehicle, VehicleProfile};

/// Builder for vehicle fixtures.
#[derive(Clone, Debug)]
pub struct VehicleBuilder {
    id: u64,
    location: LatLon,
    agent_type: AgentType,
    profile: VehicleProfile,
}

impl VehicleBuilder {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            location: TEST_PICKUP,
            agent_type: AgentType::Dummy,
            profile: VehicleProfile::default(),
        }
    }

    pub fn at(mut self, location: LatLon) -> Self {
        self.location = location;
        self
    }

    pub fn learned(mut self) -> Self {
        self.agent_type = AgentType::Learned;
        self
    }

    pub fn with_profile(mut self, profile: VehicleProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_capacity(mut self, max_capacity: u32) -> Self {
        self.profile.max_capacity = max_capacity;
        self
    }

    pub fn build(self) -> Vehicle {
        Vehicle::new(VehicleId(self.id), self.location, self.agent_type, self.profile)
    }

    pub fn spawn(self, world: &mut World) -> VehicleId {
        let id = VehicleId(self.id);
        insert_vehicle(world, self.build());
        id
    }
}

/// Inserts a Waiting customer travelling from `origin` to `destination`.
pub fn spawn_customer(world: &mut World, id: u64, origin: LatLon, destination: LatLon) -> CustomerId {
    let request = CustomerRequest {
        origin,
        destination,
        ..test_request(id, 0)
    };
    insert_request(world, request);
    CustomerId(id)
}

pub fn vehicle(world: &World, id: VehicleId) -> Vehicle {
    world
        .resource::<VehicleStore>()
        .get(id)
        .cloned()
        .expect("vehicle should be in the store")
}

pub fn customer(world: &World, id: CustomerId) -> Option<Customer> {
    world.resource::<CustomerStore>().get(id).cloned()
}

pub fn customer_status(world: &World, id: CustomerId) -> Option<CustomerStatus> {
    world.resource::<CustomerStore>().get(id).map(|c| c.status())
}
