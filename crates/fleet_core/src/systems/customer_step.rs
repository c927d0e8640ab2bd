//! Advances customer timers and removes customers that have left the system.

use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::SimulationClock;
use crate::store::CustomerStore;
use crate::telemetry::SimTelemetry;

pub fn customer_step_system(
    clock: Res<SimulationClock>,
    mut customers: ResMut<CustomerStore>,
    mut telemetry: ResMut<SimTelemetry>,
) {
    let dt = clock.timestep_secs();
    let mut finished = Vec::new();
    for customer in customers.iter_mut() {
        customer.step(dt);
        if customer.is_arrived() {
            telemetry.customers_arrived += 1;
            finished.push(customer.id());
        } else if customer.is_disappeared() {
            telemetry.customers_disappeared += 1;
            finished.push(customer.id());
        }
    }
    for id in finished {
        customers.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use bevy_ecs::prelude::{Schedule, World};

    use super::*;
    use crate::customer::{Customer, CustomerRequest, CustomerStatus};
    use crate::ids::CustomerId;
    use crate::spatial::LatLon;

    fn request(id: u64, max_wait: f64) -> CustomerRequest {
        CustomerRequest {
            id: CustomerId(id),
            origin: LatLon::new(40.75, -73.99),
            destination: LatLon::new(40.76, -73.98),
            requested_at: 0,
            trip_time: 300.0,
            max_wait,
        }
    }

    #[test]
    fn removes_disappeared_and_arrived_customers() {
        let mut world = World::new();
        world.insert_resource(SimulationClock::new(0, 60));
        world.insert_resource(SimTelemetry::default());
        let mut store = CustomerStore::default();
        store.insert_requests(vec![request(1, 30.0), request(2, 600.0)]);
        let mut arrived = Customer::new(request(3, 600.0));
        arrived.wait_for_vehicle(0.0, 5.0).expect("match");
        arrived.ride_on().expect("board");
        arrived.get_off().expect("alight");
        store.insert(arrived);
        world.insert_resource(store);

        let mut schedule = Schedule::default();
        schedule.add_systems(customer_step_system);
        schedule.run(&mut world);

        let store = world.resource::<CustomerStore>();
        assert_eq!(store.ids(), vec![CustomerId(2)]);
        assert_eq!(store.get(CustomerId(2)).map(|c| c.status()), Some(CustomerStatus::Waiting));
        let telemetry = world.resource::<SimTelemetry>();
        assert_eq!(telemetry.customers_disappeared, 1);
        assert_eq!(telemetry.customers_arrived, 1);
    }
}
