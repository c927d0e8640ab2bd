//! Customer-side decisions: whether to accept a quoted ride, and what to pay at dropoff.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::customer::Customer;
use crate::scenario::{AcceptanceConfig, FareConfig};
use crate::spatial::great_circle_distance;
use crate::vehicle::Vehicle;

/// Decides whether a customer takes a ride offered at `price` with a pickup in
/// `triptime` seconds.
pub trait RideAcceptance: Send + Sync {
    fn accept_or_reject(&self, customer: &Customer, price: f64, vehicle: &Vehicle, triptime: f64) -> bool;
}

/// Computes what a customer pays at dropoff given how many seats were occupied.
pub trait FareModel: Send + Sync {
    fn pay(&self, customer: &Customer, occupancy: u32, base_fare: f64) -> f64;
}

#[derive(Resource)]
pub struct AcceptanceResource(pub Box<dyn RideAcceptance>);

#[derive(Resource)]
pub struct FareResource(pub Box<dyn FareModel>);

/// Rejects prices above a distance-scaled ceiling and pickups that take too long;
/// otherwise accepts with a fixed probability.
///
/// Draws are seeded from the customer id and rejection count, so repeated offers
/// to the same customer are independent but reproducible.
#[derive(Debug, Clone)]
pub struct WillingnessToPay {
    config: AcceptanceConfig,
}

impl WillingnessToPay {
    pub fn new(config: AcceptanceConfig) -> Self {
        Self { config }
    }

    pub fn price_ceiling(&self, customer: &Customer) -> f64 {
        let trip_km = great_circle_distance(customer.origin(), customer.destination()) / 1000.0;
        self.config.base_willingness + self.config.willingness_per_km * trip_km
    }
}

impl RideAcceptance for WillingnessToPay {
    fn accept_or_reject(&self, customer: &Customer, price: f64, _vehicle: &Vehicle, triptime: f64) -> bool {
        if price > self.price_ceiling(customer) || triptime > self.config.max_pickup_wait_secs {
            return false;
        }
        let seed = self
            .config
            .seed
            .wrapping_add(customer.id().0.wrapping_mul(31))
            .wrapping_add(u64::from(customer.rejections()));
        let mut rng = StdRng::seed_from_u64(seed);
        rng.gen_bool(self.config.accept_probability.clamp(0.0, 1.0))
    }
}

/// Pays the accepted price (never less than the base fare), discounted when the
/// ride was shared.
#[derive(Debug, Clone)]
pub struct PooledFare {
    pool_discount: f64,
}

impl PooledFare {
    pub fn new(config: FareConfig) -> Self {
        Self {
            pool_discount: config.pool_discount.clamp(0.0, 1.0),
        }
    }
}

impl FareModel for PooledFare {
    fn pay(&self, customer: &Customer, occupancy: u32, base_fare: f64) -> f64 {
        let fare = customer.accepted_price().unwrap_or(0.0).max(base_fare);
        let fare = if occupancy > 1 {
            fare * (1.0 - self.pool_discount)
        } else {
            fare
        };
        fare.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::CustomerRequest;
    use crate::ids::{CustomerId, VehicleId};
    use crate::spatial::LatLon;
    use crate::vehicle::{AgentType, VehicleProfile};

    fn customer() -> Customer {
        Customer::new(CustomerRequest {
            id: CustomerId(7),
            origin: LatLon::new(40.75, -73.99),
            destination: LatLon::new(40.78, -73.96),
            requested_at: 0,
            trip_time: 900.0,
            max_wait: 600.0,
        })
    }

    fn vehicle() -> Vehicle {
        Vehicle::new(VehicleId(1), LatLon::new(40.75, -73.99), AgentType::Dummy, VehicleProfile::default())
    }

    #[test]
    fn rejects_price_over_ceiling() {
        let model = WillingnessToPay::new(AcceptanceConfig {
            accept_probability: 1.0,
            ..AcceptanceConfig::default()
        });
        let c = customer();
        let ceiling = model.price_ceiling(&c);
        assert!(model.accept_or_reject(&c, ceiling - 0.01, &vehicle(), 60.0));
        assert!(!model.accept_or_reject(&c, ceiling + 0.01, &vehicle(), 60.0));
    }

    #[test]
    fn rejects_slow_pickup() {
        let config = AcceptanceConfig {
            accept_probability: 1.0,
            ..AcceptanceConfig::default()
        };
        let limit = config.max_pickup_wait_secs;
        let model = WillingnessToPay::new(config);
        assert!(!model.accept_or_reject(&customer(), 0.0, &vehicle(), limit + 1.0));
    }

    #[test]
    fn zero_probability_never_accepts() {
        let model = WillingnessToPay::new(AcceptanceConfig {
            accept_probability: 0.0,
            ..AcceptanceConfig::default()
        });
        assert!(!model.accept_or_reject(&customer(), 0.0, &vehicle(), 0.0));
    }

    #[test]
    fn pooled_fare_applies_discount_and_floor() {
        let fare = PooledFare::new(FareConfig { pool_discount: 0.25 });
        let mut c = customer();
        c.wait_for_vehicle(60.0, 20.0).expect("match");
        assert_eq!(fare.pay(&c, 1, 2.5), 20.0);
        assert_eq!(fare.pay(&c, 2, 2.5), 15.0);
        assert_eq!(fare.pay(&c, 1, 30.0), 30.0);
    }

    #[test]
    fn unpriced_customer_pays_base_fare() {
        let fare = PooledFare::new(FareConfig::default());
        assert_eq!(fare.pay(&customer(), 1, 4.0), 4.0);
    }
}
