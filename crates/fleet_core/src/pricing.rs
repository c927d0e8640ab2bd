//! Trip price computation.
//!
//! The engine only sees the [`PricingModel`] trait; [`CostPlusPricing`] is the
//! default model.

use bevy_ecs::prelude::Resource;

use crate::vehicle::VehicleProfile;

/// Everything a price may depend on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceInputs {
    /// Pickup plus trip distance, in metres.
    pub distance_m: f64,
    /// Pickup travel time of the proposal, in seconds.
    pub duration_secs: f64,
    pub mileage: f64,
    pub price_per_travel_m: f64,
    pub price_per_wait_min: f64,
    pub gas_price: f64,
    pub base_fare: f64,
}

impl PriceInputs {
    pub fn for_vehicle(profile: &VehicleProfile, distance_m: f64, duration_secs: f64) -> Self {
        Self {
            distance_m,
            duration_secs,
            mileage: profile.mileage,
            price_per_travel_m: profile.price_per_travel_m,
            price_per_wait_min: profile.price_per_wait_min,
            gas_price: profile.gas_price,
            base_fare: profile.base_fare,
        }
    }
}

/// A pricing function. Implementations must return a non-negative price that does
/// not decrease when distance or duration grows.
pub trait PricingModel: Send + Sync {
    fn quote(&self, inputs: &PriceInputs) -> f64;
}

#[derive(Resource)]
pub struct PricingModelResource(pub Box<dyn PricingModel>);

/// `base + distance * rate + minutes * wait rate + fuel for the distance`, with
/// each term clamped at zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostPlusPricing;

impl CostPlusPricing {
    pub fn fuel_cost(distance_m: f64, mileage: f64, gas_price: f64) -> f64 {
        if mileage <= 0.0 {
            return 0.0;
        }
        (distance_m.max(0.0) / 1000.0) / mileage * gas_price.max(0.0)
    }
}

impl PricingModel for CostPlusPricing {
    fn quote(&self, inputs: &PriceInputs) -> f64 {
        let distance = inputs.distance_m.max(0.0);
        let minutes = inputs.duration_secs.max(0.0) / 60.0;
        inputs.base_fare.max(0.0)
            + (distance * inputs.price_per_travel_m).max(0.0)
            + (minutes * inputs.price_per_wait_min).max(0.0)
            + Self::fuel_cost(distance, inputs.mileage, inputs.gas_price)
    }
}
