//! Inter-arrival time distributions for demand generation.

use rand::rngs::StdRng;
use rand::Rng;

/// Samples the gap to the next arrival, in seconds.
pub trait InterArrivalDistribution: Send + Sync + std::fmt::Debug {
    /// `now` is the current simulation time, for time-varying rates.
    fn sample_secs(&self, rng: &mut StdRng, now: u64) -> f64;
}

/// Constant gap between arrivals.
#[derive(Debug, Clone)]
pub struct UniformInterArrival {
    pub interval_secs: f64,
}

impl UniformInterArrival {
    /// Create from rate (arrivals per hour).
    pub fn from_hourly_rate(per_hour: f64) -> Self {
        if per_hour <= 0.0 {
            return Self {
                interval_secs: f64::INFINITY,
            };
        }
        Self {
            interval_secs: 3600.0 / per_hour,
        }
    }
}

impl InterArrivalDistribution for UniformInterArrival {
    fn sample_secs(&self, _rng: &mut StdRng, _now: u64) -> f64 {
        self.interval_secs
    }
}

/// Poisson process: exponentially distributed gaps.
#[derive(Debug, Clone)]
pub struct ExponentialInterArrival {
    /// Expected arrivals per second.
    pub rate_per_sec: f64,
}

impl ExponentialInterArrival {
    pub fn from_hourly_rate(per_hour: f64) -> Self {
        Self {
            rate_per_sec: per_hour.max(0.0) / 3600.0,
        }
    }
}

impl InterArrivalDistribution for ExponentialInterArrival {
    fn sample_secs(&self, rng: &mut StdRng, _now: u64) -> f64 {
        if self.rate_per_sec <= 0.0 {
            return f64::INFINITY;
        }
        // -ln(U) / lambda
        let u: f64 = rng.gen();
        let u = u.max(1e-10);
        -u.ln() / self.rate_per_sec
    }
}
