//! Nearest-vehicle policy: the decision layer that feeds the coordinators
//! between ticks.
//!
//! Each round drains the request pool, proposes the nearest free vehicle for every
//! request, quotes and matches the proposals, then dispatches long-idle vehicles.

use std::collections::HashMap;

use bevy_ecs::prelude::World;
use h3o::{CellIndex, Resolution};
use tracing::debug;

use crate::coordinator::{
    dispatch_vehicles, match_vehicles, quote_proposals, require, DispatchAction, DispatchCommand,
    MatchProposal,
};
use crate::customer::{CustomerRequest, CustomerStatus};
use crate::error::SimResult;
use crate::ids::VehicleId;
use crate::routing::{RouteCacheKey, RoutingResource};
use crate::scenario::{PolicyConfig, ScenarioParams, SimulationFlags};
use crate::spatial::{great_circle_distance, Bounds, LatLon, DEFAULT_RESOLUTION};
use crate::store::{CustomerStore, VehicleStore};
use crate::vehicle::VehicleStatus;

/// Counts from one policy round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolicyReport {
    pub requests: usize,
    pub proposed: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub carried_over: usize,
    pub dispatched: usize,
    pub skipped: usize,
}

/// A free vehicle as seen by one matching round.
#[derive(Debug, Clone)]
struct Candidate {
    id: VehicleId,
    location: LatLon,
    free_seats: u32,
    /// Origin cell shared by every pickup queued on this vehicle, if any.
    pickup_cell: Option<CellIndex>,
    proposed: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct NearestVehiclePolicy {
    config: PolicyConfig,
    service_area: Bounds,
    resolution: Resolution,
}

impl NearestVehiclePolicy {
    pub fn new(config: PolicyConfig, service_area: Bounds) -> Self {
        Self {
            config,
            service_area,
            resolution: DEFAULT_RESOLUTION,
        }
    }

    /// Uses the scenario's policy thresholds, demand area and routing grid.
    pub fn from_params(params: &ScenarioParams) -> Self {
        Self {
            resolution: Resolution::try_from(params.routing.resolution).unwrap_or(DEFAULT_RESOLUTION),
            ..Self::new(params.policy, params.demand.bounds)
        }
    }

    /// Runs one matching round followed by one dispatch round.
    pub fn run(&self, world: &mut World) -> SimResult<PolicyReport> {
        let mut report = self.match_round(world)?;
        report.dispatched = self.dispatch_round(world)?;
        Ok(report)
    }

    fn match_round(&self, world: &mut World) -> SimResult<PolicyReport> {
        let pooling = require(world.get_resource::<SimulationFlags>(), "SimulationFlags")?.enable_pooling;
        let requests = require(world.get_resource_mut::<CustomerStore>(), "CustomerStore")?.take_request_pool();
        let mut report = PolicyReport {
            requests: requests.len(),
            ..PolicyReport::default()
        };
        if requests.is_empty() {
            return Ok(report);
        }

        let mut candidates = self.candidates(world)?;
        let mut pairs: Vec<(VehicleId, &CustomerRequest)> = Vec::new();
        let mut unproposed = Vec::new();
        for request in &requests {
            match self.nearest(&mut candidates, request, pooling) {
                Some(vehicle) => pairs.push((vehicle, request)),
                None => unproposed.push(request.id),
            }
        }

        {
            let mut customers = require(world.get_resource_mut::<CustomerStore>(), "CustomerStore")?;
            report.carried_over = unproposed.into_iter().filter(|&id| customers.carry_over(id)).count();
        }
        if pairs.is_empty() {
            return Ok(report);
        }

        let proposals = {
            let vehicles = require(world.get_resource::<VehicleStore>(), "VehicleStore")?;
            let routing = require(world.get_resource::<RoutingResource>(), "RoutingResource")?;
            let od_pairs: Vec<(LatLon, LatLon)> = pairs
                .iter()
                .map(|(id, request)| {
                    let from = vehicles.get(*id).map_or(request.origin, |v| v.location());
                    (from, request.origin)
                })
                .collect();
            let routes = routing.0.route(&od_pairs);
            pairs
                .iter()
                .zip(routes)
                .map(|((vehicle_id, request), route)| MatchProposal {
                    vehicle_id: *vehicle_id,
                    customer_id: request.id,
                    duration: route.triptime.max(0.0),
                    distance: route.length_m(),
                })
                .collect::<Vec<_>>()
        };
        report.proposed = proposals.len();

        let (commands, skipped) = quote_proposals(world, &proposals)?;
        let outcome = match_vehicles(world, &commands)?;
        report.accepted = outcome.accepted.len();
        report.rejected = outcome.rejected.len();
        report.skipped = skipped.len() + outcome.skipped.len();
        debug!(?report, "matching round");
        Ok(report)
    }

    fn candidates(&self, world: &World) -> SimResult<Vec<Candidate>> {
        let vehicles = require(world.get_resource::<VehicleStore>(), "VehicleStore")?;
        let customers = require(world.get_resource::<CustomerStore>(), "CustomerStore")?;
        Ok(vehicles
            .iter()
            .filter(|v| v.available() && v.has_free_seat())
            .map(|v| Candidate {
                id: v.id(),
                location: v.location(),
                free_seats: v.max_capacity().saturating_sub(v.current_capacity()),
                pickup_cell: v
                    .queued_customers()
                    .last()
                    .and_then(|id| customers.get(*id))
                    .and_then(|c| c.origin().to_cell(self.resolution)),
                proposed: false,
            })
            .collect())
    }

    /// Picks the closest eligible candidate within the pickup radius and reserves a
    /// seat on it. Without pooling a vehicle takes at most one request per round.
    fn nearest(&self, candidates: &mut [Candidate], request: &CustomerRequest, pooling: bool) -> Option<VehicleId> {
        let origin_cell = request.origin.to_cell(self.resolution);
        let (index, _) = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.free_seats > 0)
            .filter(|(_, c)| {
                if pooling {
                    c.pickup_cell.is_none() || c.pickup_cell == origin_cell
                } else {
                    !c.proposed
                }
            })
            .map(|(i, c)| (i, great_circle_distance(c.location, request.origin)))
            .filter(|&(_, d)| d <= self.config.max_pickup_distance_m)
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        let candidate = &mut candidates[index];
        candidate.free_seats -= 1;
        candidate.proposed = true;
        candidate.pickup_cell = origin_cell;
        Some(candidate.id)
    }

    /// Sends vehicles idle past the rest threshold off duty and moves vehicles idle
    /// past the reposition threshold towards the cell with the most waiting
    /// customers. Idle vehicles outside the demand area head back to its centre.
    fn dispatch_round(&self, world: &mut World) -> SimResult<usize> {
        let bounds = self.service_area;
        let commands = {
            let vehicles = require(world.get_resource::<VehicleStore>(), "VehicleStore")?;
            let customers = require(world.get_resource::<CustomerStore>(), "CustomerStore")?;
            let hotspot = self.hotspot(&customers);
            vehicles
                .iter()
                .filter(|v| v.status() == VehicleStatus::Idle)
                .filter(|v| v.idle_duration() >= self.config.reposition_after_idle_secs)
                .filter_map(|v| {
                    let action = if v.idle_duration() >= self.config.rest_after_idle_secs {
                        DispatchAction::OffDuty
                    } else if !bounds.contains(v.location()) {
                        DispatchAction::Destination(bounds.center())
                    } else {
                        let location = v.location().to_cell(self.resolution)?;
                        let anchor = hotspot.filter(|&cell| cell != location)?;
                        DispatchAction::CachedRoute(RouteCacheKey { location, anchor })
                    };
                    Some(DispatchCommand {
                        vehicle_id: v.id(),
                        action,
                    })
                })
                .collect::<Vec<_>>()
        };
        if commands.is_empty() {
            return Ok(0);
        }
        let outcome = dispatch_vehicles(world, &commands)?;
        Ok(outcome.dispatched.len())
    }

    fn hotspot(&self, customers: &CustomerStore) -> Option<CellIndex> {
        let mut counts: HashMap<CellIndex, usize> = HashMap::new();
        for customer in customers.iter().filter(|c| c.status() == CustomerStatus::Waiting) {
            if let Some(cell) = customer.origin().to_cell(self.resolution) {
                *counts.entry(cell).or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(cell, _)| cell)
    }
}
