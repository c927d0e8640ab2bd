//! Telemetry: vehicle event log, exit-market scores and run counters.
//!
//! Records are kept in [`SimTelemetry`] and, when a [`LogSink`] is attached,
//! forwarded to it one record at a time. A failing sink is logged and never stops
//! the simulation.

use std::fmt;
use std::fs::File;
use std::path::Path;

use bevy_ecs::prelude::Resource;
use serde::Serialize;
use tracing::warn;

use crate::error::TelemetryError;
use crate::vehicle::{Vehicle, VehicleEvent, VehicleStatus};

/// One vehicle state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleEventRecord {
    pub time: u64,
    pub vehicle_id: u64,
    pub event: &'static str,
    pub status: u8,
    pub lat: f64,
    pub lon: f64,
    pub destination_lat: f64,
    pub destination_lon: f64,
    pub time_to_destination: f64,
    pub current_capacity: u32,
    pub assigned_customer: Option<u64>,
    pub travel_distance: f64,
    pub earnings: f64,
}

impl VehicleEventRecord {
    pub fn capture(time: u64, vehicle: &Vehicle, event: VehicleEvent) -> Self {
        let location = vehicle.location();
        let destination = vehicle.destination();
        Self {
            time,
            vehicle_id: vehicle.id().0,
            event: event.as_str(),
            status: vehicle.status().code(),
            lat: location.lat,
            lon: location.lon,
            destination_lat: destination.lat,
            destination_lon: destination.lon,
            time_to_destination: vehicle.time_to_destination(),
            current_capacity: vehicle.current_capacity(),
            assigned_customer: vehicle.assigned_customer().map(|c| c.0),
            travel_distance: vehicle.travel_distance(),
            earnings: vehicle.earnings(),
        }
    }
}

/// Cumulative totals of a vehicle leaving the market. Durations are in status
/// code order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub time: u64,
    pub vehicle_id: u64,
    pub working_time: f64,
    pub earnings: f64,
    pub idle: f64,
    pub cruising: f64,
    pub occupied: f64,
    pub assigned: f64,
    pub off_duty: f64,
    pub profit: f64,
    pub busy_adjusted_idle_time: f64,
}

impl ScoreRecord {
    pub fn capture(time: u64, vehicle: &Vehicle) -> Self {
        let d = |status| vehicle.state_duration(status);
        Self {
            time,
            vehicle_id: vehicle.id().0,
            working_time: vehicle.working_time(),
            earnings: vehicle.earnings(),
            idle: d(VehicleStatus::Idle),
            cruising: d(VehicleStatus::Cruising),
            occupied: d(VehicleStatus::Occupied),
            assigned: d(VehicleStatus::Assigned),
            off_duty: d(VehicleStatus::OffDuty),
            profit: vehicle.profit(),
            busy_adjusted_idle_time: vehicle.busy_adjusted_idle_time(),
        }
    }
}

/// Append-only destination for telemetry lines.
pub trait LogSink: Send + Sync {
    fn log_vehicle_event(&mut self, record: &VehicleEventRecord) -> Result<(), TelemetryError>;
    fn log_score(&mut self, record: &ScoreRecord) -> Result<(), TelemetryError>;
}

/// Writes vehicle events and scores to two CSV files, flushing after each line.
pub struct CsvLogSink {
    vehicle_events: csv::Writer<File>,
    scores: csv::Writer<File>,
}

impl CsvLogSink {
    pub fn create<P: AsRef<Path>, Q: AsRef<Path>>(vehicle_events: P, scores: Q) -> Result<Self, TelemetryError> {
        Ok(Self {
            vehicle_events: csv::Writer::from_path(vehicle_events)?,
            scores: csv::Writer::from_path(scores)?,
        })
    }
}

impl LogSink for CsvLogSink {
    fn log_vehicle_event(&mut self, record: &VehicleEventRecord) -> Result<(), TelemetryError> {
        self.vehicle_events.serialize(record)?;
        self.vehicle_events.flush()?;
        Ok(())
    }

    fn log_score(&mut self, record: &ScoreRecord) -> Result<(), TelemetryError> {
        self.scores.serialize(record)?;
        self.scores.flush()?;
        Ok(())
    }
}

/// Collects simulation telemetry.
#[derive(Default, Resource)]
pub struct SimTelemetry {
    pub vehicle_events: Vec<VehicleEventRecord>,
    pub scores: Vec<ScoreRecord>,
    /// Simulation times at which an hourly progress mark was emitted.
    pub progress_marks: Vec<u64>,
    pub customers_arrived: usize,
    pub customers_disappeared: usize,
    pub vehicles_exited: usize,
    sink: Option<Box<dyn LogSink>>,
    sink_errors: usize,
}

impl fmt::Debug for SimTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimTelemetry")
            .field("vehicle_events", &self.vehicle_events.len())
            .field("scores", &self.scores.len())
            .field("progress_marks", &self.progress_marks)
            .field("customers_arrived", &self.customers_arrived)
            .field("customers_disappeared", &self.customers_disappeared)
            .field("vehicles_exited", &self.vehicles_exited)
            .field("has_sink", &self.sink.is_some())
            .field("sink_errors", &self.sink_errors)
            .finish()
    }
}

impl SimTelemetry {
    pub fn with_sink(sink: Box<dyn LogSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    pub fn set_sink(&mut self, sink: Box<dyn LogSink>) {
        self.sink = Some(sink);
    }

    /// Number of records the sink failed to write.
    pub fn sink_errors(&self) -> usize {
        self.sink_errors
    }

    pub fn record_vehicle_event(&mut self, time: u64, vehicle: &Vehicle, event: VehicleEvent) {
        let record = VehicleEventRecord::capture(time, vehicle, event);
        if let Some(sink) = self.sink.as_mut() {
            if let Err(err) = sink.log_vehicle_event(&record) {
                self.sink_errors += 1;
                warn!(%err, vehicle = %vehicle.id(), "failed to log vehicle event");
            }
        }
        self.vehicle_events.push(record);
    }

    pub fn record_score(&mut self, time: u64, vehicle: &Vehicle) {
        let record = ScoreRecord::capture(time, vehicle);
        if let Some(sink) = self.sink.as_mut() {
            if let Err(err) = sink.log_score(&record) {
                self.sink_errors += 1;
                warn!(%err, vehicle = %vehicle.id(), "failed to log score");
            }
        }
        self.scores.push(record);
        self.vehicles_exited += 1;
    }

    pub fn record_progress(&mut self, time: u64) {
        self.progress_marks.push(time);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::ids::VehicleId;
    use crate::spatial::LatLon;
    use crate::vehicle::{AgentType, VehicleProfile};

    fn vehicle() -> Vehicle {
        Vehicle::new(VehicleId(4), LatLon::new(40.75, -73.99), AgentType::Dummy, VehicleProfile::default())
    }

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<String>>>);

    impl LogSink for Shared {
        fn log_vehicle_event(&mut self, record: &VehicleEventRecord) -> Result<(), TelemetryError> {
            self.0.lock().expect("lock").push(format!("event:{}", record.event));
            Ok(())
        }

        fn log_score(&mut self, record: &ScoreRecord) -> Result<(), TelemetryError> {
            self.0.lock().expect("lock").push(format!("score:{}", record.vehicle_id));
            Ok(())
        }
    }

    struct Broken;

    impl LogSink for Broken {
        fn log_vehicle_event(&mut self, _: &VehicleEventRecord) -> Result<(), TelemetryError> {
            Err(std::io::Error::other("disk full").into())
        }

        fn log_score(&mut self, _: &ScoreRecord) -> Result<(), TelemetryError> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    #[test]
    fn records_are_kept_and_forwarded() {
        let lines = Shared::default();
        let mut telemetry = SimTelemetry::with_sink(Box::new(lines.clone()));
        let v = vehicle();
        telemetry.record_vehicle_event(60, &v, VehicleEvent::Cruise);
        telemetry.record_score(120, &v);
        assert_eq!(telemetry.vehicle_events.len(), 1);
        assert_eq!(telemetry.scores[0].time, 120);
        assert_eq!(telemetry.vehicles_exited, 1);
        assert_eq!(*lines.0.lock().expect("lock"), vec!["event:cruise", "score:4"]);
    }

    #[test]
    fn sink_failures_do_not_lose_records() {
        let mut telemetry = SimTelemetry::with_sink(Box::new(Broken));
        let v = vehicle();
        telemetry.record_vehicle_event(0, &v, VehicleEvent::Park);
        telemetry.record_score(0, &v);
        assert_eq!(telemetry.sink_errors(), 2);
        assert_eq!(telemetry.vehicle_events.len(), 1);
        assert_eq!(telemetry.scores.len(), 1);
    }

    #[test]
    fn csv_sink_writes_one_line_per_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let events = dir.path().join("vehicle_events.csv");
        let scores = dir.path().join("scores.csv");
        let mut sink = CsvLogSink::create(&events, &scores).expect("sink");
        let v = vehicle();
        sink.log_vehicle_event(&VehicleEventRecord::capture(0, &v, VehicleEvent::Cruise))
            .expect("event");
        sink.log_vehicle_event(&VehicleEventRecord::capture(60, &v, VehicleEvent::Park))
            .expect("event");
        sink.log_score(&ScoreRecord::capture(60, &v)).expect("score");

        let events = std::fs::read_to_string(events).expect("read");
        let lines: Vec<_> = events.lines().collect();
        assert_eq!(lines.len(), 3, "header plus two records");
        assert!(lines[0].starts_with("time,vehicle_id,event,status"));
        assert!(lines[2].contains(",park,"));
        let scores = std::fs::read_to_string(scores).expect("read");
        assert_eq!(scores.lines().count(), 2);
    }
}
