//! Parquet export of the in-memory telemetry tables.

mod utils;

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, UInt32Array, UInt64Array, UInt8Array};
use arrow::datatypes::Schema;

use crate::error::TelemetryError;
use crate::telemetry::SimTelemetry;

use utils::{f64_field, nullable_u64_field, u32_field, u64_field, u8_field, utf8_field, write_record_batch};

pub fn write_scores_parquet<P: AsRef<Path>>(path: P, telemetry: &SimTelemetry) -> Result<(), TelemetryError> {
    let rows = &telemetry.scores;
    let f64_col = |get: fn(&crate::telemetry::ScoreRecord) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(get).collect::<Vec<_>>()))
    };

    let schema = Schema::new(vec![
        u64_field("time"),
        u64_field("vehicle_id"),
        f64_field("working_time"),
        f64_field("earnings"),
        f64_field("idle"),
        f64_field("cruising"),
        f64_field("occupied"),
        f64_field("assigned"),
        f64_field("off_duty"),
        f64_field("profit"),
        f64_field("busy_adjusted_idle_time"),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(rows.iter().map(|r| r.time).collect::<Vec<_>>())),
        Arc::new(UInt64Array::from(rows.iter().map(|r| r.vehicle_id).collect::<Vec<_>>())),
        f64_col(|r| r.working_time),
        f64_col(|r| r.earnings),
        f64_col(|r| r.idle),
        f64_col(|r| r.cruising),
        f64_col(|r| r.occupied),
        f64_col(|r| r.assigned),
        f64_col(|r| r.off_duty),
        f64_col(|r| r.profit),
        f64_col(|r| r.busy_adjusted_idle_time),
    ];

    write_record_batch(path, schema, arrays)
}

pub fn write_vehicle_events_parquet<P: AsRef<Path>>(
    path: P,
    telemetry: &SimTelemetry,
) -> Result<(), TelemetryError> {
    let n = telemetry.vehicle_events.len();
    let mut time = Vec::with_capacity(n);
    let mut vehicle_id = Vec::with_capacity(n);
    let mut event = Vec::with_capacity(n);
    let mut status = Vec::with_capacity(n);
    let mut lat = Vec::with_capacity(n);
    let mut lon = Vec::with_capacity(n);
    let mut destination_lat = Vec::with_capacity(n);
    let mut destination_lon = Vec::with_capacity(n);
    let mut time_to_destination = Vec::with_capacity(n);
    let mut current_capacity = Vec::with_capacity(n);
    let mut assigned_customer = Vec::with_capacity(n);
    let mut travel_distance = Vec::with_capacity(n);
    let mut earnings = Vec::with_capacity(n);

    for record in &telemetry.vehicle_events {
        time.push(record.time);
        vehicle_id.push(record.vehicle_id);
        event.push(record.event);
        status.push(record.status);
        lat.push(record.lat);
        lon.push(record.lon);
        destination_lat.push(record.destination_lat);
        destination_lon.push(record.destination_lon);
        time_to_destination.push(record.time_to_destination);
        current_capacity.push(record.current_capacity);
        assigned_customer.push(record.assigned_customer);
        travel_distance.push(record.travel_distance);
        earnings.push(record.earnings);
    }

    let schema = Schema::new(vec![
        u64_field("time"),
        u64_field("vehicle_id"),
        utf8_field("event"),
        u8_field("status"),
        f64_field("lat"),
        f64_field("lon"),
        f64_field("destination_lat"),
        f64_field("destination_lon"),
        f64_field("time_to_destination"),
        u32_field("current_capacity"),
        nullable_u64_field("assigned_customer"),
        f64_field("travel_distance"),
        f64_field("earnings"),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(time)),
        Arc::new(UInt64Array::from(vehicle_id)),
        Arc::new(StringArray::from(event)),
        Arc::new(UInt8Array::from(status)),
        Arc::new(Float64Array::from(lat)),
        Arc::new(Float64Array::from(lon)),
        Arc::new(Float64Array::from(destination_lat)),
        Arc::new(Float64Array::from(destination_lon)),
        Arc::new(Float64Array::from(time_to_destination)),
        Arc::new(UInt32Array::from(current_capacity)),
        Arc::new(UInt64Array::from(assigned_customer)),
        Arc::new(Float64Array::from(travel_distance)),
        Arc::new(Float64Array::from(earnings)),
    ];

    write_record_batch(path, schema, arrays)
}
