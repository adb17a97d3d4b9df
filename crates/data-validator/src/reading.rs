//! Sensor Readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sensor reading as submitted by a roadside sensor
///
/// Every field but `sensor_id` may be omitted on the wire; see
/// [`crate::Validator::validate_sensor`] for how gaps are filled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorPayload {
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sensor_id: String,
    pub intersection_id: Option<String>,
    pub speed_avg: Option<f64>,
    #[serde(default, deserialize_with = "crate::count::deserialize_optional_count")]
    pub vehicle_count: Option<i64>,
    pub payload: Option<BTreeMap<String, f64>>,
}

/// Validated, immutable sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Time the sensor took the measurement
    pub timestamp: DateTime<Utc>,
    /// Reporting sensor (never empty)
    pub sensor_id: String,
    /// Intersection the sensor watches, if known
    pub intersection_id: Option<String>,
    /// Average vehicle speed (km/h)
    pub speed_avg: f64,
    /// Vehicles counted in the sampling window
    pub vehicle_count: u32,
    /// Vendor-specific extra measurements
    pub raw_payload: BTreeMap<String, f64>,
}
