//! Data Validator for Ingested Readings

use crate::error::ValidationError;
use crate::reading::{SensorPayload, SensorReading};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Average speed valid range (km/h)
    pub speed_range: (f64, f64),
    /// Vehicle count valid range per sampling window
    pub vehicle_count_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            speed_range: (0.0, 300.0),
            vehicle_count_range: (0.0, 100_000.0),
        }
    }
}

/// Validator for incoming sensor payloads
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if !(range.0..=range.1).contains(&value) {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Validate average speed
    pub fn validate_speed(&self, speed: f64) -> Result<(), ValidationError> {
        self.validate_range("speed_avg", speed, self.config.speed_range)
    }

    /// Validate vehicle count
    pub fn validate_vehicle_count(&self, count: i64) -> Result<(), ValidationError> {
        self.validate_range("vehicle_count", count as f64, self.config.vehicle_count_range)
    }

    /// Validate a payload and fill absent numeric fields with zero
    pub fn validate_sensor(&self, payload: SensorPayload) -> Result<SensorReading, ValidationError> {
        let timestamp = payload
            .timestamp
            .ok_or(ValidationError::MissingField("timestamp"))?;

        let sensor_id = payload.sensor_id.trim();
        if sensor_id.is_empty() {
            return Err(ValidationError::InvalidFormat(
                "sensor_id must not be empty".to_string(),
            ));
        }

        let speed_avg = payload.speed_avg.unwrap_or(0.0);
        self.validate_speed(speed_avg)?;

        let vehicle_count = payload.vehicle_count.unwrap_or(0);
        self.validate_vehicle_count(vehicle_count)?;
        let vehicle_count = u32::try_from(vehicle_count).map_err(|_| {
            ValidationError::InvalidFormat(format!("vehicle_count {} overflows", vehicle_count))
        })?;

        let raw_payload = payload.payload.unwrap_or_default();
        if let Some((key, _)) = raw_payload.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ValidationError::InvalidFormat(format!(
                "payload value for '{}' is not a finite number",
                key
            )));
        }

        let intersection_id = payload
            .intersection_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        debug!(
            "Validated reading from sensor {} (intersection {:?})",
            sensor_id, intersection_id
        );

        Ok(SensorReading {
            timestamp,
            sensor_id: sensor_id.to_string(),
            intersection_id,
            speed_avg,
            vehicle_count,
            raw_payload,
        })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn payload() -> SensorPayload {
        SensorPayload {
            timestamp: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()),
            sensor_id: "cam-17".to_string(),
            intersection_id: Some("5th-and-main".to_string()),
            speed_avg: Some(32.5),
            vehicle_count: Some(41),
            payload: None,
        }
    }

    #[test]
    fn test_valid_reading() {
        let reading = Validator::default().validate_sensor(payload()).unwrap();
        assert_eq!(reading.sensor_id, "cam-17");
        assert_eq!(reading.vehicle_count, 41);
        assert!(reading.raw_payload.is_empty());
    }

    #[test]
    fn test_absent_numbers_default_to_zero() {
        let reading = Validator::default()
            .validate_sensor(SensorPayload {
                speed_avg: None,
                vehicle_count: None,
                ..payload()
            })
            .unwrap();
        assert_eq!(reading.speed_avg, 0.0);
        assert_eq!(reading.vehicle_count, 0);
    }

    #[test]
    fn test_missing_timestamp() {
        let err = Validator::default()
            .validate_sensor(SensorPayload {
                timestamp: None,
                ..payload()
            })
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("timestamp"));
    }

    #[test]
    fn test_empty_sensor_id() {
        let result = Validator::default().validate_sensor(SensorPayload {
            sensor_id: "   ".to_string(),
            ..payload()
        });
        assert!(matches!(result, Err(ValidationError::InvalidFormat(_))));
    }

    #[test]
    fn test_negative_values_rejected() {
        let validator = Validator::default();
        assert!(validator
            .validate_sensor(SensorPayload {
                speed_avg: Some(-1.0),
                ..payload()
            })
            .is_err());
        assert!(validator
            .validate_sensor(SensorPayload {
                vehicle_count: Some(-3),
                ..payload()
            })
            .is_err());
    }

    #[test]
    fn test_non_finite_payload_rejected() {
        let mut extra = BTreeMap::new();
        extra.insert("occupancy".to_string(), f64::NAN);
        let result = Validator::default().validate_sensor(SensorPayload {
            payload: Some(extra),
            ..payload()
        });
        assert!(matches!(result, Err(ValidationError::InvalidFormat(_))));
    }

    #[test]
    fn test_payload_from_json() {
        let payload: SensorPayload = serde_json::from_str(
            r#"{"timestamp": "2024-05-01T08:30:00Z", "sensor_id": "loop-3", "payload": {"occupancy": 0.4}}"#,
        )
        .unwrap();
        let reading = Validator::default().validate_sensor(payload).unwrap();
        assert_eq!(reading.raw_payload.get("occupancy"), Some(&0.4));
        assert!(reading.intersection_id.is_none());
    }
}
