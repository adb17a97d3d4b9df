//! Vehicle Count Alert Heuristic

use crate::alert::{Alert, AlertLevel};
use chrono::Utc;
use data_validator::SensorReading;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Alert configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Vehicle count at or above which an alert fires (default: 80)
    pub vehicle_count_threshold: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            vehicle_count_threshold: 80,
        }
    }
}

/// Stateless threshold check over the most recent reading
///
/// Every evaluation at or above the threshold yields one alert; there is no
/// cooldown or deduplication.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertHeuristic {
    config: AlertConfig,
}

impl AlertHeuristic {
    /// Create a new alert heuristic
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert heuristic with config: {:?}", config);
        Self { config }
    }

    /// Get the configured threshold
    pub fn threshold(&self) -> u32 {
        self.config.vehicle_count_threshold
    }

    /// Decide whether `reading` warrants an alert
    pub fn evaluate(&self, reading: &SensorReading) -> Option<Alert> {
        if reading.vehicle_count < self.config.vehicle_count_threshold {
            debug!(
                "No alert: vehicle count {} < threshold {}",
                reading.vehicle_count, self.config.vehicle_count_threshold
            );
            return None;
        }

        let alert = Alert {
            created_at: Utc::now(),
            level: AlertLevel::Warn,
            message: format!("High vehicle count {}", reading.vehicle_count),
            intersection_id: reading.intersection_id.clone(),
        };
        info!(
            "Alert triggered for {:?}: {}",
            alert.intersection_id, alert.message
        );
        Some(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn reading(vehicle_count: u32) -> SensorReading {
        SensorReading {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 17, 45, 0).unwrap(),
            sensor_id: "loop-12".to_string(),
            intersection_id: Some("market-and-4th".to_string()),
            speed_avg: 14.0,
            vehicle_count,
            raw_payload: BTreeMap::new(),
        }
    }

    #[test]
    fn test_below_threshold() {
        let heuristic = AlertHeuristic::default();
        assert!(heuristic.evaluate(&reading(79)).is_none());
        assert!(heuristic.evaluate(&reading(0)).is_none());
    }

    #[test]
    fn test_at_threshold() {
        let alert = AlertHeuristic::default().evaluate(&reading(80)).unwrap();
        assert_eq!(alert.level, AlertLevel::Warn);
        assert!(alert.message.contains("80"));
        assert_eq!(alert.intersection_id.as_deref(), Some("market-and-4th"));
    }

    #[test]
    fn test_no_suppression_on_repeat() {
        let heuristic = AlertHeuristic::default();
        let high = reading(120);
        assert!(heuristic.evaluate(&high).is_some());
        assert!(heuristic.evaluate(&high).is_some());
    }

    #[test]
    fn test_custom_threshold() {
        let heuristic = AlertHeuristic::new(AlertConfig {
            vehicle_count_threshold: 50,
        });
        assert_eq!(heuristic.threshold(), 50);
        assert!(heuristic.evaluate(&reading(49)).is_none());
        assert!(heuristic.evaluate(&reading(50)).is_some());
    }

    #[test]
    fn test_missing_intersection() {
        let mut r = reading(95);
        r.intersection_id = None;
        let alert = AlertHeuristic::default().evaluate(&r).unwrap();
        assert!(alert.intersection_id.is_none());
    }
}
