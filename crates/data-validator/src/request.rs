//! Prediction Requests

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Prediction request as received from a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictPayload {
    pub intersection_id: String,
    pub speed_avg: f64,
    #[serde(deserialize_with = "crate::count::deserialize_count")]
    pub vehicle_count: i64,
    pub weather: Option<String>,
    pub event_flags: Option<Vec<String>>,
}

/// Fully resolved prediction request
///
/// Numeric fields are non-negative and finite; optional fields carry
/// explicit neutral defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub intersection_id: String,
    pub speed_avg: f64,
    pub vehicle_count: u32,
    pub weather: Option<String>,
    pub event_flags: BTreeSet<String>,
}

impl PredictionRequest {
    /// Create a request with no weather and no event flags
    pub fn new(intersection_id: impl Into<String>, speed_avg: f64, vehicle_count: u32) -> Self {
        Self {
            intersection_id: intersection_id.into(),
            speed_avg,
            vehicle_count,
            weather: None,
            event_flags: BTreeSet::new(),
        }
    }

    /// Set the weather tag
    pub fn with_weather(mut self, weather: impl Into<String>) -> Self {
        self.weather = Some(weather.into());
        self
    }

    /// Add an event flag
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.event_flags.insert(flag.into());
        self
    }
}

impl PredictPayload {
    /// Resolve defaults and clamp out-of-range numbers. Never fails.
    pub fn resolve(self) -> PredictionRequest {
        let speed_avg = if self.speed_avg.is_finite() {
            self.speed_avg.max(0.0)
        } else if self.speed_avg == f64::INFINITY {
            f64::MAX
        } else {
            0.0
        };
        let vehicle_count = self.vehicle_count.clamp(0, i64::from(u32::MAX)) as u32;

        if speed_avg != self.speed_avg || i64::from(vehicle_count) != self.vehicle_count {
            debug!(
                "Clamped prediction input for {}: speed {} -> {}, count {} -> {}",
                self.intersection_id, self.speed_avg, speed_avg, self.vehicle_count, vehicle_count
            );
        }

        let weather = self
            .weather
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty());

        let event_flags = self
            .event_flags
            .unwrap_or_default()
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();

        PredictionRequest {
            intersection_id: self.intersection_id,
            speed_avg,
            vehicle_count,
            weather,
            event_flags,
        }
    }
}
