//! Congestion Feature Terms

use serde::{Deserialize, Serialize};

/// Weather tags that add to the congestion score (compared case-insensitively)
pub const ADVERSE_WEATHER: [&str; 3] = ["rain", "snow", "storm"];

/// Event flags that add to the congestion score
pub const DISRUPTIVE_EVENTS: [&str; 3] = ["accident", "school_zone", "construction"];

/// Contribution of an adverse weather tag
pub const WEATHER_BONUS: f64 = 0.1;

/// Contribution of a disruptive event flag
pub const EVENT_BONUS: f64 = 0.1;

/// Normalized congestion terms for a single observation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CongestionFeatures {
    /// Vehicle count relative to capacity, in [0, 1]
    pub vehicle_term: f64,
    /// Inverse of speed relative to free flow, in [0, 1]
    pub speed_term: f64,
    /// Either 0 or [`WEATHER_BONUS`]
    pub weather_bonus: f64,
    /// Either 0 or [`EVENT_BONUS`]
    pub event_bonus: f64,
}

impl CongestionFeatures {
    /// Sum of both bonus terms
    pub fn bonus(&self) -> f64 {
        self.weather_bonus + self.event_bonus
    }
}
