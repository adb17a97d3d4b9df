//! Feature Normalizer

use crate::features::{
    CongestionFeatures, ADVERSE_WEATHER, DISRUPTIVE_EVENTS, EVENT_BONUS, WEATHER_BONUS,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Saturation constants for the linear terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Vehicle count at which the vehicle term saturates (default: 100)
    pub vehicle_capacity: f64,
    /// Average speed at which the speed term reaches zero (default: 60)
    pub free_flow_speed: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            vehicle_capacity: 100.0,
            free_flow_speed: 60.0,
        }
    }
}

/// Stateless normalizer turning raw readings into bounded risk terms
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureNormalizer {
    config: NormalizerConfig,
}

impl FeatureNormalizer {
    /// Create a new normalizer
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// `count / capacity`, saturating at 1
    pub fn vehicle_term(&self, count: f64) -> f64 {
        saturate(count / self.config.vehicle_capacity)
    }

    /// `1 - speed / free_flow`, saturating at 0 for free-flowing traffic
    pub fn speed_term(&self, avg_speed: f64) -> f64 {
        1.0 - saturate(avg_speed / self.config.free_flow_speed)
    }

    /// Bonus for adverse weather; unknown or absent tags are neutral
    pub fn weather_bonus(&self, weather: Option<&str>) -> f64 {
        match weather {
            Some(tag) => {
                let tag = tag.trim();
                if ADVERSE_WEATHER.iter().any(|w| tag.eq_ignore_ascii_case(w)) {
                    WEATHER_BONUS
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    /// Bonus when any flag names a disruptive event
    pub fn event_bonus<I, S>(&self, flags: I) -> f64
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if flags
            .into_iter()
            .any(|flag| DISRUPTIVE_EVENTS.contains(&flag.as_ref()))
        {
            EVENT_BONUS
        } else {
            0.0
        }
    }

    /// Compute every term for one observation
    pub fn features<I, S>(
        &self,
        avg_speed: f64,
        vehicle_count: f64,
        weather: Option<&str>,
        flags: I,
    ) -> CongestionFeatures
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let features = CongestionFeatures {
            vehicle_term: self.vehicle_term(vehicle_count),
            speed_term: self.speed_term(avg_speed),
            weather_bonus: self.weather_bonus(weather),
            event_bonus: self.event_bonus(flags),
        };
        debug!(
            "Features: vehicle={:.3}, speed={:.3}, bonus={:.1}",
            features.vehicle_term,
            features.speed_term,
            features.bonus()
        );
        features
    }
}

/// Clamp a ratio into [0, 1]. NaN (e.g. 0/0) is neutral.
fn saturate(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}
