//! Feature Normalization Engine
//!
//! Maps raw traffic-sensor attributes (speed, vehicle count, weather, event
//! flags) into bounded `[0, 1]` congestion risk contributions.

mod features;
mod normalizer;

pub use features::{CongestionFeatures, ADVERSE_WEATHER, DISRUPTIVE_EVENTS, EVENT_BONUS, WEATHER_BONUS};
pub use normalizer::{FeatureNormalizer, NormalizerConfig};
