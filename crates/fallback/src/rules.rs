//! Heuristic Congestion Rules

use data_validator::PredictionRequest;
use feature_engine::{CongestionFeatures, FeatureNormalizer, NormalizerConfig};
use tracing::{debug, info};

/// Weight of the vehicle-count term
pub const VEHICLE_WEIGHT: f64 = 0.6;

/// Weight of the speed term
pub const SPEED_WEIGHT: f64 = 0.4;

/// Weighted-sum congestion scorer
///
/// `0.6 * vehicle_term + 0.4 * speed_term + weather_bonus + event_bonus`,
/// clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer {
    normalizer: FeatureNormalizer,
}

impl HeuristicScorer {
    /// Create a heuristic scorer with the given saturation constants
    pub fn new(config: NormalizerConfig) -> Self {
        info!("Creating heuristic scorer with config: {:?}", config);
        Self {
            normalizer: FeatureNormalizer::new(config),
        }
    }

    /// Score a resolved prediction request
    pub fn score(&self, request: &PredictionRequest) -> f64 {
        let features = self.normalizer.features(
            request.speed_avg,
            f64::from(request.vehicle_count),
            request.weather.as_deref(),
            &request.event_flags,
        );
        let score = Self::combine(&features);
        debug!(
            "Heuristic score for {}: {:.4}",
            request.intersection_id, score
        );
        score
    }

    /// Combine normalized terms into a bounded score
    pub fn combine(features: &CongestionFeatures) -> f64 {
        let score = VEHICLE_WEIGHT * features.vehicle_term
            + SPEED_WEIGHT * features.speed_term
            + features.bonus();
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        }
    }
}
