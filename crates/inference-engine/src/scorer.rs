//! Scoring Interface

use crate::InferenceError;
use data_validator::PredictionRequest;
use fallback::HeuristicScorer;

/// A congestion scoring strategy
///
/// Implementations may return values outside `[0, 1]`; the adapter clamps.
pub trait Scorer: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &str;

    /// Score a request
    fn score(&self, request: &PredictionRequest) -> Result<f64, InferenceError>;
}

impl Scorer for HeuristicScorer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn score(&self, request: &PredictionRequest) -> Result<f64, InferenceError> {
        Ok(HeuristicScorer::score(self, request))
    }
}
