//! Model Adapter

use crate::model::ArtifactLoader;
use crate::scorer::Scorer;
use crate::InferenceError;
use data_validator::PredictionRequest;
use fallback::HeuristicScorer;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Which scoring path the adapter settled on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    /// A learned model artifact was loaded
    ModelBacked,
    /// No usable artifact; the rule-based scorer is active
    HeuristicBacked,
}

impl AdapterState {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterState::ModelBacked => "model",
            AdapterState::HeuristicBacked => "heuristic",
        }
    }
}

/// Uniform `[0, 1]` scoring over a learned model or the heuristic fallback
///
/// The scoring path is chosen once in [`ModelAdapter::initialize`] and never
/// changes afterwards.
pub struct ModelAdapter {
    scorer: Box<dyn Scorer>,
    heuristic: HeuristicScorer,
    state: AdapterState,
}

impl ModelAdapter {
    /// Load the artifact at `artifact_path`, falling back to the heuristic on
    /// any failure. Never fails.
    pub fn initialize(
        artifact_path: &Path,
        loader: &dyn ArtifactLoader,
        heuristic: HeuristicScorer,
    ) -> Self {
        match loader.load(artifact_path) {
            Ok(scorer) => {
                info!(
                    "Loaded model from {} ({})",
                    artifact_path.display(),
                    scorer.name()
                );
                Self {
                    scorer,
                    heuristic,
                    state: AdapterState::ModelBacked,
                }
            }
            Err(InferenceError::ArtifactUnavailable(path)) => {
                info!("Model file not found at {}; using heuristic", path.display());
                Self::heuristic(heuristic)
            }
            Err(e) => {
                warn!(
                    "Failed to load model at {}: {}; using heuristic",
                    artifact_path.display(),
                    e
                );
                Self::heuristic(heuristic)
            }
        }
    }

    /// Create an adapter that always uses the heuristic
    pub fn heuristic(heuristic: HeuristicScorer) -> Self {
        Self {
            scorer: Box::new(heuristic),
            heuristic,
            state: AdapterState::HeuristicBacked,
        }
    }

    /// Score a request, clamped to `[0, 1]`
    pub fn score(&self, request: &PredictionRequest) -> f64 {
        let raw = match self.scorer.score(request) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "{} scorer failed for {}: {}; using heuristic",
                    self.scorer.name(),
                    request.intersection_id,
                    e
                );
                self.heuristic.score(request)
            }
        };
        let score = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
        debug!(
            "Adapter score for {}: {:.4} (raw {:.4})",
            request.intersection_id, score, raw
        );
        score
    }

    /// Get the scoring path in use
    pub fn state(&self) -> AdapterState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FixedScorer(f64);

    impl Scorer for FixedScorer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn score(&self, _request: &PredictionRequest) -> Result<f64, InferenceError> {
            Ok(self.0)
        }
    }

    struct FailingScorer;

    impl Scorer for FailingScorer {
        fn name(&self) -> &str {
            "failing"
        }

        fn score(&self, _request: &PredictionRequest) -> Result<f64, InferenceError> {
            Err(InferenceError::InferenceFailed("boom".to_string()))
        }
    }

    enum StubLoader {
        Fixed(f64),
        Failing,
        Missing,
        Corrupt,
    }

    impl ArtifactLoader for StubLoader {
        fn load(&self, path: &Path) -> Result<Box<dyn Scorer>, InferenceError> {
            match self {
                StubLoader::Fixed(v) => Ok(Box::new(FixedScorer(*v))),
                StubLoader::Failing => Ok(Box::new(FailingScorer)),
                StubLoader::Missing => Err(InferenceError::ArtifactUnavailable(path.to_path_buf())),
                StubLoader::Corrupt => Err(InferenceError::ArtifactCorrupt {
                    path: path.to_path_buf(),
                    reason: "truncated".to_string(),
                }),
            }
        }
    }

    fn init(loader: StubLoader) -> ModelAdapter {
        ModelAdapter::initialize(
            &PathBuf::from("models/test.onnx"),
            &loader,
            HeuristicScorer::default(),
        )
    }

    #[test]
    fn test_model_backed() {
        let adapter = init(StubLoader::Fixed(0.42));
        assert_eq!(adapter.state(), AdapterState::ModelBacked);
        assert_eq!(adapter.score(&PredictionRequest::new("I-1", 10.0, 90)), 0.42);
    }

    #[test]
    fn test_missing_and_corrupt_fall_back() {
        let request = PredictionRequest::new("I-1", 10.0, 90);
        let expected = HeuristicScorer::default().score(&request);

        for loader in [StubLoader::Missing, StubLoader::Corrupt] {
            let adapter = init(loader);
            assert_eq!(adapter.state(), AdapterState::HeuristicBacked);
            assert!((adapter.score(&request) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_model_output_is_clamped() {
        let request = PredictionRequest::new("I-1", 10.0, 90);
        assert_eq!(init(StubLoader::Fixed(3.5)).score(&request), 1.0);
        assert_eq!(init(StubLoader::Fixed(-0.2)).score(&request), 0.0);
        assert_eq!(init(StubLoader::Fixed(f64::NAN)).score(&request), 0.0);
    }

    #[test]
    fn test_scoring_error_uses_heuristic() {
        let request = PredictionRequest::new("I-1", 30.0, 50);
        let adapter = init(StubLoader::Failing);
        assert_eq!(adapter.state(), AdapterState::ModelBacked);
        let expected = HeuristicScorer::default().score(&request);
        assert!((adapter.score(&request) - expected).abs() < 1e-12);
    }
}
