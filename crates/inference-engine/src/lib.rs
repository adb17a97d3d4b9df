//! Congestion Inference Engine
//!
//! Loads an optional ONNX congestion classifier with tract and falls back to
//! the rule-based scorer when the artifact is missing or unusable.

mod adapter;
mod model;
mod predictor;
mod scorer;

pub use adapter::{AdapterState, ModelAdapter};
pub use model::{ArtifactLoader, LearnedModelScorer, OnnxArtifactLoader};
pub use predictor::{ModelIdentity, PredictionResult, PredictorConfig, PredictorService};
pub use scorer::Scorer;

use std::path::PathBuf;
use thiserror::Error;

/// Errors during model loading and inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model artifact not found at {}", .0.display())]
    ArtifactUnavailable(PathBuf),
    #[error("Model artifact at {} is unusable: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid output shape: expected {expected}, got {actual}")]
    InvalidOutputShape { expected: String, actual: String },
}
