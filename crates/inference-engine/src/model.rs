//! ONNX Model Loading

use crate::scorer::Scorer;
use crate::InferenceError;
use data_validator::PredictionRequest;
use std::path::Path;
use tracing::{debug, info};
use tract_onnx::prelude::*;

/// Number of input features: `[speed_avg, vehicle_count]`
const INPUT_DIMENSION: usize = 2;

/// Index of the "congested" class in a two-class probability output
const CONGESTED_CLASS: usize = 1;

type OnnxPlan = TypedRunnableModel<TypedModel>;

/// Loads a serialized classifier into a [`Scorer`]
pub trait ArtifactLoader: Send + Sync {
    /// Load the artifact at `path`
    fn load(&self, path: &Path) -> Result<Box<dyn Scorer>, InferenceError>;
}

/// Loader for ONNX classifiers, run with tract
#[derive(Debug, Clone, Copy, Default)]
pub struct OnnxArtifactLoader;

impl ArtifactLoader for OnnxArtifactLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn Scorer>, InferenceError> {
        if !path.is_file() {
            return Err(InferenceError::ArtifactUnavailable(path.to_path_buf()));
        }
        let scorer = LearnedModelScorer::load(path)?;
        Ok(Box::new(scorer))
    }
}

/// Which model output holds the score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputSelection {
    /// Two-class probability tensor at this output index
    Probability(usize),
    /// First element of the first output
    Raw,
}

/// Scorer backed by a pre-trained ONNX classifier
pub struct LearnedModelScorer {
    plan: OnnxPlan,
    selection: OutputSelection,
}

impl LearnedModelScorer {
    /// Load and warm up the model at `path`
    ///
    /// The model must accept a single `f32` tensor of shape `[1, 2]`. Models
    /// exported from scikit-learn need the ZipMap operator disabled so the
    /// probabilities come out as a plain tensor.
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        info!("Loading congestion model from {}", path.display());
        let corrupt = |reason: String| InferenceError::ArtifactCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, INPUT_DIMENSION]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| corrupt(e.to_string()))?;

        // Warm-up run decides how the outputs are read
        let outputs = run_plan(&plan, 0.0, 0.0).map_err(|e| corrupt(e.to_string()))?;
        let selection = select_output(&outputs).map_err(|e| corrupt(e.to_string()))?;
        info!(
            "Model loaded from {} ({} outputs, selection {:?})",
            path.display(),
            outputs.len(),
            selection
        );

        Ok(Self { plan, selection })
    }
}

impl Scorer for LearnedModelScorer {
    fn name(&self) -> &str {
        "onnx"
    }

    fn score(&self, request: &PredictionRequest) -> Result<f64, InferenceError> {
        let outputs = run_plan(&self.plan, request.speed_avg, f64::from(request.vehicle_count))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let value = read_score(&outputs, self.selection)?;
        debug!("Model score for {}: {:.4}", request.intersection_id, value);
        Ok(f64::from(value))
    }
}

fn run_plan(plan: &OnnxPlan, speed_avg: f64, vehicle_count: f64) -> TractResult<TVec<TValue>> {
    let input = Tensor::from_shape(&[1, INPUT_DIMENSION], &[speed_avg as f32, vehicle_count as f32])?;
    plan.run(tvec!(input.into()))
}

fn select_output(outputs: &[TValue]) -> Result<OutputSelection, InferenceError> {
    for (idx, output) in outputs.iter().enumerate() {
        if output.len() == 2 && output.cast_to::<f32>().is_ok() {
            return Ok(OutputSelection::Probability(idx));
        }
    }

    match outputs.first() {
        Some(first) if first.len() > 0 && first.cast_to::<f32>().is_ok() => Ok(OutputSelection::Raw),
        Some(first) => Err(InferenceError::InvalidOutputShape {
            expected: "numeric tensor".to_string(),
            actual: format!("{:?} of {:?}", first.shape(), first.datum_type()),
        }),
        None => Err(InferenceError::InvalidOutputShape {
            expected: "at least one output".to_string(),
            actual: "none".to_string(),
        }),
    }
}

fn read_score(outputs: &[TValue], selection: OutputSelection) -> Result<f32, InferenceError> {
    match selection {
        OutputSelection::Probability(idx) => output_values(outputs, idx)?
            .get(CONGESTED_CLASS)
            .copied(),
        OutputSelection::Raw => output_values(outputs, 0)?.first().copied(),
    }
    .ok_or_else(|| InferenceError::InvalidOutputShape {
        expected: "non-empty output".to_string(),
        actual: "empty tensor".to_string(),
    })
}

fn output_values(outputs: &[TValue], idx: usize) -> Result<Vec<f32>, InferenceError> {
    let output = outputs
        .get(idx)
        .ok_or_else(|| InferenceError::InvalidOutputShape {
            expected: format!("output #{}", idx),
            actual: format!("{} outputs", outputs.len()),
        })?;
    let values = output
        .cast_to::<f32>()
        .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
    let slice = values
        .as_slice::<f32>()
        .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
    Ok(slice.to_vec())
}
