//! Driving Style Inference
//!
//! Loads a trained style model and turns reconciled feature vectors into
//! a probability distribution over the fixed driving-style labels.

mod classifier;
mod labels;
mod model;
mod prediction;

pub use classifier::StyleClassifier;
pub use labels::{DrivingStyle, LABEL_COUNT};
pub use model::{LinearModel, ModelManifest, ModelSpec, OnnxModel, StyleModel};
pub use prediction::StylePrediction;

use thiserror::Error;

/// Errors during model loading or inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },
    #[error("Invalid probabilities: {0}")]
    InvalidProbabilities(String),
}
