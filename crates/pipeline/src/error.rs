//! Per-stage pipeline errors

use crate::config::ConfigError;
use feature_engine::FeatureError;
use forza_protocol::DecodeError;
use inference_engine::InferenceError;
use thiserror::Error;
use timeseries_sink::SinkError;

/// Failure of one pipeline stage
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("Feature aggregation failed: {0}")]
    Feature(#[from] FeatureError),
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),
    #[error("Sink write failed: {0}")]
    Sink(#[from] SinkError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Short stage name used in logs and metric labels
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Decode(_) => "decode",
            PipelineError::Feature(_) => "feature",
            PipelineError::Inference(_) => "inference",
            PipelineError::Sink(_) => "sink",
            PipelineError::Io(_) => "io",
            PipelineError::Config(_) => "config",
        }
    }
}
