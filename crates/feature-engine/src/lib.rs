//! Feature Engineering Engine
//!
//! Reduces a window of telemetry frames to a fixed-schema feature vector
//! and reconciles that vector against the schema a classifier was trained on.

mod features;
mod fft;
mod reconcile;
mod statistics;

pub use features::{FeatureAggregator, FeatureVector, FEATURE_NAMES};
pub use fft::{FftAnalyzer, FrequencyBands, SpectralFeatures};
pub use reconcile::{reconcile, SchemaDrift, MISSING_FEATURE_DEFAULT};
pub use statistics::StatisticalFeatures;

use thiserror::Error;

/// Errors during feature aggregation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    #[error("Cannot aggregate an empty window")]
    EmptyWindow,
}
