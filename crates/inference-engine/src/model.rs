//! Model Artifact Loading
//!
//! A model artifact is a JSON manifest naming the ordered input features
//! and the model itself, either inline linear weights or an ONNX file.

use crate::classifier::StyleClassifier;
use crate::labels::LABEL_COUNT;
use crate::InferenceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tract_onnx::prelude::*;

/// On-disk model manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Input feature names in the order the model expects
    pub features: Vec<String>,
    #[serde(flatten)]
    pub model: ModelSpec,
}

/// Model body, selected by the manifest's `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    /// Multinomial logistic regression
    Linear {
        /// One row of weights per label
        coefficients: Vec<Vec<f64>>,
        /// One bias per label
        intercepts: Vec<f64>,
        /// Per-feature standardization mean
        #[serde(default)]
        means: Option<Vec<f64>>,
        /// Per-feature standardization scale
        #[serde(default)]
        scales: Option<Vec<f64>>,
    },
    /// ONNX graph taking a `[1, n_features]` f32 tensor
    Onnx {
        /// Model file, relative to the manifest
        path: PathBuf,
        /// Index of the probability output tensor
        #[serde(default = "default_probability_output")]
        output: usize,
    },
}

fn default_probability_output() -> usize {
    // skl2onnx classifiers emit (label, probabilities)
    1
}

impl ModelManifest {
    /// Read and parse a manifest file
    pub fn from_path(path: &Path) -> Result<Self, InferenceError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", path.display(), e)))
    }
}

/// Loaded style model
pub enum StyleModel {
    Linear(LinearModel),
    Onnx(OnnxModel),
}

impl StyleModel {
    /// Load the model artifact at `path`.
    ///
    /// Every shape is validated here so a bad artifact fails at startup
    /// rather than on the first window.
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        info!("Loading style model from {}", path.display());
        let manifest = ModelManifest::from_path(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_manifest(manifest, base_dir)
    }

    /// Build a model from an already-parsed manifest
    pub fn from_manifest(manifest: ModelManifest, base_dir: &Path) -> Result<Self, InferenceError> {
        if manifest.features.is_empty() {
            return Err(InferenceError::ModelLoadError(
                "manifest lists no features".to_string(),
            ));
        }

        let model = match manifest.model {
            ModelSpec::Linear {
                coefficients,
                intercepts,
                means,
                scales,
            } => StyleModel::Linear(LinearModel::new(
                manifest.features,
                coefficients,
                intercepts,
                means,
                scales,
            )?),
            ModelSpec::Onnx { path, output } => {
                StyleModel::Onnx(OnnxModel::load(&base_dir.join(path), manifest.features, output)?)
            }
        };

        info!(
            "Style model ready: {} with {} features",
            model.kind(),
            model.feature_names().len()
        );
        Ok(model)
    }

    /// Short model kind name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            StyleModel::Linear(_) => "linear",
            StyleModel::Onnx(_) => "onnx",
        }
    }
}

impl StyleClassifier for StyleModel {
    fn feature_names(&self) -> &[String] {
        match self {
            StyleModel::Linear(m) => m.feature_names(),
            StyleModel::Onnx(m) => m.feature_names(),
        }
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        match self {
            StyleModel::Linear(m) => m.predict_proba(features),
            StyleModel::Onnx(m) => m.predict_proba(features),
        }
    }
}

impl fmt::Debug for StyleModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleModel")
            .field("kind", &self.kind())
            .field("features", &self.feature_names())
            .finish()
    }
}

fn check_input(expected: usize, features: &[f64]) -> Result<(), InferenceError> {
    if features.len() != expected {
        return Err(InferenceError::InvalidInputShape {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

/// Softmax-normalized linear model
#[derive(Debug, Clone)]
pub struct LinearModel {
    features: Vec<String>,
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl LinearModel {
    /// Create a linear model, validating every dimension
    pub fn new(
        features: Vec<String>,
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
        means: Option<Vec<f64>>,
        scales: Option<Vec<f64>>,
    ) -> Result<Self, InferenceError> {
        let n = features.len();
        let shape_error = |what: &str, expected: usize, actual: usize| {
            InferenceError::ModelLoadError(format!(
                "{} has length {}, expected {}",
                what, actual, expected
            ))
        };

        if coefficients.len() != LABEL_COUNT {
            return Err(shape_error("coefficients", LABEL_COUNT, coefficients.len()));
        }
        if let Some(row) = coefficients.iter().find(|row| row.len() != n) {
            return Err(shape_error("coefficient row", n, row.len()));
        }
        if intercepts.len() != LABEL_COUNT {
            return Err(shape_error("intercepts", LABEL_COUNT, intercepts.len()));
        }
        let means = means.unwrap_or_else(|| vec![0.0; n]);
        if means.len() != n {
            return Err(shape_error("means", n, means.len()));
        }
        let scales = scales.unwrap_or_else(|| vec![1.0; n]);
        if scales.len() != n {
            return Err(shape_error("scales", n, scales.len()));
        }

        Ok(Self {
            features,
            coefficients,
            intercepts,
            means,
            scales,
        })
    }

    fn logits(&self, features: &[f64]) -> Vec<f64> {
        let standardized: Vec<f64> = features
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (mean, scale))| {
                // Constant features were fit with zero scale
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect();

        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, bias)| bias + row.iter().zip(&standardized).map(|(w, x)| w * x).sum::<f64>())
            .collect()
    }
}

impl StyleClassifier for LinearModel {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        check_input(self.features.len(), features)?;
        let logits = self.logits(features);

        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(InferenceError::InferenceFailed(
                "non-finite logits".to_string(),
            ));
        }
        let exp: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        Ok(exp.into_iter().map(|e| e / total).collect())
    }
}

type OnnxRunner = Box<dyn Fn(Tensor) -> TractResult<TVec<TValue>> + Send + Sync>;

/// ONNX model executed with tract
pub struct OnnxModel {
    features: Vec<String>,
    output: usize,
    runner: OnnxRunner,
}

impl OnnxModel {
    /// Load and optimize an ONNX graph for a `[1, n_features]` input
    pub fn load(path: &Path, features: Vec<String>, output: usize) -> Result<Self, InferenceError> {
        debug!("Loading ONNX graph {}", path.display());
        let n = features.len();
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, n]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
            })?;

        let runner: OnnxRunner = Box::new(move |input: Tensor| plan.run(tvec!(input.into())));
        Ok(Self {
            features,
            output,
            runner,
        })
    }
}

impl StyleClassifier for OnnxModel {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        check_input(self.features.len(), features)?;

        let input: Tensor = tract_ndarray::Array2::from_shape_vec(
            (1, features.len()),
            features.iter().map(|&v| v as f32).collect(),
        )
        .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?
        .into();

        let outputs =
            (self.runner)(input).map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let probabilities = outputs.get(self.output).ok_or_else(|| {
            InferenceError::InferenceFailed(format!(
                "model has {} outputs, probability output is {}",
                outputs.len(),
                self.output
            ))
        })?;
        let view = probabilities
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        Ok(view.iter().map(|&p| p as f64).collect())
    }
}
