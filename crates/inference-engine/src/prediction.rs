//! Label selection from a probability distribution

use crate::labels::{DrivingStyle, LABEL_COUNT};
use crate::InferenceError;
use serde::{Deserialize, Serialize};

/// The winning label for one window evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylePrediction {
    /// Winning label
    pub style: DrivingStyle,
    /// Probability of the winning label, clamped to [0, 1]
    pub confidence: f64,
    /// Full distribution, by label index
    pub probabilities: Vec<f64>,
}

impl StylePrediction {
    /// Select the arg-max label. Ties resolve to the lowest index.
    pub fn from_probabilities(probabilities: &[f64]) -> Result<Self, InferenceError> {
        if probabilities.len() != LABEL_COUNT {
            return Err(InferenceError::InvalidProbabilities(format!(
                "expected {} values, got {}",
                LABEL_COUNT,
                probabilities.len()
            )));
        }
        if let Some(bad) = probabilities.iter().find(|p| !p.is_finite()) {
            return Err(InferenceError::InvalidProbabilities(format!(
                "non-finite value {}",
                bad
            )));
        }

        let mut best = 0;
        for (i, &p) in probabilities.iter().enumerate().skip(1) {
            // Strict comparison keeps the first of equal maxima
            if p > probabilities[best] {
                best = i;
            }
        }

        let style = DrivingStyle::from_index(best).ok_or_else(|| {
            InferenceError::InvalidProbabilities(format!("no label for index {}", best))
        })?;

        Ok(Self {
            style,
            confidence: probabilities[best].clamp(0.0, 1.0),
            probabilities: probabilities.to_vec(),
        })
    }

    /// Output index of the winning label
    pub fn index(&self) -> usize {
        self.style.index()
    }
}
