//! Feature Schema Reconciliation
//!
//! The aggregator's output schema can drift from the schema a classifier
//! was trained on. Reconciliation maps any feature vector onto the
//! classifier's ordered names: missing names take
//! [`MISSING_FEATURE_DEFAULT`], extra names are dropped.

use crate::features::FeatureVector;

/// Value used for an expected feature the aggregator did not produce
pub const MISSING_FEATURE_DEFAULT: f64 = 0.0;

/// Values for exactly `expected`, in `expected` order
pub fn reconcile<S: AsRef<str>>(features: &FeatureVector, expected: &[S]) -> Vec<f64> {
    expected
        .iter()
        .map(|name| {
            features
                .get(name.as_ref())
                .unwrap_or(MISSING_FEATURE_DEFAULT)
        })
        .collect()
}

/// Difference between produced and expected feature names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDrift {
    /// Expected by the classifier but not produced
    pub missing: Vec<String>,
    /// Produced but unknown to the classifier
    pub extra: Vec<String>,
}

impl SchemaDrift {
    /// Compare produced names against the classifier's expected names
    pub fn between<P, E>(produced: &[P], expected: &[E]) -> Self
    where
        P: AsRef<str>,
        E: AsRef<str>,
    {
        let missing = expected
            .iter()
            .filter(|e| !produced.iter().any(|p| p.as_ref() == e.as_ref()))
            .map(|e| e.as_ref().to_string())
            .collect();
        let extra = produced
            .iter()
            .filter(|p| !expected.iter().any(|e| e.as_ref() == p.as_ref()))
            .map(|p| p.as_ref().to_string())
            .collect();
        Self { missing, extra }
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}
