//! Classifier interface

use crate::InferenceError;

/// A trained model scoring feature vectors against the driving-style labels
pub trait StyleClassifier {
    /// Feature names the model was trained on, in input order
    fn feature_names(&self) -> &[String];

    /// Probability per label index for one feature vector.
    ///
    /// `features` must follow [`StyleClassifier::feature_names`] order.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;
}
