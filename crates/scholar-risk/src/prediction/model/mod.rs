//! Trained-classifier seam: the [`Classifier`] trait, the adapter that turns its raw output
//! into a labelled prediction, and the artifact store that loads and swaps classifiers.

mod forest;
mod store;

use std::collections::BTreeMap;
use std::fmt;

use super::domain::FeatureVector;

pub use forest::{DecisionTree, ForestClassifier, TreeNode};
pub use store::{FsModelStore, ModelArtifacts, ModelHandle, ModelSnapshot, ModelStore, ModelStoreError};

/// Metadata keys probed, in order, for a reported accuracy.
pub(crate) const ACCURACY_KEYS: [&str; 5] = [
    "accuracy",
    "test_accuracy",
    "testing_accuracy",
    "training_accuracy",
    "model_accuracy",
];

/// A trained multi-class classifier. The label set belongs to the artifact.
pub trait Classifier: Send + Sync + fmt::Debug {
    fn kind(&self) -> &str;
    fn classes(&self) -> &[String];
    fn n_features(&self) -> usize;

    /// One probability per entry of [`Classifier::classes`], in the same order.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError>;

    fn feature_importances(&self) -> &[f64] {
        &[]
    }

    fn n_estimators(&self) -> Option<usize> {
        None
    }

    fn accuracy(&self) -> Option<f64> {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("expected {expected} features, received {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("corrupted artifact: {0}")]
    Corrupted(String),
}

/// Failure kinds of the model path. Both are recovered by falling back to rules.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("no trained classifier is loaded")]
    Unavailable,
    #[error("model inference failed: {0}")]
    Inference(String),
}

/// Classifier output keyed by label name.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPrediction {
    pub label: String,
    pub probability_by_label: BTreeMap<String, f64>,
    pub confidence: f64,
}

pub fn predict_with_model(
    classifier: Option<&dyn Classifier>,
    features: &FeatureVector,
) -> Result<ModelPrediction, ModelError> {
    let classifier = classifier.ok_or(ModelError::Unavailable)?;

    let probabilities = classifier
        .predict_proba(&features.to_array())
        .map_err(|err| ModelError::Inference(err.to_string()))?;

    let classes = classifier.classes();
    if probabilities.len() != classes.len() {
        return Err(ModelError::Inference(format!(
            "classifier returned {} probabilities for {} classes",
            probabilities.len(),
            classes.len()
        )));
    }
    if probabilities
        .iter()
        .any(|value| !value.is_finite() || *value < 0.0)
    {
        return Err(ModelError::Inference(
            "classifier returned a non-finite or negative probability".to_string(),
        ));
    }

    let mut best = 0;
    for (index, value) in probabilities.iter().enumerate() {
        if *value > probabilities[best] {
            best = index;
        }
    }
    let label = classes
        .get(best)
        .cloned()
        .ok_or_else(|| ModelError::Inference("classifier has no classes".to_string()))?;

    let probability_by_label = classes
        .iter()
        .cloned()
        .zip(probabilities.iter().copied())
        .collect();

    Ok(ModelPrediction {
        label,
        probability_by_label,
        confidence: probabilities[best],
    })
}
