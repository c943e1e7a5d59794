use tracing::{debug, warn};

use super::domain::{Factor, FeatureVector, PredictionMethod, RiskLevel, RiskProbabilities};
use super::fallback::predict_by_rule;
use super::model::{predict_with_model, Classifier, ModelError, ModelPrediction};

/// Raw outcome of resolution, before explanations are synthesized.
///
/// `factors` and `recommendations` are only set when the producing path supplied its own;
/// the synthesizer fills whatever is left empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub probabilities: RiskProbabilities,
    pub method: PredictionMethod,
    pub factors: Option<Vec<Factor>>,
    pub recommendations: Option<Vec<String>>,
}

/// Try the classifier once; on any failure, resolve through the rule engine.
///
/// The model attempt is never retried within a call and this function cannot fail.
pub fn resolve(classifier: Option<&dyn Classifier>, features: &FeatureVector) -> Resolution {
    match attempt_model(classifier, features) {
        Ok(resolution) => {
            debug!(
                risk_level = %resolution.risk_level,
                confidence = resolution.confidence,
                "resolved with classifier"
            );
            resolution
        }
        Err(err) => {
            warn!(error = %err, "classifier failed, resolving with rules");
            resolve_by_rule(features.english_average)
        }
    }
}

fn attempt_model(
    classifier: Option<&dyn Classifier>,
    features: &FeatureVector,
) -> Result<Resolution, ModelError> {
    let prediction = predict_with_model(classifier, features)?;
    normalize_model_prediction(&prediction)
}

/// Project a classifier prediction onto the three risk levels by label name.
pub(crate) fn normalize_model_prediction(
    prediction: &ModelPrediction,
) -> Result<Resolution, ModelError> {
    let risk_level = RiskLevel::from_label(&prediction.label).ok_or_else(|| {
        ModelError::Inference(format!(
            "classifier predicted unrecognised label '{}'",
            prediction.label
        ))
    })?;

    let mass = |level: RiskLevel| {
        prediction
            .probability_by_label
            .get(level.label())
            .copied()
            .unwrap_or(0.0)
    };
    let probabilities = RiskProbabilities::new(
        mass(RiskLevel::AtRisk),
        mass(RiskLevel::Satisfactory),
        mass(RiskLevel::HighAchiever),
    )
    .normalized()
    .ok_or_else(|| {
        ModelError::Inference("classifier assigned no probability to any risk level".to_string())
    })?;

    Ok(Resolution {
        risk_level,
        confidence: probabilities.get(risk_level),
        probabilities,
        method: PredictionMethod::Model,
        factors: None,
        recommendations: None,
    })
}

fn resolve_by_rule(english_average: f64) -> Resolution {
    let rule = predict_by_rule(english_average);
    Resolution {
        risk_level: rule.risk_level,
        confidence: rule.confidence,
        probabilities: rule.probabilities,
        method: PredictionMethod::Fallback,
        factors: None,
        recommendations: None,
    }
}
