use super::domain::{RiskLevel, RiskProbabilities};

/// Output of the rule engine, shaped like a model prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulePrediction {
    pub risk_level: RiskLevel,
    pub probabilities: RiskProbabilities,
    pub confidence: f64,
}

/// Deterministic prediction from the unrounded English average.
///
/// The probability bands are fixed literals consumed downstream; they are not derived from
/// the confidence.
pub fn predict_by_rule(english_average: f64) -> RulePrediction {
    let (risk_level, confidence) = if english_average >= 80.0 {
        (RiskLevel::HighAchiever, 0.9)
    } else if english_average >= 60.0 {
        (RiskLevel::Satisfactory, 0.85)
    } else {
        (RiskLevel::AtRisk, 0.8)
    };

    let probabilities = if english_average >= 80.0 {
        RiskProbabilities::new(0.05, 0.25, 0.70)
    } else if english_average >= 70.0 {
        RiskProbabilities::new(0.15, 0.70, 0.15)
    } else if english_average >= 60.0 {
        RiskProbabilities::new(0.30, 0.60, 0.10)
    } else {
        RiskProbabilities::new(0.70, 0.25, 0.05)
    };

    RulePrediction {
        risk_level,
        probabilities,
        confidence,
    }
}
