use super::domain::{round_to_tenth, ModelInfo, PredictionResult};
use super::explain::Explanation;
use super::policy::Resolution;

/// Merge the pipeline stages into the response record.
pub fn assemble(
    english_average: f64,
    resolution: Resolution,
    explanation: Explanation,
    model_info: ModelInfo,
    model_loaded: bool,
) -> PredictionResult {
    let score = round_to_tenth(english_average);

    PredictionResult {
        risk_level: resolution.risk_level,
        confidence: resolution.confidence,
        probabilities: resolution.probabilities,
        predicted_score: score,
        english_average: score,
        factors: explanation.factors,
        recommendations: explanation.recommendations,
        prediction_method: resolution.method,
        model_info,
        model_loaded,
    }
}
