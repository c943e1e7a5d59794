use std::sync::Arc;

use tracing::debug;

use super::assemble::assemble;
use super::domain::{PredictionMethod, PredictionResult, StudentInput};
use super::encoding::encode;
use super::explain::complete;
use super::model::{ModelHandle, ModelSnapshot};
use super::policy::resolve;

/// Runs encode → resolve → explain → assemble against the current model snapshot.
#[derive(Debug, Clone)]
pub struct PredictionEngine {
    models: Arc<ModelHandle>,
}

impl PredictionEngine {
    pub fn new(models: Arc<ModelHandle>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &Arc<ModelHandle> {
        &self.models
    }

    pub fn predict(&self, input: &StudentInput) -> PredictionResult {
        let snapshot = self.models.snapshot();
        predict_with_snapshot(&snapshot, input)
    }
}

/// Produce a complete result from one consistent snapshot. Never fails.
pub fn predict_with_snapshot(snapshot: &ModelSnapshot, input: &StudentInput) -> PredictionResult {
    let features = encode(input, snapshot.encoders());
    let mut resolution = resolve(snapshot.classifier(), &features);

    let explanation = complete(
        input,
        features.english_average,
        resolution.risk_level,
        resolution.factors.take(),
        resolution.recommendations.take(),
    );

    let model_info = match resolution.method {
        PredictionMethod::Model => snapshot
            .classifier_info()
            .unwrap_or_else(|| snapshot.rules_info()),
        PredictionMethod::Fallback => snapshot.rules_info(),
    };

    debug!(
        student = input.display_name(),
        method = resolution.method.label(),
        risk_level = %resolution.risk_level,
        version = snapshot.version(),
        "prediction assembled"
    );

    assemble(
        features.english_average,
        resolution,
        explanation,
        model_info,
        snapshot.is_loaded(),
    )
}
