use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{PredictionMethod, PredictionResult, StudentInput};
use super::engine::{predict_with_snapshot, PredictionEngine};
use super::model::{ModelHandle, ModelSnapshot, ModelStore, ModelStoreError};
use super::repository::{
    PredictionId, PredictionRecord, PredictionRepository, RepositoryError, StudentId,
};

/// Service composing the prediction engine, the artifact store, and persistence.
pub struct PredictionService<R, S> {
    engine: PredictionEngine,
    repository: Arc<R>,
    store: Arc<S>,
    history_limit: usize,
}

impl<R, S> PredictionService<R, S>
where
    R: PredictionRepository + 'static,
    S: ModelStore + 'static,
{
    pub fn new(
        models: Arc<ModelHandle>,
        repository: Arc<R>,
        store: Arc<S>,
        history_limit: usize,
    ) -> Self {
        Self {
            engine: PredictionEngine::new(models),
            repository,
            store,
            history_limit,
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Predict, persist, and attach the assigned identifiers.
    pub fn predict(&self, input: StudentInput) -> Result<PredictionOutcome, PredictionServiceError> {
        let snapshot = self.engine.models().snapshot();
        let result = predict_with_snapshot(&snapshot, &input);
        let record = self.repository.save(&input, &result, Utc::now())?;

        info!(
            student = input.display_name(),
            prediction_id = %record.prediction_id.0,
            risk_level = %result.risk_level,
            method = result.prediction_method.label(),
            "prediction stored"
        );

        Ok(PredictionOutcome {
            model_status: ModelStatus::from_snapshot(&snapshot, result.prediction_method),
            record,
        })
    }

    pub fn get(&self, id: &PredictionId) -> Result<PredictionRecord, PredictionServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Recent predictions, newest first. `limit` is capped at the configured history limit.
    pub fn history(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<PredictionRecord>, PredictionServiceError> {
        let limit = limit
            .unwrap_or(self.history_limit)
            .min(self.history_limit);
        Ok(self.repository.recent(limit)?)
    }

    pub fn model_description(&self) -> ModelDescription {
        ModelDescription::from_snapshot(&self.engine.models().snapshot())
    }

    /// Reload artifacts from the store. A failed load leaves the live snapshot untouched.
    pub fn reload(&self) -> Result<ModelDescription, PredictionServiceError> {
        match self.engine.models().reload_from(self.store.as_ref()) {
            Ok(snapshot) => Ok(ModelDescription::from_snapshot(&snapshot)),
            Err(err) => {
                warn!(error = %err, "model reload failed, keeping current artifacts");
                Err(err.into())
            }
        }
    }
}

/// Result of a persisted prediction together with the model state that produced it.
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub record: PredictionRecord,
    pub model_status: ModelStatus,
}

impl PredictionOutcome {
    pub fn response(&self) -> PredictionResponse {
        PredictionResponse {
            success: true,
            prediction: StoredPrediction {
                result: self.record.prediction.clone(),
                student_id: self.record.student_id.clone(),
                prediction_id: self.record.prediction_id.clone(),
            },
            database_saved: true,
            prediction_date: self.record.prediction_date,
            model_status: self.model_status.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub prediction: StoredPrediction,
    pub database_saved: bool,
    pub prediction_date: DateTime<Utc>,
    pub model_status: ModelStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredPrediction {
    #[serde(flatten)]
    pub result: PredictionResult,
    pub student_id: StudentId,
    pub prediction_id: PredictionId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub loaded: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub method_used: PredictionMethod,
}

impl ModelStatus {
    fn from_snapshot(snapshot: &ModelSnapshot, method_used: PredictionMethod) -> Self {
        Self {
            loaded: snapshot.is_loaded(),
            kind: snapshot
                .classifier()
                .map(|classifier| classifier.kind().to_string())
                .unwrap_or_else(|| "Fallback".to_string()),
            method_used,
        }
    }
}

/// Description of the live model state, as exposed by `/api/model-info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelDescription {
    Loaded {
        model_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        n_estimators: Option<usize>,
        classes: Vec<String>,
        n_classes: usize,
        n_features: usize,
        feature_importance: Vec<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        accuracy: Option<f64>,
        version: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        loaded_at: Option<DateTime<Utc>>,
    },
    NotLoaded {
        message: String,
        version: u64,
    },
}

impl ModelDescription {
    pub fn from_snapshot(snapshot: &ModelSnapshot) -> Self {
        match snapshot.classifier() {
            Some(classifier) => Self::Loaded {
                model_type: classifier.kind().to_string(),
                n_estimators: classifier.n_estimators(),
                classes: classifier.classes().to_vec(),
                n_classes: classifier.classes().len(),
                n_features: classifier.n_features(),
                feature_importance: classifier.feature_importances().to_vec(),
                accuracy: classifier.accuracy(),
                version: snapshot.version(),
                loaded_at: snapshot.loaded_at(),
            },
            None => Self::NotLoaded {
                message: "ML model not loaded or available".to_string(),
                version: snapshot.version(),
            },
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    pub fn version(&self) -> u64 {
        match self {
            Self::Loaded { version, .. } | Self::NotLoaded { version, .. } => *version,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PredictionServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    ModelStore(#[from] ModelStoreError),
}
