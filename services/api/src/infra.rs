use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use scholar_risk::prediction::{
    ModelHandle, PredictionId, PredictionRecord, PredictionRepository, PredictionResult,
    RepositoryError, StudentId, StudentInput,
};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) models: Arc<ModelHandle>,
}

#[derive(Default)]
struct Ledger {
    next_student: u64,
    next_prediction: u64,
    records: Vec<PredictionRecord>,
}

/// Process-local prediction store; records are kept in insertion order.
#[derive(Default, Clone)]
pub(crate) struct InMemoryPredictionRepository {
    ledger: Arc<Mutex<Ledger>>,
}

impl InMemoryPredictionRepository {
    fn ledger(&self) -> Result<MutexGuard<'_, Ledger>, RepositoryError> {
        self.ledger
            .lock()
            .map_err(|_| RepositoryError::Unavailable("prediction ledger poisoned".to_string()))
    }
}

impl PredictionRepository for InMemoryPredictionRepository {
    fn save(
        &self,
        student: &StudentInput,
        prediction: &PredictionResult,
        prediction_date: DateTime<Utc>,
    ) -> Result<PredictionRecord, RepositoryError> {
        let mut ledger = self.ledger()?;
        ledger.next_student += 1;
        ledger.next_prediction += 1;

        let record = PredictionRecord {
            prediction_id: PredictionId(ledger.next_prediction.to_string()),
            student_id: StudentId(ledger.next_student.to_string()),
            student: student.clone(),
            prediction: prediction.clone(),
            prediction_date,
        };
        ledger.records.push(record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &PredictionId) -> Result<Option<PredictionRecord>, RepositoryError> {
        let ledger = self.ledger()?;
        Ok(ledger
            .records
            .iter()
            .find(|record| &record.prediction_id == id)
            .cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let ledger = self.ledger()?;
        Ok(ledger.records.iter().rev().take(limit).cloned().collect())
    }
}
