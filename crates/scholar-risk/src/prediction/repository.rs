use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{PredictionResult, StudentInput};

/// Opaque identifier of a persisted student.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Opaque identifier of a persisted prediction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictionId(pub String);

/// Stored prediction together with the student snapshot it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub prediction_id: PredictionId,
    pub student_id: StudentId,
    pub student: StudentInput,
    pub prediction: PredictionResult,
    pub prediction_date: DateTime<Utc>,
}

/// Storage abstraction so the service can be exercised without a database.
///
/// Implementations assign both identifiers on `save`.
pub trait PredictionRepository: Send + Sync {
    fn save(
        &self,
        student: &StudentInput,
        prediction: &PredictionResult,
        prediction_date: DateTime<Utc>,
    ) -> Result<PredictionRecord, RepositoryError>;
    fn fetch(&self, id: &PredictionId) -> Result<Option<PredictionRecord>, RepositoryError>;
    /// Newest first, at most `limit` records.
    fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
