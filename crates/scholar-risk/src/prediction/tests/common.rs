use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::prediction::domain::{PredictionResult, StudentInput};
use crate::prediction::encoding::EncoderTable;
use crate::prediction::model::{
    Classifier, ClassifierError, DecisionTree, ForestClassifier, ModelArtifacts, ModelHandle,
    ModelStore, ModelStoreError, TreeNode,
};
use crate::prediction::repository::{
    PredictionId, PredictionRecord, PredictionRepository, RepositoryError, StudentId,
};
use crate::prediction::service::PredictionService;

/// Classes in the alphabetical order a scikit-learn export produces.
pub(super) const SKLEARN_CLASSES: [&str; 3] = ["at_risk", "high_achiever", "satisfactory"];

pub(super) fn student(writing: f64, reading: f64, speaking: f64) -> StudentInput {
    StudentInput {
        name: Some("Amara Okafor".to_string()),
        age: Some(17.0),
        gender: Some("female".to_string()),
        student_education: Some("secondary".to_string()),
        study_time_per_week: Some("5_to_10".to_string()),
        absences: Some("1_to_5".to_string()),
        attendance_rate: Some(92.0),
        test_prep: Some("prepared".to_string()),
        writing_score: Some(writing),
        reading_score: Some(reading),
        speaking_score: Some(speaking),
        extra_curricular: Some(true),
        internet_access: Some(true),
        tutoring: Some(false),
    }
}

/// Single-tree forest splitting on the English average (feature 5).
pub(super) fn score_forest(kind: &str) -> ForestClassifier {
    ForestClassifier {
        kind: kind.to_string(),
        classes: SKLEARN_CLASSES.iter().map(|class| class.to_string()).collect(),
        n_features: 6,
        trees: vec![DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 5,
                    threshold: 59.999,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf {
                    distribution: vec![8.0, 1.0, 1.0],
                },
                TreeNode::Split {
                    feature: 5,
                    threshold: 79.999,
                    left: 3,
                    right: 4,
                },
                TreeNode::Leaf {
                    distribution: vec![1.0, 1.0, 8.0],
                },
                TreeNode::Leaf {
                    distribution: vec![0.0, 9.0, 1.0],
                },
            ],
        }],
        feature_importances: vec![0.01, 0.02, 0.01, 0.01, 0.08, 0.87],
        metadata: [("test_accuracy".to_string(), Value::from(0.91))]
            .into_iter()
            .collect(),
    }
}

pub(super) fn artifacts(kind: &str, encoders: EncoderTable) -> ModelArtifacts {
    ModelArtifacts::new(Arc::new(score_forest(kind)), encoders)
}

pub(super) fn loaded_handle(kind: &str) -> Arc<ModelHandle> {
    Arc::new(ModelHandle::new(Some(artifacts(kind, EncoderTable::new()))))
}

/// Classifier whose every inference call fails.
#[derive(Debug)]
pub(super) struct BrokenClassifier {
    classes: Vec<String>,
}

impl Default for BrokenClassifier {
    fn default() -> Self {
        Self {
            classes: SKLEARN_CLASSES.iter().map(|class| class.to_string()).collect(),
        }
    }
}

impl Classifier for BrokenClassifier {
    fn kind(&self) -> &str {
        "Broken"
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        6
    }

    fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        Err(ClassifierError::Corrupted("weights truncated".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<Vec<PredictionRecord>>,
    sequence: AtomicU64,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl PredictionRepository for MemoryRepository {
    fn save(
        &self,
        student: &StudentInput,
        prediction: &PredictionResult,
        prediction_date: DateTime<Utc>,
    ) -> Result<PredictionRecord, RepositoryError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let record = PredictionRecord {
            prediction_id: PredictionId(format!("prediction-{id:06}")),
            student_id: StudentId(format!("student-{id:06}")),
            student: student.clone(),
            prediction: prediction.clone(),
            prediction_date,
        };
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .push(record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &PredictionId) -> Result<Option<PredictionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|record| &record.prediction_id == id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

pub(super) struct UnavailableRepository;

impl PredictionRepository for UnavailableRepository {
    fn save(
        &self,
        _student: &StudentInput,
        _prediction: &PredictionResult,
        _prediction_date: DateTime<Utc>,
    ) -> Result<PredictionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &PredictionId) -> Result<Option<PredictionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<PredictionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Store that hands out a fixed artifact set (or none).
pub(super) struct StaticStore(pub(super) Option<ModelArtifacts>);

impl ModelStore for StaticStore {
    fn load(&self) -> Result<Option<ModelArtifacts>, ModelStoreError> {
        Ok(self.0.clone())
    }
}

pub(super) struct FailingStore;

impl ModelStore for FailingStore {
    fn load(&self) -> Result<Option<ModelArtifacts>, ModelStoreError> {
        Err(ModelStoreError::Io {
            path: PathBuf::from("data/models/student-model.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        })
    }
}

pub(super) fn build_service<S: ModelStore + 'static>(
    models: Arc<ModelHandle>,
    store: S,
) -> (
    PredictionService<MemoryRepository, S>,
    Arc<MemoryRepository>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let service = PredictionService::new(models, repository.clone(), Arc::new(store), 5);
    (service, repository)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
