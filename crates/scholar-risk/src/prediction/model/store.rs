use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::forest::ForestClassifier;
use super::{Classifier, ClassifierError};
use crate::config::ModelConfig;
use crate::prediction::domain::{ModelInfo, FEATURE_COUNT};
use crate::prediction::encoding::EncoderTable;

/// Classifier and encoder table from one training run. Always swapped as a unit.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub classifier: Arc<dyn Classifier>,
    pub encoders: EncoderTable,
}

impl ModelArtifacts {
    pub fn new(classifier: Arc<dyn Classifier>, encoders: EncoderTable) -> Self {
        Self {
            classifier,
            encoders,
        }
    }
}

/// Immutable view of the model state at one version.
#[derive(Debug)]
pub struct ModelSnapshot {
    version: u64,
    loaded_at: Option<DateTime<Utc>>,
    artifacts: Option<ModelArtifacts>,
}

impl ModelSnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn is_loaded(&self) -> bool {
        self.artifacts.is_some()
    }

    pub fn classifier(&self) -> Option<&dyn Classifier> {
        self.artifacts
            .as_ref()
            .map(|artifacts| artifacts.classifier.as_ref())
    }

    pub fn encoders(&self) -> Option<&EncoderTable> {
        self.artifacts.as_ref().map(|artifacts| &artifacts.encoders)
    }

    /// Diagnostics for a result produced by the loaded classifier.
    pub fn classifier_info(&self) -> Option<ModelInfo> {
        let classifier = self.classifier()?;
        Some(ModelInfo {
            kind: classifier.kind().to_string(),
            accuracy: classifier.accuracy(),
            features_used: FEATURE_COUNT,
            classes: classifier.classes().to_vec(),
            n_estimators: classifier.n_estimators(),
            version: self.version,
        })
    }

    /// Diagnostics for a result produced by the rule engine.
    pub fn rules_info(&self) -> ModelInfo {
        ModelInfo {
            kind: "SimpleRules".to_string(),
            accuracy: None,
            features_used: FEATURE_COUNT,
            classes: Vec::new(),
            n_estimators: None,
            version: self.version,
        }
    }
}

/// Process-wide, versioned owner of the loaded model.
///
/// Readers clone an `Arc` to the current snapshot and never hold the lock during inference.
/// Writers assemble a complete snapshot first and then replace the pointer, so a classifier
/// is never visible next to another run's encoders.
#[derive(Debug)]
pub struct ModelHandle {
    current: RwLock<Arc<ModelSnapshot>>,
}

impl ModelHandle {
    pub fn new(artifacts: Option<ModelArtifacts>) -> Self {
        let loaded_at = artifacts.as_ref().map(|_| Utc::now());
        Self {
            current: RwLock::new(Arc::new(ModelSnapshot {
                version: 1,
                loaded_at,
                artifacts,
            })),
        }
    }

    pub fn empty() -> Self {
        Self::new(None)
    }

    /// Build the initial handle from a store. Load failures leave the handle empty so the
    /// service still answers through the rule engine.
    pub fn from_store(store: &dyn ModelStore) -> Self {
        match store.load() {
            Ok(artifacts) => Self::new(artifacts),
            Err(err) => {
                warn!(error = %err, "model artifacts failed to load, serving rule-based predictions");
                Self::empty()
            }
        }
    }

    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish new artifacts (or none) as the next version.
    pub fn replace(&self, artifacts: Option<ModelArtifacts>) -> Arc<ModelSnapshot> {
        let loaded_at = artifacts.as_ref().map(|_| Utc::now());
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(ModelSnapshot {
            version: guard.version + 1,
            loaded_at,
            artifacts,
        });
        *guard = next.clone();
        next
    }

    /// Load from the store and swap on success. A failed load keeps the current snapshot.
    pub fn reload_from(&self, store: &dyn ModelStore) -> Result<Arc<ModelSnapshot>, ModelStoreError> {
        let artifacts = store.load()?;
        let snapshot = self.replace(artifacts);
        info!(
            version = snapshot.version(),
            loaded = snapshot.is_loaded(),
            "model artifacts reloaded"
        );
        Ok(snapshot)
    }
}

impl Default for ModelHandle {
    fn default() -> Self {
        Self::empty()
    }
}

/// Source of trained artifacts. `Ok(None)` means no model is available.
pub trait ModelStore: Send + Sync {
    fn load(&self) -> Result<Option<ModelArtifacts>, ModelStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ModelStoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid classifier in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ClassifierError,
    },
}

/// Loads a JSON forest and encoder table from the first existing candidate paths.
#[derive(Debug, Clone)]
pub struct FsModelStore {
    model_paths: Vec<PathBuf>,
    encoder_paths: Vec<PathBuf>,
}

impl FsModelStore {
    pub fn new(model_paths: Vec<PathBuf>, encoder_paths: Vec<PathBuf>) -> Self {
        Self {
            model_paths,
            encoder_paths,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.model_paths.clone(), config.encoder_paths.clone())
    }

    fn first_existing(candidates: &[PathBuf]) -> Option<&Path> {
        candidates
            .iter()
            .map(PathBuf::as_path)
            .find(|path| path.is_file())
    }

    fn read(path: &Path) -> Result<String, ModelStoreError> {
        fs::read_to_string(path).map_err(|source| ModelStoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn load_encoders(&self) -> Result<EncoderTable, ModelStoreError> {
        let Some(path) = Self::first_existing(&self.encoder_paths) else {
            warn!("no encoder table found, default category codes will be used");
            return Ok(EncoderTable::default());
        };

        let raw = Self::read(path)?;
        let table: EncoderTable =
            serde_json::from_str(&raw).map_err(|source| ModelStoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(path = %path.display(), "encoder table loaded");
        Ok(table)
    }
}

impl ModelStore for FsModelStore {
    fn load(&self) -> Result<Option<ModelArtifacts>, ModelStoreError> {
        let Some(path) = Self::first_existing(&self.model_paths) else {
            info!("no classifier artifact found, using fallback predictions");
            return Ok(None);
        };

        let raw = Self::read(path)?;
        let forest = ForestClassifier::from_json(&raw).map_err(|source| ModelStoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        forest.validate().map_err(|source| ModelStoreError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
        if forest.n_features != FEATURE_COUNT {
            return Err(ModelStoreError::Invalid {
                path: path.to_path_buf(),
                source: ClassifierError::ShapeMismatch {
                    expected: FEATURE_COUNT,
                    actual: forest.n_features,
                },
            });
        }
        let encoders = self.load_encoders()?;

        info!(
            path = %path.display(),
            kind = %forest.kind,
            classes = ?forest.classes,
            trees = forest.trees.len(),
            "classifier loaded"
        );

        Ok(Some(ModelArtifacts::new(Arc::new(forest), encoders)))
    }
}
