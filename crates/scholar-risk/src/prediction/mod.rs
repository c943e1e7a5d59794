//! Student academic-risk prediction.
//!
//! A request flows one way through the pipeline: the encoder turns a [`StudentInput`] into a
//! [`FeatureVector`], the resolution policy asks the loaded classifier and falls back to the
//! rule engine on any failure, and the synthesizer and assembler produce the final
//! [`PredictionResult`]. The pipeline itself never fails; persistence and model reloads are
//! handled by [`PredictionService`].

mod assemble;
pub mod domain;
pub mod encoding;
pub mod engine;
pub mod explain;
pub mod fallback;
pub mod model;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Factor, FeatureVector, ModelInfo, PredictionMethod, PredictionResult, RiskLevel,
    RiskProbabilities, StudentInput,
};
pub use encoding::{encode, EncodedField, EncoderTable, LabelEncoder};
pub use engine::{predict_with_snapshot, PredictionEngine};
pub use fallback::{predict_by_rule, RulePrediction};
pub use model::{
    predict_with_model, Classifier, ClassifierError, ForestClassifier, FsModelStore,
    ModelArtifacts, ModelError, ModelHandle, ModelPrediction, ModelSnapshot, ModelStore,
    ModelStoreError,
};
pub use policy::{resolve, Resolution};
pub use repository::{
    PredictionId, PredictionRecord, PredictionRepository, RepositoryError, StudentId,
};
pub use router::prediction_router;
pub use service::{
    ModelDescription, ModelStatus, PredictionOutcome, PredictionResponse, PredictionService,
    PredictionServiceError,
};
