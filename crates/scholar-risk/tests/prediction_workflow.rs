use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use scholar_risk::prediction::{
    FsModelStore, ModelHandle, ModelStore, ModelStoreError, PredictionEngine, PredictionMethod,
    RiskLevel, StudentInput,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("scholar-risk-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("scratch dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("scratch file written");
    path
}

fn fixture_store() -> FsModelStore {
    FsModelStore::new(
        vec![PathBuf::from("missing/student-model.json"), fixture("student-model.json")],
        vec![fixture("encoders.json")],
    )
}

fn student(json: serde_json::Value) -> StudentInput {
    serde_json::from_value(json).expect("student payload parses")
}

#[test]
fn exported_forest_predicts_through_the_model_path() {
    let engine = PredictionEngine::new(Arc::new(ModelHandle::from_store(&fixture_store())));

    let strong = engine.predict(&student(serde_json::json!({
        "gender": "male",
        "studentEducation": "masters",
        "studyTimePerWeek": "more_than_10",
        "absences": "none",
        "attendanceRate": 96,
        "testPrep": "prepared",
        "writingScore": 90,
        "readingScore": 85,
        "speakingScore": 80
    })));
    assert_eq!(strong.prediction_method, PredictionMethod::Model);
    assert_eq!(strong.risk_level, RiskLevel::HighAchiever);
    assert_eq!(strong.model_info.n_estimators, Some(3));
    assert_eq!(strong.model_info.accuracy, Some(0.912));
    assert!((strong.probabilities.total() - 1.0).abs() < 1e-6);
    assert!(strong.confidence > 0.8);

    let weak = engine.predict(&student(serde_json::json!({
        "studyTimePerWeek": "less_than_2",
        "writingScore": 40,
        "readingScore": 45,
        "speakingScore": 35
    })));
    assert_eq!(weak.prediction_method, PredictionMethod::Model);
    assert_eq!(weak.risk_level, RiskLevel::AtRisk);
    assert_eq!(weak.english_average, 40.0);
    assert_eq!(
        weak.recommendations.last().map(String::as_str),
        Some("Focus on basic grammar and vocabulary building")
    );
}

#[test]
fn missing_artifacts_leave_the_rule_engine_in_charge() {
    let store = FsModelStore::new(
        vec![PathBuf::from("nowhere/student-model.json")],
        vec![PathBuf::from("nowhere/encoders.json")],
    );
    assert!(store.load().expect("absent model is not an error").is_none());

    let engine = PredictionEngine::new(Arc::new(ModelHandle::from_store(&store)));
    let result = engine.predict(&student(serde_json::json!({
        "writingScore": 60,
        "readingScore": 70,
        "speakingScore": 65
    })));

    assert_eq!(result.prediction_method, PredictionMethod::Fallback);
    assert_eq!(result.risk_level, RiskLevel::Satisfactory);
    assert_eq!(result.confidence, 0.85);
    assert!(!result.model_loaded);
}

#[test]
fn model_without_encoder_file_uses_default_maps() {
    let store = FsModelStore::new(
        vec![fixture("student-model.json")],
        vec![PathBuf::from("nowhere/encoders.json")],
    );

    let artifacts = store
        .load()
        .expect("model loads")
        .expect("model present");
    assert!(artifacts.encoders.is_empty());
}

#[test]
fn malformed_artifact_is_rejected_and_reload_keeps_current_model() {
    let broken = scratch_file("broken-model.json", "{ \"classes\": [\"at_risk\"");
    let broken_store = FsModelStore::new(vec![broken], Vec::new());

    match broken_store.load() {
        Err(ModelStoreError::Parse { .. }) => {}
        other => panic!("expected parse failure, got {other:?}"),
    }

    let models = ModelHandle::from_store(&fixture_store());
    assert!(models.snapshot().is_loaded());

    assert!(models.reload_from(&broken_store).is_err());
    let snapshot = models.snapshot();
    assert!(snapshot.is_loaded());
    assert_eq!(snapshot.version(), 1);
}

#[test]
fn structurally_invalid_forest_is_rejected() {
    let invalid = scratch_file(
        "invalid-model.json",
        r#"{
            "classes": ["at_risk", "high_achiever", "satisfactory"],
            "n_features": 6,
            "trees": [{ "nodes": [
                { "kind": "split", "feature": 5, "threshold": 60.0, "left": 1, "right": 7 },
                { "kind": "leaf", "distribution": [1, 0, 0] }
            ]}]
        }"#,
    );
    let store = FsModelStore::new(vec![invalid], Vec::new());

    match store.load() {
        Err(ModelStoreError::Invalid { .. }) => {}
        other => panic!("expected invalid artifact, got {other:?}"),
    }
}

#[test]
fn forest_trained_on_a_different_feature_layout_is_rejected() {
    let wide = scratch_file(
        "wide-model.json",
        r#"{
            "classes": ["at_risk", "high_achiever", "satisfactory"],
            "n_features": 7,
            "trees": [{ "nodes": [
                { "kind": "leaf", "distribution": [1, 0, 0] }
            ]}]
        }"#,
    );
    let store = FsModelStore::new(vec![wide], Vec::new());

    match store.load() {
        Err(ModelStoreError::Invalid { .. }) => {}
        other => panic!("expected invalid artifact, got {other:?}"),
    }

    let models = ModelHandle::from_store(&store);
    assert!(!models.snapshot().is_loaded());
}
