use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::Utc;
use scholar_risk::prediction::{
    prediction_router, ModelStore, PredictionRepository, PredictionService,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_prediction_routes<R, S>(service: Arc<PredictionService<R, S>>) -> axum::Router
where
    R: PredictionRepository + 'static,
    S: ModelStore + 'static,
{
    prediction_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck(Extension(state): Extension<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.models.snapshot();
    let model_type = snapshot
        .classifier()
        .map(|classifier| classifier.kind().to_string())
        .unwrap_or_else(|| "None".to_string());

    Json(json!({
        "status": "healthy",
        "ml_models_loaded": snapshot.is_loaded(),
        "model_type": model_type,
        "model_version": snapshot.version(),
        "timestamp": Utc::now(),
    }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
