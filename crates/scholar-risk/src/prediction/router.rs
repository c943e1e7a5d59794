use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::StudentInput;
use super::model::ModelStore;
use super::repository::{PredictionId, PredictionRepository, RepositoryError};
use super::service::{PredictionService, PredictionServiceError};

/// Router builder exposing prediction, history, and model management endpoints.
pub fn prediction_router<R, S>(service: Arc<PredictionService<R, S>>) -> Router
where
    R: PredictionRepository + 'static,
    S: ModelStore + 'static,
{
    Router::new()
        .route("/api/predict", post(predict_handler::<R, S>))
        .route("/api/predictions", get(history_handler::<R, S>))
        .route(
            "/api/predictions/:prediction_id",
            get(prediction_handler::<R, S>),
        )
        .route("/api/model-info", get(model_info_handler::<R, S>))
        .route("/api/reload-models", post(reload_handler::<R, S>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HistoryQuery {
    limit: Option<usize>,
}

pub(crate) async fn predict_handler<R, S>(
    State(service): State<Arc<PredictionService<R, S>>>,
    axum::Json(input): axum::Json<StudentInput>,
) -> Response
where
    R: PredictionRepository + 'static,
    S: ModelStore + 'static,
{
    match service.predict(input) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome.response())).into_response(),
        Err(err) => {
            error!(error = %err, "prediction could not be stored");
            let payload = json!({
                "error": err.to_string(),
                "success": false,
                "message": "Prediction failed",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn prediction_handler<R, S>(
    State(service): State<Arc<PredictionService<R, S>>>,
    Path(prediction_id): Path<String>,
) -> Response
where
    R: PredictionRepository + 'static,
    S: ModelStore + 'static,
{
    let id = PredictionId(prediction_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(PredictionServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "error": "prediction not found",
                "prediction_id": id.0,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn history_handler<R, S>(
    State(service): State<Arc<PredictionService<R, S>>>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    R: PredictionRepository + 'static,
    S: ModelStore + 'static,
{
    match service.history(query.limit) {
        Ok(records) => {
            let payload = json!({
                "success": true,
                "count": records.len(),
                "predictions": records,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn model_info_handler<R, S>(
    State(service): State<Arc<PredictionService<R, S>>>,
) -> Response
where
    R: PredictionRepository + 'static,
    S: ModelStore + 'static,
{
    let payload = json!({
        "success": true,
        "model_info": service.model_description(),
        "timestamp": Utc::now(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn reload_handler<R, S>(
    State(service): State<Arc<PredictionService<R, S>>>,
) -> Response
where
    R: PredictionRepository + 'static,
    S: ModelStore + 'static,
{
    match service.reload() {
        Ok(description) => {
            let payload = json!({
                "success": true,
                "message": "ML models reloaded",
                "model_loaded": description.is_loaded(),
                "version": description.version(),
                "timestamp": Utc::now(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

fn internal_error(err: PredictionServiceError) -> Response {
    let payload = json!({
        "error": err.to_string(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
