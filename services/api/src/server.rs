use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryPredictionRepository};
use crate::routes::with_prediction_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use scholar_risk::config::AppConfig;
use scholar_risk::error::AppError;
use scholar_risk::prediction::{FsModelStore, ModelHandle, PredictionService};
use scholar_risk::telemetry::{self, LogSink};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, LogSink::Stdout)?;

    let store = Arc::new(FsModelStore::from_config(&config.models));
    let models = Arc::new(ModelHandle::from_store(store.as_ref()));
    let snapshot = models.snapshot();
    info!(
        loaded = snapshot.is_loaded(),
        version = snapshot.version(),
        "model state initialised"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        models: models.clone(),
    };

    let repository = Arc::new(InMemoryPredictionRepository::default());
    let prediction_service = Arc::new(PredictionService::new(
        models,
        repository,
        store,
        config.history_limit,
    ));

    let app = with_prediction_routes(prediction_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "student risk service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
