use clap::Args;
use scholar_risk::config::AppConfig;
use scholar_risk::error::AppError;
use scholar_risk::prediction::{
    FsModelStore, ModelDescription, ModelHandle, PredictionEngine, PredictionResult,
    StudentInput,
};
use scholar_risk::telemetry::{self, LogSink};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    /// CSV export with one student per row (camelCase headers, e.g. writingScore)
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Emit the full results as JSON instead of a summary table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchRow {
    pub(crate) row: usize,
    pub(crate) name: String,
    #[serde(flatten)]
    pub(crate) result: PredictionResult,
}

pub(crate) fn run_batch_predict(args: PredictArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogSink::Stderr)?;

    let store = FsModelStore::from_config(&config.models);
    let engine = PredictionEngine::new(Arc::new(ModelHandle::from_store(&store)));

    let file = std::fs::File::open(&args.csv)?;
    let rows = predict_rows(file, &engine)?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&rows)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{rendered}");
    } else {
        print!("{}", render_table(&rows));
    }
    Ok(())
}

/// Predict each CSV row through the same pipeline the HTTP service uses. Nothing is stored.
pub(crate) fn predict_rows<R: Read>(
    reader: R,
    engine: &PredictionEngine,
) -> Result<Vec<BatchRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in csv_reader.deserialize::<StudentInput>().enumerate() {
        let student = record?;
        rows.push(BatchRow {
            row: index + 1,
            name: student.display_name().to_string(),
            result: engine.predict(&student),
        });
    }
    Ok(rows)
}

fn render_table(rows: &[BatchRow]) -> String {
    let mut output = format!(
        "{:<5} {:<24} {:<14} {:>10} {:>8} {:<8}\n",
        "row", "name", "risk level", "confidence", "average", "method"
    );
    for row in rows {
        output.push_str(&format!(
            "{:<5} {:<24} {:<14} {:>10.2} {:>8.1} {:<8}\n",
            row.row,
            row.name,
            row.result.risk_level.label(),
            row.result.confidence,
            row.result.english_average,
            row.result.prediction_method.label(),
        ));
    }
    output
}

pub(crate) fn run_model_info() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogSink::Stderr)?;

    let store = FsModelStore::from_config(&config.models);
    let models = ModelHandle::empty();
    let snapshot = models.reload_from(&store)?;

    println!("{}", describe(&ModelDescription::from_snapshot(&snapshot)));
    Ok(())
}

fn describe(description: &ModelDescription) -> String {
    match description {
        ModelDescription::Loaded {
            model_type,
            n_estimators,
            classes,
            n_features,
            accuracy,
            ..
        } => {
            let mut lines = vec![
                format!("Model: {model_type}"),
                format!("Classes: {}", classes.join(", ")),
                format!("Features: {n_features}"),
            ];
            if let Some(trees) = n_estimators {
                lines.push(format!("Estimators: {trees}"));
            }
            if let Some(accuracy) = accuracy {
                lines.push(format!("Accuracy: {:.1}%", accuracy * 100.0));
            }
            lines.join("\n")
        }
        ModelDescription::NotLoaded { message, .. } => {
            format!("Model: not loaded ({message}); rule-based predictions will be served")
        }
    }
}
