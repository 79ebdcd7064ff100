use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use food_calorie_analyzer::config::LogFormat;
use food_calorie_analyzer::{
    create_app, labels, logger, AppState, CalorieTable, Config, OnnxClassifier,
};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            logger::init(LogFormat::Compact);
            error!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    logger::init(config.log_format);

    if let Err(e) = run(config).await {
        error!("❌ {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let labels = match &config.labels_path {
        Some(path) => labels::load_labels(path)?,
        None => labels::builtin_labels(),
    };

    let calories = match &config.calories_path {
        Some(path) => CalorieTable::from_json_file(path)?,
        None => CalorieTable::default(),
    };
    info!("Calorie table ready with {} entries", calories.len());

    let classifier = OnnxClassifier::load(
        &config.model_path,
        labels,
        config.input_size,
        config.layout,
        config.intra_threads,
    )?;

    let state = Arc::new(AppState {
        classifier: Arc::new(classifier),
        calories: Arc::new(calories),
        max_upload_bytes: config.max_upload_bytes,
    });

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!("🚀 Server running on http://{}", config.bind_addr);
    info!("🍔 Open it in your browser to analyze a food photo");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
