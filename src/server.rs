//! HTTP surface: the browser page and the inference endpoint

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::calories::CalorieTable;
use crate::classifier::{Classifier, Prediction};
use crate::error::AppError;
use crate::preprocess::{decode_image_bytes, to_input_tensor, ImageInfo};

/// Multipart field carrying the uploaded image
pub const FILE_FIELD: &str = "file";

/// Room for multipart boundaries and part headers on top of the image itself
const MULTIPART_OVERHEAD: usize = 16 * 1024;

const INDEX_HTML: &str = include_str!("index.html");

pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub calories: Arc<CalorieTable>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PredictResponse {
    pub food: String,
    pub calories: u32,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub fn create_app(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// POST /predict - classify an uploaded food image
///
/// Expects a multipart form with the image in the `file` field. Other fields
/// are ignored. Responds with `{"food": <label>, "calories": <number>}`.
///
/// # Errors
/// - 400: no `file` field, empty file, non-multipart request or undecodable image
/// - 413: image or request body above the upload limit
/// - 500: model inference failed
async fn predict(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let start = Instant::now();
    let mut multipart = multipart?;

    let data = read_file_field(&mut multipart).await?;
    debug!("Received upload: {} bytes", data.len());

    let classifier = Arc::clone(&state.classifier);
    let max_bytes = state.max_upload_bytes;

    // Decoding, resizing and inference are CPU bound
    let (prediction, image_info) = tokio::task::spawn_blocking(
        move || -> Result<(Prediction, ImageInfo), AppError> {
            let (image, image_info) = decode_image_bytes(&data, max_bytes)?;
            let tensor = to_input_tensor(&image, classifier.input_size(), classifier.layout());
            let prediction = classifier.classify(&tensor)?;
            Ok((prediction, image_info))
        },
    )
    .await??;

    let calories = state.calories.lookup(&prediction.label);

    info!(
        "Predicted {} ({:.2}) -> {} kcal for {}x{} {:?} image in {}ms",
        prediction.label,
        prediction.confidence,
        calories,
        image_info.width,
        image_info.height,
        image_info.format,
        start.elapsed().as_millis()
    );

    Ok(Json(PredictResponse {
        food: prediction.label,
        calories,
    }))
}

/// Bytes of the first `file` field; a missing or empty field counts as no file.
async fn read_file_field(multipart: &mut Multipart) -> Result<Bytes, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(AppError::MissingFile);
        }
        return Ok(data);
    }

    Err(AppError::MissingFile)
}
