//! Request-level errors and their HTTP mapping

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::preprocess::ImageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("No file provided")]
    MissingFile,

    #[error("Expected a multipart/form-data upload: {0}")]
    NotMultipart(#[from] MultipartRejection),

    #[error("Invalid multipart body: {0}")]
    Multipart(MultipartError),

    #[error("Upload exceeds the size limit")]
    UploadTooLarge,

    #[error("Invalid image: {0}")]
    Image(#[from] ImageError),

    #[error("Prediction failed: {0}")]
    Inference(String),

    #[error("Prediction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// JSON body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFile => StatusCode::BAD_REQUEST,
            AppError::NotMultipart(e) => e.status(),
            AppError::Multipart(e) => e.status(),
            AppError::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Image(ImageError::TooLarge(..)) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Image(_) => StatusCode::BAD_REQUEST,
            AppError::Inference(_) | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        // The body limit surfaces as a multipart read error
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::UploadTooLarge
        } else {
            AppError::Multipart(e)
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        // `{:#}` keeps the context chain on one line
        AppError::Inference(format!("{:#}", e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Request failed ({}): {}", status, self);

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::MissingFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Image(ImageError::UnsupportedFormat).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Image(ImageError::TooLarge(11, 10)).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::UploadTooLarge.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Inference("boom".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_file_message() {
        assert_eq!(AppError::MissingFile.to_string(), "No file provided");
    }

    #[test]
    fn test_anyhow_context_is_kept() {
        let err = anyhow::anyhow!("shape mismatch").context("Classifier inference failed");
        let app_err = AppError::from(err);
        assert_eq!(
            app_err.to_string(),
            "Prediction failed: Classifier inference failed: shape mismatch"
        );
    }
}
