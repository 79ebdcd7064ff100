//! Food Calorie Analyzer
//!
//! Classifies an uploaded food photo with a pretrained ONNX model and reports
//! an approximate calorie count from a fixed table.

pub mod calories;
pub mod classifier;
pub mod config;
pub mod error;
pub mod labels;
pub mod logger;
pub mod preprocess;
pub mod server;

pub use calories::CalorieTable;
pub use classifier::{Classifier, OnnxClassifier, Prediction};
pub use config::Config;
pub use error::AppError;
pub use server::{create_app, AppState, PredictResponse};
