//! Pretrained food classifier
//!
//! The model is treated as a black box: a `[1, H, W, 3]` (or `[1, 3, H, W]`)
//! float tensor goes in, one score per class comes out. Inference runs on CPU
//! through ONNX Runtime.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ndarray::Array4;
use ort::ep::CPU as CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info};

use crate::labels::label_for;
use crate::preprocess::TensorLayout;

/// Top-1 classification result
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub label: String,
    pub confidence: f32,
}

/// Anything that can turn a prepared image tensor into a food label.
pub trait Classifier: Send + Sync {
    fn classify(&self, input: &Array4<f32>) -> Result<Prediction>;

    /// Side of the square input the model expects
    fn input_size(&self) -> u32;

    fn layout(&self) -> TensorLayout;
}

/// Index and value of the highest score. NaN scores are ignored.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .fold(None, |best, (i, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((i, score)),
        })
}

/// ONNX Runtime backed classifier
pub struct OnnxClassifier {
    /// `Session::run` needs `&mut`, so requests take turns
    session: Mutex<Session>,
    input_name: String,
    labels: Vec<String>,
    input_size: u32,
    layout: TensorLayout,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("input_name", &self.input_name)
            .field("labels", &self.labels)
            .field("input_size", &self.input_size)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load the model from an ONNX file.
    ///
    /// # Errors
    /// Returns error if the file is missing or ONNX Runtime rejects it.
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        labels: Vec<String>,
        input_size: u32,
        layout: TensorLayout,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Classifier model not found: {}", model_path.display());
        }
        if labels.is_empty() {
            anyhow::bail!("Classifier needs at least one label");
        }

        info!("Loading food classifier from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(ort::Error::<()>::from)
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort::Error::<()>::from)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .map_err(ort::Error::<()>::from)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .context("Model declares no inputs")?;

        if let Some(input) = session.inputs().first() {
            debug!("Classifier expected input: {:?}", input.dtype());
        }

        info!(
            "Food classifier loaded: input '{}', {} labels, {}x{} {:?}",
            input_name,
            labels.len(),
            input_size,
            input_size,
            layout
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            labels,
            input_size,
            layout,
        })
    }

    fn expected_shape(&self) -> [usize; 4] {
        let side = self.input_size as usize;
        match self.layout {
            TensorLayout::Nhwc => [1, side, side, 3],
            TensorLayout::Nchw => [1, 3, side, side],
        }
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, input: &Array4<f32>) -> Result<Prediction> {
        let expected = self.expected_shape();
        if input.shape() != &expected[..] {
            anyhow::bail!(
                "Invalid input shape: {:?}, expected {:?}",
                input.shape(),
                expected
            );
        }

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Classifier session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Classifier inference failed")?;

        let scores = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        debug!("Classifier output shape: {:?}", scores.shape());

        let scores: Vec<f32> = scores.iter().copied().collect();
        let (index, confidence) =
            argmax(&scores).context("Classifier returned no usable scores")?;

        Ok(Prediction {
            index,
            label: label_for(&self.labels, index),
            confidence,
        })
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn layout(&self) -> TensorLayout {
        self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::builtin_labels;

    #[test]
    fn test_argmax_picks_highest() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
    }

    #[test]
    fn test_argmax_first_wins_on_tie() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), Some((0, 0.4)));
    }

    #[test]
    fn test_argmax_empty() {
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_argmax_ignores_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.3, 0.1]), Some((1, 0.3)));
        assert_eq!(argmax(&[f32::NAN]), None);
    }

    #[test]
    fn test_argmax_negative_logits() {
        assert_eq!(argmax(&[-3.0, -1.5, -2.0]), Some((1, -1.5)));
    }

    #[test]
    fn test_load_missing_model() {
        let result = OnnxClassifier::load(
            "/nonexistent/model.onnx",
            builtin_labels(),
            150,
            TensorLayout::Nhwc,
            1,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("not found"), "unexpected error: {}", err);
    }

    #[test]
    fn test_load_requires_labels() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = OnnxClassifier::load(file.path(), Vec::new(), 150, TensorLayout::Nhwc, 1);
        assert!(result.is_err());
    }
}
