use std::path::Path;
use std::sync::Mutex;

use ndarray::Array3;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;

use crate::error::ForecastError;
use crate::model::feature_row::{FeatureVector, FEATURE_DIM};

/// Pre-trained sequence model: a scaled `L x FEATURE_DIM` window in, one
/// scaled price out. Implementations must be deterministic for a fixed input
/// and retain no state between calls that affects forecast correctness.
pub trait SequenceRegressor: Send + Sync {
    fn predict(&self, window: &[FeatureVector]) -> Result<f64, ForecastError>;
}

/// ONNX-backed regressor over the graph exported by the training pipeline.
pub struct OnnxRegressor {
    // `ort` runs take exclusive access to the session; the lock keeps the
    // bundle shareable across concurrent requests.
    session: Mutex<Session>,
    output_name: String,
}

impl OnnxRegressor {
    pub fn load(model_path: &Path) -> Result<Self, ForecastError> {
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            // Single-threaded for determinism.
            .and_then(|b| b.with_intra_threads(1))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| {
                ForecastError::upstream(
                    "regressor",
                    format!("loading {}: {e}", model_path.display()),
                )
            })?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| ForecastError::upstream("regressor", "model declares no outputs"))?;

        tracing::info!(model = %model_path.display(), output = %output_name, "ONNX session ready");

        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

impl SequenceRegressor for OnnxRegressor {
    fn predict(&self, window: &[FeatureVector]) -> Result<f64, ForecastError> {
        let seq_len = window.len();
        let mut input = Array3::<f32>::zeros((1, seq_len, FEATURE_DIM));
        for (t, row) in window.iter().enumerate() {
            for (f, v) in row.iter().enumerate() {
                input[[0, t, f]] = *v as f32;
            }
        }

        let tensor = Value::from_array(input)
            .map_err(|e| ForecastError::upstream("regressor", format!("input tensor: {e}")))?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| ForecastError::upstream("regressor", format!("inference failed: {e}")))?;

        let output = outputs.get(&self.output_name).ok_or_else(|| {
            ForecastError::upstream(
                "regressor",
                format!("output '{}' missing from results", self.output_name),
            )
        })?;
        let (_shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ForecastError::upstream("regressor", format!("output tensor: {e}")))?;

        data.first()
            .copied()
            .map(f64::from)
            .ok_or_else(|| ForecastError::upstream("regressor", "empty output tensor"))
    }
}
