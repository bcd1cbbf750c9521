//! Change-intensity engines: a model-backed ONNX engine and the
//! deterministic pixel-difference fallback.
//!
//! The engine is selected once at startup. Model load failures are logged
//! and reported as absence, never as a hard error; the detector then runs
//! on the difference engine for the life of the process.

use crate::errors::PipelineError;
use crate::normalize::NormalizedImage;
use crate::scalar_map::{self, ScalarMap};
use log::{debug, info, warn};
use ndarray::{Array2, Array4};
use ort::{
    execution_providers::CPUExecutionProvider,
    session::Session,
    value::Value,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Environment variable consulted when no model path is given on the CLI.
pub const MODEL_PATH_ENV: &str = "RESQ_CHANGE_MODEL_PATH";

/// Fixed subtraction threshold of the difference engine.
pub const DIFFERENCE_THRESHOLD: f32 = 0.15;

const CONFIDENCE_SCALE: f32 = 1.2;

/// Pixel-wise change-intensity algorithm over a pre/post pair.
///
/// Implementations return a raw (un-normalized) map; the shared
/// post-processing in `change_detection` normalizes it and derives the
/// change percentage.
pub trait ChangeEngine: Send + Sync {
    /// Model identifier reported in results.
    fn name(&self) -> &str;

    /// Raw change-intensity map, same dimensions as the inputs.
    fn change_map(
        &self,
        pre: &NormalizedImage,
        post: &NormalizedImage,
    ) -> Result<ScalarMap, PipelineError>;

    /// Confidence derived from the raw and normalized maps.
    fn confidence(&self, raw: &ScalarMap, normalized: &ScalarMap) -> f32;
}

/// Always-available fallback: mean absolute channel difference with a fixed
/// threshold subtracted and the remainder rescaled to `[0, 1]`.
pub struct DifferenceEngine;

impl ChangeEngine for DifferenceEngine {
    fn name(&self) -> &str {
        "DifferenceAnalysis"
    }

    fn change_map(
        &self,
        pre: &NormalizedImage,
        post: &NormalizedImage,
    ) -> Result<ScalarMap, PipelineError> {
        let (h, w) = (pre.height(), pre.width());
        let mut out = Array2::<f32>::zeros((h, w));
        for y in 0..h {
            for x in 0..w {
                let a = pre.pixel(y, x);
                let b = post.pixel(y, x);
                let diff = ((a[0] - b[0]).abs() + (a[1] - b[1]).abs() + (a[2] - b[2]).abs()) / 3.0;
                out[[y, x]] =
                    ((diff - DIFFERENCE_THRESHOLD) / (1.0 - DIFFERENCE_THRESHOLD)).clamp(0.0, 1.0);
            }
        }
        Ok(out)
    }

    fn confidence(&self, _raw: &ScalarMap, normalized: &ScalarMap) -> f32 {
        let changed_mean = scalar_map::mean_above(normalized, 0.5);
        (changed_mean * CONFIDENCE_SCALE).min(1.0)
    }
}

/// Owned handle to a successfully loaded change-detection model.
pub struct LoadedModel {
    session: Session,
    name: String,
}

/// Best-effort, one-time model load. Returns `None` when no model is
/// configured or loading fails; the failure is logged and never retried
/// per request.
pub fn load_change_model(path: Option<&Path>) -> Option<LoadedModel> {
    let path: PathBuf = match path {
        Some(p) => p.to_path_buf(),
        None => match std::env::var(MODEL_PATH_ENV) {
            Ok(p) => PathBuf::from(p),
            Err(_) => {
                debug!("no change model configured, using difference analysis");
                return None;
            }
        },
    };

    match build_session(&path) {
        Ok(session) => {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "onnx-change-model".to_string());
            info!("✅ Change model loaded: {} ({})", name, path.display());
            Some(LoadedModel { session, name })
        }
        Err(e) => {
            warn!(
                "⚠️  Failed to load change model from {}: {e} - falling back to difference analysis",
                path.display()
            );
            None
        }
    }
}

fn build_session(path: &Path) -> Result<Session, PipelineError> {
    let bytes = std::fs::read(path)?;
    Session::builder()
        .map_err(|e| PipelineError::ModelUnavailable(format!("session builder: {e}")))?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .map_err(|e| PipelineError::ModelUnavailable(format!("execution providers: {e}")))?
        .commit_from_memory(&bytes)
        .map_err(|e| PipelineError::ModelUnavailable(e.to_string()))
}

/// Model-backed engine. The session is behind a mutex because inference
/// requires exclusive access; everything else is read-only after load.
pub struct OnnxChangeEngine {
    session: Mutex<Session>,
    name: String,
}

impl OnnxChangeEngine {
    pub fn new(model: LoadedModel) -> Self {
        Self {
            session: Mutex::new(model.session),
            name: model.name,
        }
    }

    /// `(1, 3, h, w)` tensor layout expected by change-detection models.
    fn to_nchw(image: &NormalizedImage) -> Array4<f32> {
        let (h, w) = (image.height(), image.width());
        Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| image.pixel(y, x)[c])
    }
}

impl ChangeEngine for OnnxChangeEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn change_map(
        &self,
        pre: &NormalizedImage,
        post: &NormalizedImage,
    ) -> Result<ScalarMap, PipelineError> {
        let (h, w) = (pre.height(), pre.width());
        let mut session = self
            .session
            .lock()
            .map_err(|_| PipelineError::Computation("model session lock poisoned".to_string()))?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let output_name = session.outputs[0].name.clone();

        // Two-input models take the pair separately; single-input models get
        // a channel-concatenated (1, 6, h, w) tensor.
        let outputs = if input_names.len() >= 2 {
            let pre_value = Value::from_array(Self::to_nchw(pre))
                .map_err(|e| PipelineError::ModelUnavailable(format!("input tensor: {e}")))?;
            let post_value = Value::from_array(Self::to_nchw(post))
                .map_err(|e| PipelineError::ModelUnavailable(format!("input tensor: {e}")))?;
            session
                .run(ort::inputs![
                    input_names[0].as_str() => &pre_value,
                    input_names[1].as_str() => &post_value,
                ])
                .map_err(|e| PipelineError::ModelUnavailable(format!("inference: {e}")))?
        } else {
            let stacked = Array4::from_shape_fn((1, 6, h, w), |(_, c, y, x)| {
                if c < 3 {
                    pre.pixel(y, x)[c]
                } else {
                    post.pixel(y, x)[c - 3]
                }
            });
            let value = Value::from_array(stacked)
                .map_err(|e| PipelineError::ModelUnavailable(format!("input tensor: {e}")))?;
            session
                .run(ort::inputs![input_names[0].as_str() => &value])
                .map_err(|e| PipelineError::ModelUnavailable(format!("inference: {e}")))?
        };

        let view = outputs[output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(|e| PipelineError::ModelUnavailable(format!("output tensor: {e}")))?;
        let data = view
            .as_slice()
            .ok_or_else(|| PipelineError::Computation("non-contiguous model output".to_string()))?;

        if data.is_empty() || data.len() % (h * w) != 0 {
            return Err(PipelineError::Computation(format!(
                "model output of {} values does not map onto {h}x{w}",
                data.len()
            )));
        }

        // Squeeze any leading batch/class axes by averaging per pixel.
        let channels = data.len() / (h * w);
        let mut map = Array2::<f32>::zeros((h, w));
        for c in 0..channels {
            let plane = &data[c * h * w..(c + 1) * h * w];
            for y in 0..h {
                for x in 0..w {
                    map[[y, x]] += plane[y * w + x];
                }
            }
        }
        if channels > 1 {
            map.mapv_inplace(|v| v / channels as f32);
        }
        Ok(map)
    }

    fn confidence(&self, raw: &ScalarMap, _normalized: &ScalarMap) -> f32 {
        raw.iter()
            .fold(0.0f32, |acc, &v| acc.max(v))
            .clamp(0.0, 1.0)
    }
}
