//! Pairwise change detection: normalize a pre/post image pair, run the
//! selected engine, and post-process the raw map into a [`ChangeResult`].
//!
//! This is a boundary entry point: every internal failure is folded into a
//! `status = error` result instead of propagating to the caller.

use crate::change_engine::{ChangeEngine, DifferenceEngine, LoadedModel, OnnxChangeEngine};
use crate::errors::{PipelineError, ResultStatus};
use crate::mask_store::MaskStore;
use crate::normalize::{NormalizedImage, DEFAULT_SIZE};
use crate::scalar_map;
use crate::visualization;
use log::{debug, warn};
use serde::Serialize;

/// Normalized intensity above which a pixel counts as changed.
pub const CHANGE_THRESHOLD: f32 = 0.5;

/// Outcome of one change-detection invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeResult {
    pub status: ResultStatus,
    /// Percentage of pixels flagged as changed (0-100).
    pub change_detected: f32,
    /// Alias of `change_detected` kept for report consumers.
    pub damage_percentage: f32,
    pub confidence: f32,
    /// Inline data-URI PNG preview of the mask.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_data: Option<String>,
    /// Name of the persisted mask artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_filename: Option<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChangeResult {
    pub fn is_error(&self) -> bool {
        self.status.is_error()
    }

    fn error(model: &str, message: String) -> Self {
        Self {
            status: ResultStatus::Error,
            change_detected: 0.0,
            damage_percentage: 0.0,
            confidence: 0.0,
            mask_data: None,
            mask_filename: None,
            model: model.to_string(),
            error: Some(message),
        }
    }
}

/// Change detector with a fixed engine chosen once at startup.
pub struct ChangeDetector {
    engine: Box<dyn ChangeEngine>,
    mask_store: MaskStore,
    image_size: u32,
}

impl ChangeDetector {
    /// Use the model-backed engine when a loaded model is supplied,
    /// otherwise the deterministic difference engine.
    pub fn new(model: Option<LoadedModel>, mask_store: MaskStore) -> Self {
        let engine: Box<dyn ChangeEngine> = match model {
            Some(m) => Box::new(OnnxChangeEngine::new(m)),
            None => Box::new(DifferenceEngine),
        };
        Self {
            engine,
            mask_store,
            image_size: DEFAULT_SIZE,
        }
    }

    pub fn model_name(&self) -> &str {
        self.engine.name()
    }

    /// Detect changes between a pre/post pair of encoded images.
    ///
    /// Never panics or returns an error: decode, inference, and render
    /// failures all surface as a `status = error` result.
    pub fn detect(&self, pre_bytes: &[u8], post_bytes: &[u8]) -> ChangeResult {
        match self.detect_inner(pre_bytes, post_bytes) {
            Ok(result) => result,
            Err(e) => {
                warn!("⚠️  Change detection failed: {e}");
                ChangeResult::error(self.engine.name(), e.to_string())
            }
        }
    }

    fn detect_inner(
        &self,
        pre_bytes: &[u8],
        post_bytes: &[u8],
    ) -> Result<ChangeResult, PipelineError> {
        let pre = NormalizedImage::from_bytes(pre_bytes, self.image_size)?;
        let post = NormalizedImage::from_bytes(post_bytes, self.image_size)?;
        pre.ensure_same_dimensions(&post)?;

        let raw = self.engine.change_map(&pre, &post)?;
        let normalized = scalar_map::normalize_unit(&raw)?;

        let change_percentage = scalar_map::fraction_above(&normalized, CHANGE_THRESHOLD) * 100.0;
        let confidence = self.engine.confidence(&raw, &normalized);

        let mask = visualization::render_grayscale(&normalized)?;
        let mask_filename = self.mask_store.save(&mask)?;
        let preview = visualization::encode_gray_as_rgb_png(&mask)?;

        debug!(
            "📊 Change detection ({}): {:.2}% changed, confidence {:.2}, mask {}",
            self.engine.name(),
            change_percentage,
            confidence,
            mask_filename
        );

        Ok(ChangeResult {
            status: ResultStatus::Success,
            change_detected: change_percentage,
            damage_percentage: change_percentage,
            confidence,
            mask_data: Some(visualization::to_data_uri(&preview)),
            mask_filename: Some(mask_filename),
            model: self.engine.name().to_string(),
            error: None,
        })
    }
}
