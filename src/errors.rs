//! Error taxonomy and result status for the assessment pipeline.
//!
//! Public pipeline entry points never propagate these errors to callers;
//! they are folded into structured results carrying a [`ResultStatus`]
//! and a message. `ModelUnavailable` in particular only ever selects the
//! fallback engine and is not user-visible.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input bytes could not be decoded as an image.
    #[error("failed to decode image bytes: {0}")]
    Decode(String),

    /// Mismatched or degenerate image dimensions.
    #[error("image dimension error: {0}")]
    Dimension(String),

    /// The external change-detection model could not be loaded or run.
    #[error("change model unavailable: {0}")]
    ModelUnavailable(String),

    /// Unexpected numeric failure, e.g. NaN propagation.
    #[error("computation failed: {0}")]
    Computation(String),

    /// Failed to encode or write a rendered image.
    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("mask not found: {0}")]
    MaskNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Status field carried by every boundary result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

impl ResultStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, ResultStatus::Error)
    }
}
