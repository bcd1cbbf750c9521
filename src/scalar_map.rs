//! Shared helpers for per-pixel intensity maps.
//!
//! A [`ScalarMap`] holds one value per pixel (edges, anomaly, change) and is
//! always min-max normalized to `[0, 1]` before being handed to the zone
//! aggregator or the renderer.

use crate::errors::PipelineError;
use ndarray::Array2;

pub type ScalarMap = Array2<f32>;

/// Min-max normalize to `[0, 1]`. A uniform map collapses to all zeros
/// rather than dividing by zero; non-finite values are a computation error.
pub fn normalize_unit(map: &ScalarMap) -> Result<ScalarMap, PipelineError> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in map.iter() {
        if !v.is_finite() {
            return Err(PipelineError::Computation(
                "non-finite value in scalar map".to_string(),
            ));
        }
        min = min.min(v);
        max = max.max(v);
    }

    if max > min {
        Ok(map.mapv(|v| (v - min) / (max - min)))
    } else {
        Ok(Array2::zeros(map.raw_dim()))
    }
}

pub fn mean(map: &ScalarMap) -> f32 {
    if map.is_empty() {
        return 0.0;
    }
    map.sum() / map.len() as f32
}

/// Fraction of pixels strictly above `threshold`.
pub fn fraction_above(map: &ScalarMap, threshold: f32) -> f32 {
    if map.is_empty() {
        return 0.0;
    }
    let count = map.iter().filter(|&&v| v > threshold).count();
    count as f32 / map.len() as f32
}

/// Mean of pixels strictly above `threshold`; 0 when no pixel qualifies.
pub fn mean_above(map: &ScalarMap, threshold: f32) -> f32 {
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for &v in map.iter() {
        if v > threshold {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}
