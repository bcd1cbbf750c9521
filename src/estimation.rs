//! Single-image structural damage estimation.
//!
//! Composes the edge, anomaly, zone, and severity stages into one
//! [`DamageMetrics`] record plus a composite visualization. Like change
//! detection, this is a boundary entry point and never raises past it.

use crate::errors::{PipelineError, ResultStatus};
use crate::normalize::{NormalizedImage, DEFAULT_SIZE};
use crate::scalar_map::{self, ScalarMap};
use crate::severity::Severity;
use crate::visualization;
use crate::zones::{self, ZoneGrid};
use crate::{anomaly, edges};
use log::{debug, warn};
use serde::Serialize;

pub const MODEL_NAME: &str = "DamageEstimator";

const BUILDING_WEIGHT: f32 = 0.6;
const DEBRIS_WEIGHT: f32 = 0.4;
const INFRASTRUCTURE_FACTOR: f32 = 0.8;
const MAX_CONFIDENCE: f32 = 0.95;

/// Immutable per-image damage assessment record.
#[derive(Debug, Clone, Serialize)]
pub struct DamageMetrics {
    pub total_damage_percentage: f32,
    pub building_damage_percentage: f32,
    pub infrastructure_damage_percentage: f32,
    pub debris_coverage_percentage: f32,
    pub severity_level: Severity,
    pub affected_area_percentage: f32,
    pub confidence_score: f32,
    pub damaged_zones_count: usize,
    pub safe_zones_count: usize,
    pub estimate_message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DamageEstimationResult {
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<DamageMetrics>,
    /// Composite damage overlay as a data-URI PNG.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization: Option<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DamageEstimationResult {
    pub fn is_error(&self) -> bool {
        self.status.is_error()
    }

    fn error(message: String) -> Self {
        Self {
            status: ResultStatus::Error,
            metrics: None,
            visualization: None,
            model: MODEL_NAME.to_string(),
            error: Some(message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DamageEstimator {
    image_size: u32,
}

impl Default for DamageEstimator {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_SIZE,
        }
    }
}

impl DamageEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate damage from a single encoded image. Any processing failure
    /// yields a metrics-absent error result.
    pub fn estimate(&self, image_bytes: &[u8]) -> DamageEstimationResult {
        match self.estimate_inner(image_bytes) {
            Ok(result) => result,
            Err(e) => {
                warn!("⚠️  Damage estimation failed: {e}");
                DamageEstimationResult::error(e.to_string())
            }
        }
    }

    fn estimate_inner(&self, image_bytes: &[u8]) -> Result<DamageEstimationResult, PipelineError> {
        let image = NormalizedImage::from_bytes(image_bytes, self.image_size)?;
        let gray = image.grayscale();
        let edge_map = edges::edge_map(&gray)?;
        let anomaly_map = anomaly::anomaly_map(&image);

        let metrics = metrics_from_maps(&edge_map, &anomaly_map);
        debug!(
            "📊 Damage estimation: total {:.2}%, severity {}, {} damaged zones",
            metrics.total_damage_percentage, metrics.severity_level, metrics.damaged_zones_count
        );

        let overlay = visualization::render_damage_overlay(&image, &edge_map);
        let png = visualization::encode_rgb_png(&overlay)?;

        Ok(DamageEstimationResult {
            status: ResultStatus::Success,
            metrics: Some(metrics),
            visualization: Some(visualization::to_data_uri(&png)),
            model: MODEL_NAME.to_string(),
            error: None,
        })
    }
}

/// Derive the full metrics record from precomputed edge and anomaly maps.
pub fn metrics_from_maps(edge_map: &ScalarMap, anomaly_map: &ScalarMap) -> DamageMetrics {
    let building = scalar_map::mean(edge_map) * 100.0;
    let debris = scalar_map::mean(anomaly_map) * 100.0;
    let total = (building * BUILDING_WEIGHT + debris * DEBRIS_WEIGHT).clamp(0.0, 100.0);

    let grid = zones::aggregate(edge_map, zones::DEFAULT_DAMAGE_THRESHOLD);
    let severity = Severity::classify(total);
    let confidence = (0.7 + total / 200.0).min(MAX_CONFIDENCE);

    DamageMetrics {
        total_damage_percentage: total,
        building_damage_percentage: building,
        infrastructure_damage_percentage: building * INFRASTRUCTURE_FACTOR,
        debris_coverage_percentage: debris,
        severity_level: severity,
        affected_area_percentage: total,
        confidence_score: confidence,
        damaged_zones_count: grid.damaged_count,
        safe_zones_count: grid.safe_count,
        estimate_message: assessment_message(severity, total, &grid),
    }
}

fn assessment_message(severity: Severity, total: f32, grid: &ZoneGrid) -> String {
    match severity {
        Severity::Critical => format!(
            "CRITICAL DAMAGE: {total:.1}% - Immediate emergency response required. {} zones severely affected.",
            grid.damaged_count
        ),
        Severity::Severe => format!(
            "SEVERE DAMAGE: {total:.1}% - Major structural damage. {} zones impacted.",
            grid.damaged_count
        ),
        Severity::Moderate => format!(
            "MODERATE DAMAGE: {total:.1}% - Significant but manageable. {} zones need assessment.",
            grid.damaged_count
        ),
        Severity::Minor => format!(
            "MINOR DAMAGE: {total:.1}% - Limited impact. {} isolated damage spots.",
            grid.damaged_count
        ),
        Severity::Minimal => format!(
            "MINIMAL DAMAGE: {total:.1}% - Area relatively safe. {}/{} zones unaffected.",
            grid.safe_count,
            grid.safe_count + grid.damaged_count
        ),
    }
}
