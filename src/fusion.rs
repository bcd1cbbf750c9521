//! Fusion of change detection and single-image estimation into one
//! combined damage report.
//!
//! The fused percentage weights change detection at 60% and estimation at
//! 40%; severity comes from the estimation side only, and confidence is the
//! minimum of both signals.

use crate::change_detection::ChangeResult;
use crate::errors::ResultStatus;
use crate::estimation::{DamageEstimationResult, DamageMetrics};
use crate::severity::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const CHANGE_WEIGHT: f32 = 0.6;
pub const ESTIMATION_WEIGHT: f32 = 0.4;

#[derive(Debug, Clone, Serialize)]
pub struct CombinedAnalysis {
    pub change_detection_damage: f32,
    pub estimation_damage: f32,
    pub combined_damage_percentage: f32,
    pub severity: Severity,
    pub confidence: f32,
}

/// Read-only aggregate of one change-detection result and one estimation
/// result. Computed on demand, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedReport {
    pub status: ResultStatus,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_analysis: Option<CombinedAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_detection: Option<ChangeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage_estimation: Option<DamageEstimationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Combine both pipeline outputs. Reports an error (naming the failed side)
/// when either input is an error result.
pub fn fuse(change: &ChangeResult, estimation: &DamageEstimationResult) -> CombinedReport {
    let metrics: Option<&DamageMetrics> = if estimation.is_error() {
        None
    } else {
        estimation.metrics.as_ref()
    };

    match (change.is_error(), metrics) {
        (false, Some(metrics)) => {
            let combined = change.damage_percentage * CHANGE_WEIGHT
                + metrics.total_damage_percentage * ESTIMATION_WEIGHT;
            CombinedReport {
                status: ResultStatus::Success,
                generated_at: Utc::now(),
                combined_analysis: Some(CombinedAnalysis {
                    change_detection_damage: change.damage_percentage,
                    estimation_damage: metrics.total_damage_percentage,
                    combined_damage_percentage: combined,
                    severity: metrics.severity_level,
                    confidence: change.confidence.min(metrics.confidence_score),
                }),
                assessment_message: Some(metrics.estimate_message.clone()),
                change_detection: Some(change.clone()),
                damage_estimation: Some(estimation.clone()),
                error: None,
            }
        }
        (change_failed, metrics) => {
            let mut failed = Vec::new();
            if change_failed {
                failed.push("change detection");
            }
            if metrics.is_none() {
                failed.push("damage estimation");
            }
            CombinedReport {
                status: ResultStatus::Error,
                generated_at: Utc::now(),
                combined_analysis: None,
                change_detection: Some(change.clone()),
                damage_estimation: Some(estimation.clone()),
                assessment_message: None,
                error: Some(format!("analysis failed: {}", failed.join(" and "))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation;
    use ndarray::Array2;

    fn success_change(damage: f32, confidence: f32) -> ChangeResult {
        ChangeResult {
            status: ResultStatus::Success,
            change_detected: damage,
            damage_percentage: damage,
            confidence,
            mask_data: None,
            mask_filename: None,
            model: "DifferenceAnalysis".to_string(),
            error: None,
        }
    }

    fn success_estimation(edge_level: f32) -> DamageEstimationResult {
        let edge_map = Array2::from_elem((64, 64), edge_level);
        let anomaly_map = Array2::from_elem((64, 64), edge_level);
        DamageEstimationResult {
            status: ResultStatus::Success,
            metrics: Some(estimation::metrics_from_maps(&edge_map, &anomaly_map)),
            visualization: None,
            model: estimation::MODEL_NAME.to_string(),
            error: None,
        }
    }

    #[test]
    fn weighted_fusion_is_exact() {
        // change 50%, total 30% (0.3 maps are flat, so mean 0.3 each side
        // -> building 30, debris 30, total 30).
        let change = success_change(50.0, 0.8);
        let estimation = success_estimation(0.3);
        let report = fuse(&change, &estimation);

        let analysis = report.combined_analysis.expect("fusion succeeded");
        assert!((analysis.combined_damage_percentage - 42.0).abs() < 1e-4);
        assert_eq!(analysis.change_detection_damage, 50.0);
        assert_eq!(analysis.estimation_damage, 30.0);
    }

    #[test]
    fn confidence_is_minimum_of_both_sides() {
        let change = success_change(10.0, 0.4);
        let estimation = success_estimation(0.3);
        let report = fuse(&change, &estimation);
        let analysis = report.combined_analysis.unwrap();
        assert_eq!(analysis.confidence, 0.4);
    }

    #[test]
    fn severity_comes_from_estimation_only() {
        // Huge change percentage but a low-damage estimation stays MINIMAL.
        let change = success_change(95.0, 0.9);
        let estimation = success_estimation(0.0);
        let report = fuse(&change, &estimation);
        let analysis = report.combined_analysis.unwrap();
        assert_eq!(analysis.severity, crate::severity::Severity::Minimal);
    }

    #[test]
    fn failed_change_side_is_named() {
        let mut change = success_change(0.0, 0.0);
        change.status = ResultStatus::Error;
        change.error = Some("decode failed".to_string());

        let report = fuse(&change, &success_estimation(0.3));
        assert!(report.status.is_error());
        assert_eq!(
            report.error.as_deref(),
            Some("analysis failed: change detection")
        );
    }

    #[test]
    fn both_failed_sides_are_named() {
        let mut change = success_change(0.0, 0.0);
        change.status = ResultStatus::Error;
        let estimation = DamageEstimationResult {
            status: ResultStatus::Error,
            metrics: None,
            visualization: None,
            model: estimation::MODEL_NAME.to_string(),
            error: Some("boom".to_string()),
        };

        let report = fuse(&change, &estimation);
        assert!(report.status.is_error());
        assert_eq!(
            report.error.as_deref(),
            Some("analysis failed: change detection and damage estimation")
        );
        assert!(report.combined_analysis.is_none());
    }
}
