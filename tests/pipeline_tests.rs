//! End-to-end pipeline tests over synthetic in-memory images.

use image::{Rgb, RgbImage};
use resq::change_detection::ChangeDetector;
use resq::errors::ResultStatus;
use resq::estimation::DamageEstimator;
use resq::fusion;
use resq::mask_store::MaskStore;
use resq::severity::Severity;
use std::io::Cursor;
use tempfile::tempdir;

/// PNG-encode a solid-color image.
fn solid_png(size: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(size, size, Rgb(color));
    encode_png(img)
}

/// PNG-encode a half/half split image (left/right colors).
fn split_png(size: u32, left: [u8; 3], right: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_fn(size, size, |x, _| {
        Rgb(if x < size / 2 { left } else { right })
    });
    encode_png(img)
}

fn encode_png(img: RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn detector_in(dir: &std::path::Path) -> ChangeDetector {
    ChangeDetector::new(None, MaskStore::new(dir))
}

#[test]
fn detect_changes_stays_in_bounds() {
    let dir = tempdir().unwrap();
    let detector = detector_in(dir.path());

    let pre = solid_png(64, [10, 200, 30]);
    let post = split_png(64, [10, 200, 30], [220, 40, 40]);
    let result = detector.detect(&pre, &post);

    assert_eq!(result.status, ResultStatus::Success);
    assert!((0.0..=100.0).contains(&result.change_detected));
    assert!((0.0..=1.0).contains(&result.confidence));
    assert_eq!(result.change_detected, result.damage_percentage);
    assert_eq!(result.model, "DifferenceAnalysis");
}

#[test]
fn identical_images_report_zero_change() {
    let dir = tempdir().unwrap();
    let detector = detector_in(dir.path());

    let bytes = split_png(64, [0, 0, 0], [255, 255, 255]);
    let result = detector.detect(&bytes, &bytes);

    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(result.change_detected, 0.0);
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn changed_half_is_detected_with_persisted_mask() {
    let dir = tempdir().unwrap();
    let detector = detector_in(dir.path());

    let pre = solid_png(64, [20, 20, 20]);
    let post = split_png(64, [20, 20, 20], [250, 250, 250]);
    let result = detector.detect(&pre, &post);

    assert_eq!(result.status, ResultStatus::Success);
    // Roughly half the scene flipped far past the difference threshold.
    assert!(result.change_detected > 25.0);
    assert!(result.confidence > 0.0);

    let mask_filename = result.mask_filename.expect("mask persisted");
    assert!(dir.path().join(&mask_filename).is_file());

    let mask_data = result.mask_data.expect("inline preview");
    assert!(mask_data.starts_with("data:image/png;base64,"));

    // The stored mask must feed the heatmap pathway.
    let store = MaskStore::new(dir.path());
    let (latest_name, mask) = store.latest().unwrap();
    assert_eq!(latest_name, mask_filename);
    let heatmap = resq::visualization::heatmap_from_mask(&mask).unwrap();
    assert_eq!(heatmap.dimensions(), mask.dimensions());
}

#[test]
fn malformed_bytes_never_escape_as_failures() {
    let dir = tempdir().unwrap();
    let detector = detector_in(dir.path());

    let good = solid_png(64, [1, 2, 3]);
    let bad = b"garbage bytes".to_vec();

    // Either side failing fails the whole operation with a status, not a panic.
    for (a, b) in [(&bad, &good), (&good, &bad), (&bad, &bad)] {
        let result = detector.detect(a, b);
        assert_eq!(result.status, ResultStatus::Error);
        assert_eq!(result.change_detected, 0.0);
        assert_eq!(result.confidence, 0.0);
        assert!(result.error.is_some());
        assert!(result.mask_filename.is_none());
    }
}

#[test]
fn estimation_produces_complete_metrics() {
    let estimator = DamageEstimator::new();
    let bytes = split_png(256, [40, 180, 60], [140, 90, 70]);
    let result = estimator.estimate(&bytes);

    assert_eq!(result.status, ResultStatus::Success);
    let metrics = result.metrics.expect("metrics present");

    assert!((0.0..=100.0).contains(&metrics.total_damage_percentage));
    assert!((0.0..=100.0).contains(&metrics.building_damage_percentage));
    assert!((0.0..=100.0).contains(&metrics.debris_coverage_percentage));
    assert!((0.0..=1.0).contains(&metrics.confidence_score));
    assert_eq!(metrics.damaged_zones_count + metrics.safe_zones_count, 16);
    assert_eq!(
        metrics.affected_area_percentage,
        metrics.total_damage_percentage
    );
    assert!(metrics
        .estimate_message
        .contains(metrics.severity_level.as_str()));

    let viz = result.visualization.expect("composite visualization");
    assert!(viz.starts_with("data:image/png;base64,"));
}

#[test]
fn flat_image_estimation_is_debris_dominated() {
    // A flat gray image has almost no edges (only the zero-padded borders
    // respond), so the anomaly term dominates.
    let estimator = DamageEstimator::new();
    let bytes = solid_png(256, [128, 128, 128]);
    let result = estimator.estimate(&bytes);

    let metrics = result.metrics.unwrap();
    assert!(metrics.building_damage_percentage < 5.0);
    assert!(
        (metrics.infrastructure_damage_percentage - metrics.building_damage_percentage * 0.8)
            .abs()
            < 1e-4
    );
    // Equal red/green gives index 0 -> anomaly 0.5 -> debris 50%.
    assert!((metrics.debris_coverage_percentage - 50.0).abs() < 1.0);
    assert_eq!(metrics.severity_level, Severity::Minor);
    assert_eq!(metrics.damaged_zones_count, 0);
}

#[test]
fn combined_report_fuses_both_pipelines() {
    let dir = tempdir().unwrap();
    let detector = detector_in(dir.path());
    let estimator = DamageEstimator::new();

    let pre = solid_png(256, [30, 160, 50]);
    let post = split_png(256, [30, 160, 50], [150, 80, 60]);

    let change = detector.detect(&pre, &post);
    let estimation = estimator.estimate(&post);
    let report = fusion::fuse(&change, &estimation);

    assert_eq!(report.status, ResultStatus::Success);
    let analysis = report.combined_analysis.expect("analysis present");

    let expected = change.damage_percentage * fusion::CHANGE_WEIGHT
        + analysis.estimation_damage * fusion::ESTIMATION_WEIGHT;
    assert!((analysis.combined_damage_percentage - expected).abs() < 1e-4);
    assert!(analysis.confidence <= change.confidence);
    assert!(report.assessment_message.is_some());
}

#[test]
fn combined_report_fails_when_one_side_fails() {
    let dir = tempdir().unwrap();
    let detector = detector_in(dir.path());
    let estimator = DamageEstimator::new();

    let good = solid_png(64, [30, 160, 50]);
    let change = detector.detect(&good, &good);
    let estimation = estimator.estimate(b"not an image");
    let report = fusion::fuse(&change, &estimation);

    assert_eq!(report.status, ResultStatus::Error);
    assert_eq!(
        report.error.as_deref(),
        Some("analysis failed: damage estimation")
    );
}

#[test]
fn change_result_serializes_boundary_fields() {
    let dir = tempdir().unwrap();
    let detector = detector_in(dir.path());

    let pre = solid_png(64, [0, 0, 0]);
    let post = solid_png(64, [255, 255, 255]);
    let result = detector.detect(&pre, &post);

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value["model"], "DifferenceAnalysis");
    assert!(value["damage_percentage"].is_number());
    assert!(value["mask_filename"]
        .as_str()
        .unwrap()
        .starts_with("mask_"));
}
