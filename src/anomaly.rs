//! Color-anomaly scoring from the red/green channel balance.
//!
//! A vegetation-style index separates healthy vegetation from brown/gray
//! debris; the score is inverted so that low vegetation signal reads as
//! damage.

use crate::normalize::NormalizedImage;
use crate::scalar_map::ScalarMap;
use ndarray::Array2;

/// Per-pixel anomaly score in `[0, 1]`.
///
/// `index = (g - r) / (g + r)` (0 where the denominator is 0), then
/// `score = 1 - clamp(index + 0.5, 0, 1)`.
pub fn anomaly_map(image: &NormalizedImage) -> ScalarMap {
    let (h, w) = (image.height(), image.width());
    Array2::from_shape_fn((h, w), |(y, x)| {
        let [r, g, _b] = image.pixel(y, x);
        let denom = g + r;
        let index = if denom != 0.0 { (g - r) / denom } else { 0.0 };
        1.0 - (index + 0.5).clamp(0.0, 1.0)
    })
}
