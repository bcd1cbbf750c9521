//! Structural-edge intensity from a grayscale map.
//!
//! Two fixed Sobel kernels are applied as same-size zero-padded
//! convolutions and combined as a Euclidean magnitude. High edge density
//! reads as structural damage in aerial imagery.

use crate::errors::PipelineError;
use crate::scalar_map::{self, ScalarMap};
use ndarray::Array2;

const K_SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const K_SOBEL_Y: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Same-size 3x3 convolution with zero padding at the borders.
fn convolve3x3(map: &ScalarMap, kernel: &[[f32; 3]; 3]) -> ScalarMap {
    let (h, w) = map.dim();
    let mut out = Array2::<f32>::zeros((h, w));
    for i in 0..h {
        for j in 0..w {
            let mut acc = 0.0f32;
            for (ki, row) in kernel.iter().enumerate() {
                for (kj, &k) in row.iter().enumerate() {
                    let y = i as isize + ki as isize - 1;
                    let x = j as isize + kj as isize - 1;
                    if y >= 0 && y < h as isize && x >= 0 && x < w as isize {
                        acc += map[[y as usize, x as usize]] * k;
                    }
                }
            }
            out[[i, j]] = acc;
        }
    }
    out
}

/// Sobel gradient magnitude, min-max normalized to `[0, 1]`.
///
/// A perfectly flat input yields an all-zero map.
pub fn edge_map(gray: &ScalarMap) -> Result<ScalarMap, PipelineError> {
    let gx = convolve3x3(gray, &K_SOBEL_X);
    let gy = convolve3x3(gray, &K_SOBEL_Y);

    let (h, w) = gray.dim();
    let mut magnitude = Array2::<f32>::zeros((h, w));
    for i in 0..h {
        for j in 0..w {
            let ex = gx[[i, j]].abs();
            let ey = gy[[i, j]].abs();
            magnitude[[i, j]] = (ex * ex + ey * ey).sqrt();
        }
    }

    scalar_map::normalize_unit(&magnitude)
}
