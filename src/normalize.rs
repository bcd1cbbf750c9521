//! Image normalization: decode arbitrary-format bytes into a fixed-size,
//! fixed-channel float buffer shared by every downstream stage.

use crate::errors::PipelineError;
use image::imageops::FilterType;
use ndarray::{Array2, Array3};

/// Default square dimension every input is resized to.
pub const DEFAULT_SIZE: u32 = 256;

/// An owned RGB pixel grid, Lanczos-resized to a fixed square and scaled to
/// `[0, 1]`. Immutable after creation; consumed read-only downstream.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Row-major `(height, width, 3)`.
    data: Array3<f32>,
}

impl NormalizedImage {
    /// Decode raw encoded bytes and normalize to a `size`×`size` RGB buffer.
    pub fn from_bytes(bytes: &[u8], size: u32) -> Result<Self, PipelineError> {
        if size == 0 {
            return Err(PipelineError::Dimension(
                "target dimension must be positive".to_string(),
            ));
        }

        let img = image::load_from_memory(bytes)
            .map_err(|e| PipelineError::Decode(e.to_string()))?;
        let rgb = img.resize_exact(size, size, FilterType::Lanczos3).to_rgb8();

        let (width, height) = rgb.dimensions();
        let mut data = Array3::<f32>::zeros((height as usize, width as usize, 3));
        for (x, y, pixel) in rgb.enumerate_pixels() {
            data[[y as usize, x as usize, 0]] = pixel[0] as f32 / 255.0;
            data[[y as usize, x as usize, 1]] = pixel[1] as f32 / 255.0;
            data[[y as usize, x as usize, 2]] = pixel[2] as f32 / 255.0;
        }

        Ok(Self { data })
    }

    /// Wrap an existing `(height, width, 3)` buffer.
    pub fn from_array(data: Array3<f32>) -> Result<Self, PipelineError> {
        let (h, w, c) = data.dim();
        if c != 3 || h == 0 || w == 0 {
            return Err(PipelineError::Dimension(format!(
                "expected a non-empty (h, w, 3) buffer, got ({h}, {w}, {c})"
            )));
        }
        Ok(Self { data })
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// `[r, g, b]` at the given row/column.
    pub fn pixel(&self, y: usize, x: usize) -> [f32; 3] {
        [
            self.data[[y, x, 0]],
            self.data[[y, x, 1]],
            self.data[[y, x, 2]],
        ]
    }

    /// Channel-mean grayscale reduction.
    pub fn grayscale(&self) -> Array2<f32> {
        let (h, w, _) = self.data.dim();
        Array2::from_shape_fn((h, w), |(y, x)| {
            (self.data[[y, x, 0]] + self.data[[y, x, 1]] + self.data[[y, x, 2]]) / 3.0
        })
    }

    /// Change detection requires identically sized buffers.
    pub fn ensure_same_dimensions(&self, other: &Self) -> Result<(), PipelineError> {
        if self.height() != other.height() || self.width() != other.width() {
            return Err(PipelineError::Dimension(format!(
                "image dimensions differ: {}x{} vs {}x{}",
                self.width(),
                self.height(),
                other.width(),
                other.height()
            )));
        }
        Ok(())
    }
}
