//! Rendering of scalar maps into displayable images.
//!
//! Two modes: a grayscale mask (0 = no change, 255 = change) and a
//! five-stop blue -> cyan -> green -> yellow -> red ramp. Both re-normalize
//! their input first, so rendering an already-normalized map is idempotent
//! at the pixel level.

use crate::errors::PipelineError;
use crate::normalize::NormalizedImage;
use crate::scalar_map::{self, ScalarMap};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use ndarray::Array2;
use std::io::Cursor;

/// Piecewise-linear color ramp for a normalized intensity `t`.
pub fn heat_color(t: f32) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let r = (4.0 * t - 2.0).clamp(0.0, 1.0);
    let g = (4.0 * t).min(2.0 - 4.0 * t).clamp(0.0, 1.0);
    let b = (2.0 - 4.0 * t).clamp(0.0, 1.0);
    Rgb([(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8])
}

/// Grayscale mask: black = no change, white = change.
pub fn render_grayscale(map: &ScalarMap) -> Result<GrayImage, PipelineError> {
    let normalized = scalar_map::normalize_unit(map)?;
    let (h, w) = normalized.dim();
    let mut img = GrayImage::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            let v = (normalized[[y, x]] * 255.0) as u8;
            img.put_pixel(x as u32, y as u32, Luma([v]));
        }
    }
    Ok(img)
}

/// Five-stop color-ramp heatmap of a scalar map.
pub fn render_heatmap(map: &ScalarMap) -> Result<RgbImage, PipelineError> {
    let normalized = scalar_map::normalize_unit(map)?;
    let (h, w) = normalized.dim();
    let mut img = RgbImage::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            img.put_pixel(x as u32, y as u32, heat_color(normalized[[y, x]]));
        }
    }
    Ok(img)
}

/// Color-ramp heatmap for a stored grayscale mask, re-spread to the full
/// `[0, 1]` range before mapping.
pub fn heatmap_from_mask(mask: &GrayImage) -> Result<RgbImage, PipelineError> {
    let (w, h) = mask.dimensions();
    let mut map = Array2::<f32>::zeros((h as usize, w as usize));
    for (x, y, pixel) in mask.enumerate_pixels() {
        map[[y as usize, x as usize]] = pixel[0] as f32 / 255.0;
    }
    render_heatmap(&map)
}

/// Composite damage visualization: the original image blended 60/40 with a
/// red/green overlay keyed by edge intensity.
pub fn render_damage_overlay(image: &NormalizedImage, edges: &ScalarMap) -> RgbImage {
    let (h, w) = (image.height(), image.width());
    let mut img = RgbImage::new(w as u32, h as u32);
    for y in 0..h {
        for x in 0..w {
            let [r, g, b] = image.pixel(y, x);
            let e = edges[[y, x]].clamp(0.0, 1.0);
            let overlay = [e * 255.0, (1.0 - e) * 128.0, 0.0];
            let blended = [
                (r * 255.0 * 0.6 + overlay[0] * 0.4) as u8,
                (g * 255.0 * 0.6 + overlay[1] * 0.4) as u8,
                (b * 255.0 * 0.6 + overlay[2] * 0.4) as u8,
            ];
            img.put_pixel(x as u32, y as u32, Rgb(blended));
        }
    }
    img
}

pub fn encode_rgb_png(img: &RgbImage) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PipelineError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Encode a grayscale mask as an RGB PNG for inline previews.
pub fn encode_gray_as_rgb_png(mask: &GrayImage) -> Result<Vec<u8>, PipelineError> {
    let rgb = DynamicImage::ImageLuma8(mask.clone()).to_rgb8();
    encode_rgb_png(&rgb)
}

pub fn to_data_uri(png_bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", B64.encode(png_bytes))
}
