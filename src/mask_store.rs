//! Filesystem persistence of change-detection masks.
//!
//! Masks are written under one directory with unique generated names
//! (`mask_<hex>.png`) so concurrent invocations never collide, and can be
//! retrieved later by filename or most-recent lookup for the out-of-band
//! heatmap pathway.

use crate::errors::PipelineError;
use image::GrayImage;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MASK_DIR: &str = "masks";

#[derive(Debug, Clone)]
pub struct MaskStore {
    dir: PathBuf,
}

impl MaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn generate_filename() -> String {
        format!("mask_{:032x}.png", rand::random::<u128>())
    }

    /// Persist a grayscale mask and return its generated filename.
    pub fn save(&self, mask: &GrayImage) -> Result<String, PipelineError> {
        fs::create_dir_all(&self.dir)?;
        let filename = Self::generate_filename();
        mask.save(self.dir.join(&filename))
            .map_err(|e| PipelineError::Encode(e.to_string()))?;
        Ok(filename)
    }

    /// Load a stored mask by filename as grayscale.
    pub fn load(&self, filename: &str) -> Result<GrayImage, PipelineError> {
        let path = self.dir.join(filename);
        if !path.is_file() {
            return Err(PipelineError::MaskNotFound(filename.to_string()));
        }
        let img = image::open(&path).map_err(|e| PipelineError::Decode(e.to_string()))?;
        Ok(img.to_luma8())
    }

    /// Most recently written mask, by modification time.
    pub fn latest(&self) -> Result<(String, GrayImage), PipelineError> {
        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_png = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("png"))
                .unwrap_or(false);
            if !path.is_file() || !is_png {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
                newest = Some((modified, path));
            }
        }

        let (_, path) = newest
            .ok_or_else(|| PipelineError::MaskNotFound("no mask files found".to_string()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let img = image::open(&path).map_err(|e| PipelineError::Decode(e.to_string()))?;
        Ok((filename, img.to_luma8()))
    }
}

impl Default for MaskStore {
    fn default() -> Self {
        Self::new(DEFAULT_MASK_DIR)
    }
}
