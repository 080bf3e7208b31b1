use std::path::Path;
use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;
use crate::error::ViewerError;
use crate::types::sample::Sample;

pub mod source;

/// Decoded pixels in `(height, width, channel)` order, RGB.
pub type Image = Array3<u8>;

/// Resolves a sample to its decoded pixels.
///
/// Loading is a pure read: calling it twice for the same sample yields the same pixels.
pub trait ImageLoader: Send + Sync {
    fn load(&self, sample: &Sample) -> Result<Image>;
}

/// Loads the images of all `samples` concurrently; the output follows the order of `samples`.
///
/// Fails as a whole if any single image cannot be loaded.
pub fn load_images(loader: &dyn ImageLoader, samples: &[&Sample]) -> Result<Vec<Image>> {
    samples.par_iter()
        .map(|sample| loader.load(sample))
        .collect()
}

/// Decodes an encoded image (PNG or JPEG) into RGB pixels.
pub fn decode(bytes: &[u8]) -> Result<Image> {
    let decoded = image::load_from_memory(bytes).context("failed to decode image")?;
    from_rgb(decoded.to_rgb8())
}

pub fn from_rgb(image: RgbImage) -> Result<Image> {
    let (width, height) = image.dimensions();
    let pixels = Array3::from_shape_vec((height as usize, width as usize, 3), image.into_raw())?;
    Ok(pixels)
}

/// Converts pixels back into an `image` buffer.
///
/// Returns `ViewerError::InvalidImage` unless `pixels` has exactly three channels.
pub fn to_rgb(pixels: ArrayView3<u8>) -> Result<RgbImage> {
    let (height, width, channels) = pixels.dim();
    if channels != 3 {
        return Err(ViewerError::InvalidImage(format!("expected 3 channels, got {}", channels)).into());
    }
    let raw = pixels.iter().copied().collect::<Vec<_>>();
    RgbImage::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| ViewerError::InvalidImage(format!("cannot encode a {}x{} image", height, width)).into())
}

/// Writes `pixels` to `path`; the format follows the file extension.
pub fn save(pixels: ArrayView3<u8>, path: &Path) -> Result<()> {
    to_rgb(pixels)?
        .save(path)
        .with_context(|| format!("failed to write image '{}'", path.display()))
}
