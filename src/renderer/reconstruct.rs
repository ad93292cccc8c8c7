use std::path::Path;

use anyhow::{Context, Result};
use image::{ImageFormat, RgbImage};
use log::info;
use rayon::prelude::*;

use crate::core::quantizer::Quantization;

/// Rebuild the image with every pixel replaced by its palette color.
pub fn render(q: &Quantization) -> RgbImage {
    let colors = q.colors();
    let w = q.map.width();
    let h = q.map.height();
    let mut img = RgbImage::new(w as u32, h as u32);
    if w == 0 || h == 0 {
        return img;
    }

    img.par_chunks_mut(w * 3)
        .zip(q.map.as_slice().par_chunks(w))
        .for_each(|(row, indices)| {
            for (px, index) in row.chunks_exact_mut(3).zip(indices) {
                px.copy_from_slice(&colors[*index as usize]);
            }
        });
    img
}

pub fn save_png(img: &RgbImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {} ({}x{})", path.display(), img.width(), img.height());
    Ok(())
}
