use std::path::Path;

use anyhow::{Context, Result};
use image::io::Reader as ImageReader;
use log::info;

use super::pixel_buffer::PixelBuffer;

/// Decode any format the `image` crate understands into RGB8 pixels.
pub fn load(path: impl AsRef<Path>) -> Result<PixelBuffer> {
    let path = path.as_ref();
    let img = ImageReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("Failed to detect format of {}", path.display()))?
        .decode()
        .with_context(|| format!("Failed to decode {}", path.display()))?;

    let rgb = img.to_rgb8();
    info!("Loaded {} ({}x{})", path.display(), rgb.width(), rgb.height());
    Ok(PixelBuffer::from_rgb_image(&rgb))
}
