use image::RgbImage;

use crate::core::assignment::Bounds;
use crate::core::error::QuantizeError;
use crate::core::vector::Vector;

/// Decoded RGB8 pixels, row-major, covering `bounds`.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    buffer: Vec<u8>,
    bounds: Bounds,
}

impl PixelBuffer {
    pub fn new(buffer: Vec<u8>, width: usize, height: usize) -> Result<Self, QuantizeError> {
        Self::with_bounds(buffer, Bounds::new(width, height))
    }

    pub fn with_bounds(buffer: Vec<u8>, bounds: Bounds) -> Result<Self, QuantizeError> {
        let expected = bounds.area() * 3;
        if buffer.len() != expected {
            return Err(QuantizeError::DimensionMismatch {
                got: buffer.len(),
                expected,
                width: bounds.width,
                height: bounds.height,
            });
        }
        Ok(Self { buffer, bounds })
    }

    pub fn from_rgb_image(img: &RgbImage) -> Self {
        Self {
            buffer: img.as_raw().clone(),
            bounds: Bounds::new(img.width() as usize, img.height() as usize),
        }
    }

    /// Row-major RGB bytes, `area * 3` long.
    pub fn as_raw(&self) -> &[u8] {
        &self.buffer
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn width(&self) -> usize {
        self.bounds.width
    }

    pub fn height(&self) -> usize {
        self.bounds.height
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.area() == 0
    }

    /// Channels of the pixel at absolute coordinates.
    pub fn channels(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y - self.bounds.top) * self.bounds.width + (x - self.bounds.left);
        self.channels_at(idx)
    }

    /// Channels of the `idx`-th pixel in row-major order.
    #[inline]
    pub fn channels_at(&self, idx: usize) -> [u8; 3] {
        let offset = idx * 3;
        [self.buffer[offset], self.buffer[offset + 1], self.buffer[offset + 2]]
    }

    pub fn sample(&self, x: usize, y: usize) -> Vector {
        let [r, g, b] = self.channels(x, y);
        Vector::from([r as f64, g as f64, b as f64])
    }

    /// Overwrite `out` with the `idx`-th pixel, avoiding an allocation per pixel.
    #[inline]
    pub fn load_sample(&self, idx: usize, out: &mut Vector) {
        let [r, g, b] = self.channels_at(idx);
        out[0] = r as f64;
        out[1] = g as f64;
        out[2] = b as f64;
    }
}
