use rayon::prelude::*;

use super::assignment::AssignmentMap;
use super::node::Accumulator;
use super::palette::Palette;
use super::vector::Vector;
use crate::decoder::pixel_buffer::PixelBuffer;

/// Classify pass over a whole image.
///
/// Rows are split into chunks that run in parallel; each chunk keeps its
/// own per-entry accumulators which are merged into the palette, in chunk
/// order, once every chunk is done.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassifyProcessor;

impl ClassifyProcessor {
    pub fn new() -> Self {
        Self
    }

    fn rows_per_chunk(width: usize, height: usize) -> usize {
        if width * height > 100_000 {
            (8192 / width).max(1)
        } else {
            (height / rayon::current_num_threads().max(1)).max(1)
        }
    }

    pub fn run(&self, palette: &mut Palette, pixels: &PixelBuffer, map: &mut AssignmentMap) {
        assert_eq!(pixels.bounds(), map.bounds(), "pixel buffer and assignment map differ in bounds");
        let width = map.width();
        if map.as_slice().is_empty() {
            return;
        }
        let rows = Self::rows_per_chunk(width, map.height());
        let chunk_size = rows * width;

        let shared: &Palette = &*palette;
        let partials: Vec<Vec<Accumulator>> = map
            .row_chunks_mut(rows)
            .enumerate()
            .map(|(chunk_idx, chunk)| {
                let start = chunk_idx * chunk_size;
                let mut local = shared.partials();
                let mut sample = Vector::zero(shared.dimension());

                for (i, slot) in chunk.iter_mut().enumerate() {
                    pixels.load_sample(start + i, &mut sample);
                    let index = shared.nearest(&sample);
                    local[index].add_sample(&sample);
                    *slot = index as u16;
                }
                local
            })
            .collect();

        for partial in &partials {
            palette.absorb(partial);
        }
    }

    /// Same pass, one pixel at a time through `Palette::classify`.
    pub fn run_serial(&self, palette: &mut Palette, pixels: &PixelBuffer, map: &mut AssignmentMap) {
        let b = map.bounds();
        for y in b.top..b.bottom() {
            for x in b.left..b.right() {
                let index = palette.classify(&pixels.sample(x, y));
                map.set(x, y, index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::palette::PaletteOptions;
    use image::{Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gradient(w: u32, h: u32) -> PixelBuffer {
        let img = RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) * 3 % 256) as u8])
        });
        PixelBuffer::from_rgb_image(&img)
    }

    #[test]
    fn test_parallel_matches_serial() {
        let pixels = gradient(97, 61);
        let mut rng = StdRng::seed_from_u64(3);
        let palette = Palette::with_rng(16, PaletteOptions::default(), &mut rng).unwrap();

        let mut serial = palette.clone();
        let mut serial_map = AssignmentMap::with_bounds(pixels.bounds());
        ClassifyProcessor::new().run_serial(&mut serial, &pixels, &mut serial_map);

        let mut parallel = palette;
        let mut parallel_map = AssignmentMap::with_bounds(pixels.bounds());
        ClassifyProcessor::new().run(&mut parallel, &pixels, &mut parallel_map);

        assert_eq!(serial_map, parallel_map);
        for i in 0..serial.size() {
            assert_eq!(serial.stats(i), parallel.stats(i));
        }
    }

    #[test]
    fn test_pass_conserves_pixel_count() {
        let pixels = gradient(40, 30);
        let mut palette = Palette::initialize(8).unwrap();
        let mut map = AssignmentMap::with_bounds(pixels.bounds());
        ClassifyProcessor::new().run(&mut palette, &pixels, &mut map);
        assert_eq!(palette.total_samples(), 40 * 30);
        assert!(map.as_slice().iter().all(|i| (*i as usize) < palette.size()));
    }
}
