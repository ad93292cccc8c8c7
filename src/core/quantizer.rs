use std::time::Instant;

use log::{debug, info};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use super::assignment::AssignmentMap;
use super::error::{QuantizeError, VectorError};
use super::palette::{Palette, DIMENSION};
use super::processor::ClassifyProcessor;
use crate::config::{QuantizeConfig, StopPolicy};
use crate::decoder::pixel_buffer::PixelBuffer;

/// What one classify-shift-split-reset round did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundStats {
    pub round: usize,
    /// Centers that moved further than the shift epsilon.
    pub shifted: usize,
    pub splits: usize,
    /// The split step changed entry positions.
    pub reordered: bool,
    /// Entries that received at least one pixel.
    pub occupied: usize,
    pub elapsed_ms: u128,
}

/// One learned palette entry, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaletteEntry {
    pub index: usize,
    /// Pixels assigned to this entry in the final map.
    pub population: usize,
    pub rgb: [u8; 3],
    pub center: Vec<f64>,
}

/// Result of a quantization run.
#[derive(Debug, Clone)]
pub struct Quantization {
    pub palette: Palette,
    pub map: AssignmentMap,
    pub rounds: Vec<RoundStats>,
}

/// Channel value as written to an 8-bit image.
pub fn to_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

impl Quantization {
    pub fn rgb(&self, index: usize) -> [u8; 3] {
        let c = self.palette.get(index);
        [to_channel(c[0]), to_channel(c[1]), to_channel(c[2])]
    }

    /// Reconstructed color of the pixel at absolute coordinates.
    pub fn color_at(&self, x: usize, y: usize) -> [u8; 3] {
        self.rgb(self.map.get(x, y))
    }

    pub fn colors(&self) -> Vec<[u8; 3]> {
        (0..self.palette.size()).map(|i| self.rgb(i)).collect()
    }

    /// Number of pixels per palette index.
    pub fn population(&self) -> Vec<usize> {
        let mut counts = vec![0; self.palette.size()];
        for index in self.map.as_slice() {
            counts[*index as usize] += 1;
        }
        counts
    }

    pub fn entries(&self) -> Vec<PaletteEntry> {
        self.population()
            .into_iter()
            .enumerate()
            .map(|(index, population)| PaletteEntry {
                index,
                population,
                rgb: self.rgb(index),
                center: self.palette.get(index).as_slice().to_vec(),
            })
            .collect()
    }
}

/// Runs the palette rounds over an image.
pub struct Quantizer {
    config: QuantizeConfig,
    pool: ThreadPool,
    processor: ClassifyProcessor,
}

impl Quantizer {
    pub fn new(config: QuantizeConfig) -> Result<Self, QuantizeError> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new().num_threads(config.num_threads()).build()?;
        Ok(Self {
            config,
            pool,
            processor: ClassifyProcessor::new(),
        })
    }

    pub fn config(&self) -> &QuantizeConfig {
        &self.config
    }

    pub fn run(&self, pixels: &PixelBuffer) -> Result<Quantization, QuantizeError> {
        let palette = Palette::with_config(&self.config)?;
        self.run_with_palette(pixels, palette)
    }

    /// Run the rounds starting from a caller-supplied palette.
    ///
    /// The palette's own options are replaced by the ones in the config.
    pub fn run_with_palette(
        &self,
        pixels: &PixelBuffer,
        mut palette: Palette,
    ) -> Result<Quantization, QuantizeError> {
        if pixels.is_empty() {
            return Err(QuantizeError::EmptyImage);
        }
        if palette.dimension() != DIMENSION {
            return Err(VectorError::DimensionMismatch {
                left: palette.dimension(),
                right: DIMENSION,
            }
            .into());
        }

        palette.set_options(self.config.palette_options());
        let mut map = AssignmentMap::with_bounds(pixels.bounds());
        info!(
            "Quantizing {}x{} pixels to {} colors ({:?} metric, {:?} stop, {} rounds max, {} threads)",
            pixels.width(),
            pixels.height(),
            palette.size(),
            self.config.metric,
            self.config.stop,
            self.config.rounds,
            self.pool.current_num_threads()
        );

        let mut rounds: Vec<RoundStats> = Vec::with_capacity(self.config.rounds + 1);
        for round in 1..=self.config.rounds {
            let last = round == self.config.rounds;
            let allow_split = !(last && self.config.skip_final_split);
            let stats = self.round(round, &mut palette, pixels, &mut map, allow_split);
            rounds.push(stats);

            if self.config.stop == StopPolicy::Converge && stats.shifted == 0 && stats.splits == 0 {
                info!("Converged after {} rounds", round);
                break;
            }
        }

        // Sorting during split leaves the map pointing at old positions.
        if rounds.last().map_or(false, |s| s.reordered) {
            debug!("Last round reordered entries; running a closing round");
            let stats = self.round(rounds.len() + 1, &mut palette, pixels, &mut map, false);
            rounds.push(stats);
        }

        debug!("Final palette:\n{}", palette);
        Ok(Quantization { palette, map, rounds })
    }

    fn round(
        &self,
        round: usize,
        palette: &mut Palette,
        pixels: &PixelBuffer,
        map: &mut AssignmentMap,
        allow_split: bool,
    ) -> RoundStats {
        let start = Instant::now();

        self.pool.install(|| self.processor.run(palette, pixels, map));
        let occupied = palette.occupied();
        let shifted = palette.shift();
        debug!("Round {} palette:\n{}", round, palette);
        let (splits, reordered) = if allow_split {
            let sorted = palette.is_sorted_by_population();
            let splits = palette.split();
            (splits, splits > 0 || !sorted)
        } else {
            (0, false)
        };
        palette.reset();

        let stats = RoundStats {
            round,
            shifted,
            splits,
            reordered,
            occupied,
            elapsed_ms: start.elapsed().as_millis(),
        };
        info!(
            "Round {}: shifted={} splits={} occupied={}/{} ({} ms)",
            round,
            shifted,
            splits,
            occupied,
            palette.size(),
            stats.elapsed_ms
        );
        stats
    }
}
