//! Fixed-size adaptive palette
//!
//! Each entry learns one representative color. A round is
//! classify (every pixel) -> shift -> split -> reset. Entry position is the
//! color index handed out by `classify`; `split` sorts entries by
//! population, which moves every field of an entry together, so any index
//! recorded before a split is stale until the next classify pass.

use std::fmt;

use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::{QuantizeError, VectorError};
use super::node::{Accumulator, ClusterNode};
use super::vector::{Norm, Vector};
use crate::config::QuantizeConfig;

/// Indices are stored as `u16` in the assignment map.
pub const MAX_PALETTE_SIZE: usize = u16::MAX as usize + 1;

/// Channels per color (RGB).
pub const DIMENSION: usize = 3;

/// Initial centers are drawn from `[0, CHANNEL_RANGE)` per channel.
pub const CHANNEL_RANGE: f64 = 256.0;

/// Tuning knobs for the shift and split steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteOptions {
    pub metric: Norm,
    /// Split while `count[low] * imbalance_factor < count[high]`.
    pub imbalance_factor: usize,
    /// A populous entry is only split when its bounding box is wider than this.
    pub min_spread: f64,
    /// Length of the split offset along the bounding-box direction.
    pub split_fraction: f64,
    /// A center counts as shifted when it moves further than this.
    pub shift_epsilon: f64,
}

impl Default for PaletteOptions {
    fn default() -> Self {
        QuantizeConfig::default().palette_options()
    }
}

#[derive(Debug, Clone)]
pub struct Palette {
    nodes: Vec<ClusterNode>,
    options: PaletteOptions,
}

impl Palette {
    /// `size` random entries with default options, seeded from entropy.
    pub fn initialize(size: usize) -> Result<Self, QuantizeError> {
        Self::with_rng(size, PaletteOptions::default(), &mut StdRng::from_entropy())
    }

    pub fn with_config(config: &QuantizeConfig) -> Result<Self, QuantizeError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config.colors, config.palette_options(), &mut rng)
    }

    pub fn with_rng<R: Rng + ?Sized>(
        size: usize,
        options: PaletteOptions,
        rng: &mut R,
    ) -> Result<Self, QuantizeError> {
        check_size(size)?;
        let nodes = (0..size)
            .map(|_| ClusterNode::new(Vector::random(DIMENSION, rng).scale(CHANNEL_RANGE)))
            .collect();
        Ok(Self { nodes, options })
    }

    /// Palette with caller-chosen centers. All centers must share a dimension.
    pub fn from_centers(centers: Vec<Vector>, options: PaletteOptions) -> Result<Self, QuantizeError> {
        check_size(centers.len())?;
        let dimension = centers[0].dimension();
        if let Some(odd) = centers.iter().find(|c| c.dimension() != dimension) {
            return Err(VectorError::DimensionMismatch {
                left: dimension,
                right: odd.dimension(),
            }
            .into());
        }
        Ok(Self {
            nodes: centers.into_iter().map(ClusterNode::new).collect(),
            options,
        })
    }

    pub fn options(&self) -> &PaletteOptions {
        &self.options
    }

    /// Replace the shift/split tuning. Centers and statistics are kept.
    pub fn set_options(&mut self, options: PaletteOptions) {
        self.options = options;
    }

    pub fn with_options(mut self, options: PaletteOptions) -> Self {
        self.set_options(options);
        self
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn dimension(&self) -> usize {
        self.nodes[0].center.dimension()
    }

    pub fn get(&self, index: usize) -> &Vector {
        &self.nodes[index].center
    }

    pub fn count(&self, index: usize) -> usize {
        self.nodes[index].count()
    }

    pub fn stats(&self, index: usize) -> &Accumulator {
        &self.nodes[index].stats
    }

    pub fn centers(&self) -> impl Iterator<Item = &Vector> {
        self.nodes.iter().map(|n| &n.center)
    }

    /// Samples accumulated since the last reset.
    pub fn total_samples(&self) -> usize {
        self.nodes.iter().map(ClusterNode::count).sum()
    }

    /// Entries that received at least one sample since the last reset.
    pub fn occupied(&self) -> usize {
        self.nodes.iter().filter(|n| n.count() > 0).count()
    }

    pub fn is_sorted_by_population(&self) -> bool {
        self.nodes.windows(2).all(|w| w[0].count() <= w[1].count())
    }

    /// Index of the closest center. Ties go to the lowest index.
    pub fn nearest(&self, sample: &Vector) -> usize {
        let metric = self.options.metric;
        let mut best = 0;
        let mut best_distance = self.nodes[0].center.distance(sample, metric);
        for (i, node) in self.nodes.iter().enumerate().skip(1) {
            let d = node.center.distance(sample, metric);
            if d < best_distance {
                best = i;
                best_distance = d;
            }
        }
        best
    }

    /// Assign `sample` to its nearest entry and accumulate it there.
    pub fn classify(&mut self, sample: &Vector) -> usize {
        let index = self.nearest(sample);
        self.nodes[index].stats.add_sample(sample);
        index
    }

    /// Empty per-entry accumulators, sized for this palette.
    pub fn partials(&self) -> Vec<Accumulator> {
        vec![Accumulator::new(self.dimension()); self.nodes.len()]
    }

    /// Merge per-entry partial statistics gathered outside the palette.
    pub fn absorb(&mut self, partials: &[Accumulator]) {
        assert_eq!(
            partials.len(),
            self.nodes.len(),
            "partial accumulators must match the palette size"
        );
        for (node, partial) in self.nodes.iter_mut().zip(partials) {
            node.stats.merge(partial);
        }
    }

    /// Move each populated center to the mean of its samples.
    ///
    /// Returns how many centers moved further than `shift_epsilon`.
    pub fn shift(&mut self) -> usize {
        let metric = self.options.metric;
        let epsilon = self.options.shift_epsilon;
        let mut shifted = 0;
        for node in &mut self.nodes {
            if let Some(mean) = node.stats.mean() {
                if node.center.distance(&mean, metric) > epsilon {
                    shifted += 1;
                }
                node.center = mean;
            }
        }
        shifted
    }

    /// Move underpopulated centers next to overpopulated ones.
    ///
    /// Entries are sorted by ascending population first. The least populated
    /// entry is split off from the most populated one while the imbalance
    /// holds; every populous entry is considered at most once.
    /// Returns the number of splits performed.
    pub fn split(&mut self) -> usize {
        self.nodes.sort_by_key(ClusterNode::count);

        let factor = self.options.imbalance_factor;
        let mut splits = 0;
        let (mut low, mut high) = (0, self.nodes.len() - 1);
        while low < high && self.nodes[low].count().saturating_mul(factor) < self.nodes[high].count() {
            if let Some(delta) = self.split_delta(high) {
                let center = self.nodes[high].center.clone();
                self.nodes[low].center = &center - &delta;
                self.nodes[high].center = &center + &delta;
                splits += 1;
                low += 1;
            }
            high -= 1;
        }
        splits
    }

    fn split_delta(&self, index: usize) -> Option<Vector> {
        let metric = self.options.metric;
        let spread = self.nodes[index].stats.spread()?;
        if spread.norm(metric) <= self.options.min_spread {
            return None;
        }
        match spread.unit_by(metric) {
            Ok(direction) => Some(direction.scale(self.options.split_fraction)),
            Err(e) => {
                trace!("entry {} not split: {}", index, e);
                None
            }
        }
    }

    /// Clear all accumulators. Centers are kept.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.stats.clear();
        }
    }
}

fn check_size(size: usize) -> Result<(), QuantizeError> {
    if size == 0 || size > MAX_PALETTE_SIZE {
        return Err(QuantizeError::InvalidPaletteSize {
            got: size,
            max: MAX_PALETTE_SIZE,
        });
    }
    Ok(())
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            writeln!(f, "{:02}: {:06} {}", i, node.count(), node.center)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(c: &[f64]) -> Vector {
        Vector::from_slice(c)
    }

    fn palette(centers: &[[f64; 3]]) -> Palette {
        Palette::from_centers(centers.iter().map(|c| Vector::from(*c)).collect(), PaletteOptions::default())
            .unwrap()
    }

    #[test]
    fn test_initialize_within_channel_range() {
        let p = Palette::initialize(64).unwrap();
        assert_eq!(p.size(), 64);
        assert_eq!(p.total_samples(), 0);
        for c in p.centers() {
            assert_eq!(c.dimension(), DIMENSION);
            assert!(c.as_slice().iter().all(|x| (0.0..CHANNEL_RANGE).contains(x)));
        }
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(matches!(
            Palette::initialize(0),
            Err(QuantizeError::InvalidPaletteSize { got: 0, .. })
        ));
        assert!(Palette::initialize(MAX_PALETTE_SIZE + 1).is_err());
        let mixed = vec![v(&[0.0, 0.0, 0.0]), v(&[1.0, 1.0])];
        assert!(Palette::from_centers(mixed, PaletteOptions::default()).is_err());
    }

    #[test]
    fn test_seeded_palettes_match() {
        let cfg = QuantizeConfig { colors: 16, seed: Some(99), ..Default::default() };
        let a = Palette::with_config(&cfg).unwrap();
        let b = Palette::with_config(&cfg).unwrap();
        assert!(a.centers().eq(b.centers()));
    }

    #[test]
    fn test_classify_then_shift_two_entries() {
        let mut p = palette(&[[0.0, 0.0, 0.0], [10.0, 10.0, 10.0]]);
        for _ in 0..3 {
            assert_eq!(p.classify(&v(&[1.0, 1.0, 1.0])), 0);
        }
        assert_eq!(p.classify(&v(&[9.0, 9.0, 9.0])), 1);
        assert_eq!(p.count(0), 3);
        assert_eq!(p.count(1), 1);

        p.shift();
        assert_eq!(p.get(0), &v(&[1.0, 1.0, 1.0]));
        assert_eq!(p.get(1), &v(&[9.0, 9.0, 9.0]));
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let p = palette(&[[0.0, 0.0, 0.0], [2.0, 2.0, 2.0], [2.0, 2.0, 2.0]]);
        assert_eq!(p.nearest(&v(&[1.0, 1.0, 1.0])), 0);
        assert_eq!(p.nearest(&v(&[3.0, 3.0, 3.0])), 1);
    }

    #[test]
    fn test_manhattan_metric_changes_winner() {
        // Euclidean: a=sqrt(50)~7.07, b=sqrt(48)~6.93 ; Manhattan: a=10, b=12
        let centers = vec![v(&[5.0, 5.0, 0.0]), v(&[4.0, 4.0, 4.0])];
        let euclid = Palette::from_centers(centers.clone(), PaletteOptions::default()).unwrap();
        let manhattan = Palette::from_centers(
            centers,
            PaletteOptions { metric: Norm::Manhattan, ..Default::default() },
        )
        .unwrap();
        let origin = Vector::zero(3);
        assert_eq!(euclid.nearest(&origin), 1);
        assert_eq!(manhattan.nearest(&origin), 0);
    }

    #[test]
    fn test_shift_leaves_empty_entries_alone() {
        let mut p = palette(&[[0.0, 0.0, 0.0], [200.0, 200.0, 200.0]]);
        p.classify(&v(&[2.0, 4.0, 6.0]));
        p.classify(&v(&[4.0, 8.0, 0.0]));
        let shifted = p.shift();
        assert_eq!(shifted, 1);
        assert_eq!(p.get(0), &v(&[3.0, 6.0, 3.0]));
        assert_eq!(p.get(1), &v(&[200.0, 200.0, 200.0]));
        // Accumulators survive a shift.
        assert_eq!(p.count(0), 2);
    }

    #[test]
    fn test_shift_below_epsilon_is_not_counted() {
        let mut p = palette(&[[10.0, 10.0, 10.0]]);
        p.classify(&v(&[10.5, 10.0, 10.0]));
        assert_eq!(p.shift(), 0);
        assert_eq!(p.get(0), &v(&[10.5, 10.0, 10.0]));
    }

    #[test]
    fn test_split_moves_empty_entry_next_to_populous_one() {
        let mut p = palette(&[[0.0, 0.0, 0.0], [100.0, 100.0, 100.0]]);
        p.classify(&v(&[90.0, 100.0, 100.0]));
        p.classify(&v(&[110.0, 100.0, 100.0]));
        let center = p.get(1).clone();
        let delta = v(&[0.01, 0.0, 0.0]);

        assert_eq!(p.split(), 1);
        assert_eq!(p.size(), 2);
        assert_eq!(p.get(0), &(&center - &delta));
        assert_eq!(p.get(1), &(&center + &delta));
    }

    #[test]
    fn test_split_sorts_whole_entries() {
        let mut p = palette(&[[200.0, 200.0, 200.0], [0.0, 0.0, 0.0], [100.0, 100.0, 100.0]]);
        for s in [[199.0, 200.0, 200.0], [201.0, 200.0, 200.0], [200.0, 200.0, 200.0]] {
            p.classify(&Vector::from(s));
        }
        p.classify(&v(&[100.0, 100.0, 100.0]));
        p.split();
        let counts: Vec<usize> = (0..p.size()).map(|i| p.count(i)).collect();
        assert_eq!(counts, vec![0, 1, 3]);
        // Statistics travel with their entry.
        assert_eq!(p.stats(2).mean(), Some(v(&[200.0, 200.0, 200.0])));
        assert_eq!(p.stats(1).mean(), Some(v(&[100.0, 100.0, 100.0])));
    }

    #[test]
    fn test_split_skips_single_sample_entry() {
        let mut p = palette(&[[5.0, 5.0, 5.0], [250.0, 250.0, 250.0]]);
        p.classify(&v(&[5.0, 5.0, 5.0]));
        assert_eq!(p.split(), 0);
        // Sorted: the empty entry comes first, both centers untouched.
        assert_eq!(p.get(0), &v(&[250.0, 250.0, 250.0]));
        assert_eq!(p.get(1), &v(&[5.0, 5.0, 5.0]));
    }

    #[test]
    fn test_split_respects_min_spread() {
        let mut p = palette(&[[0.0, 0.0, 0.0], [100.0, 100.0, 100.0]]);
        p.classify(&v(&[99.0, 100.0, 100.0]));
        p.classify(&v(&[101.0, 100.0, 100.0]));
        assert_eq!(p.split(), 0);
        assert_eq!(p.get(0), &v(&[0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_split_stops_when_balanced() {
        let mut p = palette(&[[0.0, 0.0, 0.0], [100.0, 100.0, 100.0]]);
        for s in [[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [100.0, 100.0, 100.0], [110.0, 100.0, 100.0]] {
            p.classify(&Vector::from(s));
        }
        assert_eq!(p.split(), 0);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut p = palette(&[[0.0, 0.0, 0.0], [10.0, 10.0, 10.0]]);
        p.classify(&v(&[1.0, 2.0, 3.0]));
        p.shift();
        p.reset();
        let once = p.clone();
        p.reset();
        assert_eq!(p.total_samples(), 0);
        for i in 0..p.size() {
            assert_eq!(p.stats(i), once.stats(i));
            assert_eq!(p.get(i), once.get(i));
        }
        assert_eq!(p.get(0), &v(&[1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_absorb_matches_classify() {
        let samples = [[1.0, 2.0, 3.0], [200.0, 10.0, 5.0], [4.0, 4.0, 4.0], [180.0, 0.0, 9.0]];
        let mut serial = palette(&[[0.0, 0.0, 0.0], [255.0, 0.0, 0.0]]);
        let mut merged = serial.clone();
        let mut partials = merged.partials();
        for s in samples {
            let s = Vector::from(s);
            serial.classify(&s);
            partials[merged.nearest(&s)].add_sample(&s);
        }
        merged.absorb(&partials);
        for i in 0..serial.size() {
            assert_eq!(serial.stats(i), merged.stats(i));
        }
    }

    #[test]
    fn test_with_options_keeps_centers_and_stats() {
        let mut p = palette(&[[0.0, 0.0, 10.0], [6.0, 6.0, 0.0]]);
        p.classify(&v(&[0.0, 0.0, 0.0]));
        let options = PaletteOptions { metric: Norm::Manhattan, imbalance_factor: 10, ..Default::default() };
        let p = p.with_options(options);

        assert_eq!(p.options(), &options);
        assert_eq!(p.get(1), &v(&[6.0, 6.0, 0.0]));
        assert_eq!(p.count(1), 1);
        assert_eq!(p.nearest(&v(&[0.0, 0.0, 0.0])), 0);
    }

    #[test]
    fn test_display() {
        let mut p = palette(&[[1.0, 2.0, 3.0]]);
        p.classify(&v(&[1.0, 2.0, 3.0]));
        assert_eq!(p.to_string(), "00: 000001 [1.000, 2.000, 3.000]\n");
    }
}
