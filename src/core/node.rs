use super::vector::Vector;

/// Running statistics of the samples assigned to one palette entry since
/// the last reset.
#[derive(Clone, Debug, PartialEq)]
pub struct Accumulator {
    pub sum: Vector,
    pub count: usize,
    /// Bounding box of the samples. Only meaningful while `count > 0`.
    pub min: Vector,
    pub max: Vector,
}

impl Accumulator {
    pub fn new(dimension: usize) -> Self {
        Self {
            sum: Vector::zero(dimension),
            count: 0,
            min: Vector::zero(dimension),
            max: Vector::zero(dimension),
        }
    }

    pub fn add_sample(&mut self, sample: &Vector) {
        // First sample seeds the box, never the stale zero vector.
        if self.count > 0 {
            self.min.min_assign(sample);
            self.max.max_assign(sample);
        } else {
            self.min = sample.clone();
            self.max = sample.clone();
        }
        self.sum += sample;
        self.count += 1;
    }

    /// Fold another partial accumulator into this one.
    pub fn merge(&mut self, other: &Accumulator) {
        if other.count == 0 {
            return;
        }
        if self.count > 0 {
            self.min.min_assign(&other.min);
            self.max.max_assign(&other.max);
        } else {
            self.min = other.min.clone();
            self.max = other.max.clone();
        }
        self.sum += &other.sum;
        self.count += other.count;
    }

    pub fn clear(&mut self) {
        let dimension = self.sum.dimension();
        *self = Self::new(dimension);
    }

    pub fn mean(&self) -> Option<Vector> {
        (self.count > 0).then(|| self.sum.divide(self.count as f64))
    }

    /// Extent of the bounding box, `max - min`.
    pub fn spread(&self) -> Option<Vector> {
        (self.count > 0).then(|| &self.max - &self.min)
    }
}

/// One palette entry: its current color plus the statistics of the
/// current round.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterNode {
    pub center: Vector,
    pub stats: Accumulator,
}

impl ClusterNode {
    pub fn new(center: Vector) -> Self {
        let dimension = center.dimension();
        Self {
            center,
            stats: Accumulator::new(dimension),
        }
    }

    pub fn count(&self) -> usize {
        self.stats.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(c: &[f64]) -> Vector {
        Vector::from_slice(c)
    }

    #[test]
    fn test_first_sample_seeds_bounding_box() {
        let mut acc = Accumulator::new(3);
        acc.add_sample(&v(&[10.0, 20.0, 30.0]));
        assert_eq!(acc.min, v(&[10.0, 20.0, 30.0]));
        assert_eq!(acc.max, v(&[10.0, 20.0, 30.0]));
        assert_eq!(acc.spread(), Some(Vector::zero(3)));

        acc.add_sample(&v(&[5.0, 25.0, 30.0]));
        assert_eq!(acc.min, v(&[5.0, 20.0, 30.0]));
        assert_eq!(acc.max, v(&[10.0, 25.0, 30.0]));
        assert_eq!(acc.count, 2);
        assert_eq!(acc.mean(), Some(v(&[7.5, 22.5, 30.0])));
    }

    #[test]
    fn test_merge_matches_sequential() {
        let samples = [
            v(&[1.0, 2.0, 3.0]),
            v(&[9.0, 0.0, 4.0]),
            v(&[3.0, 7.0, 1.0]),
            v(&[2.0, 2.0, 8.0]),
        ];
        let mut whole = Accumulator::new(3);
        samples.iter().for_each(|s| whole.add_sample(s));

        let mut left = Accumulator::new(3);
        let mut right = Accumulator::new(3);
        samples[..1].iter().for_each(|s| left.add_sample(s));
        samples[1..].iter().for_each(|s| right.add_sample(s));

        let mut merged = Accumulator::new(3);
        merged.merge(&Accumulator::new(3));
        merged.merge(&left);
        merged.merge(&right);
        assert_eq!(merged, whole);
    }

    #[test]
    fn test_clear() {
        let mut acc = Accumulator::new(3);
        acc.add_sample(&v(&[1.0, 1.0, 1.0]));
        acc.clear();
        assert_eq!(acc, Accumulator::new(3));
        assert_eq!(acc.mean(), None);
        assert_eq!(acc.spread(), None);
    }
}
