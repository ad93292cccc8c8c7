use rayon::prelude::*;
use rayon::slice::ChunksMut;
use serde::{Deserialize, Serialize};

/// Pixel rectangle an assignment map covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}

impl Bounds {
    pub fn new(width: usize, height: usize) -> Self {
        Self { left: 0, top: 0, width, height }
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn right(&self) -> usize {
        self.left + self.width
    }

    pub fn bottom(&self) -> usize {
        self.top + self.height
    }
}

/// Palette index currently assigned to each pixel.
///
/// Coordinates are absolute; the map subtracts `left`/`top` itself.
/// Callers must stay inside the bounds the map was created with.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentMap {
    bounds: Bounds,
    assignments: Vec<u16>,
}

impl AssignmentMap {
    pub fn create(width: usize, height: usize) -> Self {
        Self::with_bounds(Bounds::new(width, height))
    }

    pub fn with_bounds(bounds: Bounds) -> Self {
        Self {
            bounds,
            assignments: vec![0; bounds.area()],
        }
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

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        debug_assert!(
            (self.bounds.left..self.bounds.right()).contains(&x)
                && (self.bounds.top..self.bounds.bottom()).contains(&y),
            "({}, {}) outside {:?}",
            x,
            y,
            self.bounds
        );
        (y - self.bounds.top) * self.bounds.width + (x - self.bounds.left)
    }

    pub fn get(&self, x: usize, y: usize) -> usize {
        self.assignments[self.offset(x, y)] as usize
    }

    /// Panics if `index` does not fit the `u16` storage.
    pub fn set(&mut self, x: usize, y: usize, index: usize) {
        let stored = match u16::try_from(index) {
            Ok(stored) => stored,
            Err(_) => panic!("palette index {} exceeds {}", index, u16::MAX),
        };
        let offset = self.offset(x, y);
        self.assignments[offset] = stored;
    }

    /// Row-major indices, relative to the bounds.
    pub fn as_slice(&self) -> &[u16] {
        &self.assignments
    }

    pub fn as_mut_slice(&mut self) -> &mut [u16] {
        &mut self.assignments
    }

    /// Parallel chunks of `rows` whole rows each; the last chunk may be shorter.
    pub fn row_chunks_mut(&mut self, rows: usize) -> ChunksMut<'_, u16> {
        let chunk = rows.max(1) * self.bounds.width.max(1);
        self.assignments.par_chunks_mut(chunk)
    }
}
