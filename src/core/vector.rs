//! Fixed-dimension numeric vector
//!
//! Colors, running totals and bounding boxes are all carried as `Vector`s.
//! Binary operations require operands of equal dimension; a mismatch is a
//! programming error and panics. Use the `try_*` variants where the caller
//! wants the mismatch as a value instead.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Sub};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::VectorError;

/// Distance measure used for nearest-entry search and split geometry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    #[default]
    Euclidean,
    /// City-block distance. Cheaper, and works about as well on RGB.
    Manhattan,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Vector {
    cells: Vec<f64>,
}

impl Vector {
    pub fn new(cells: Vec<f64>) -> Self {
        Self { cells }
    }

    pub fn from_slice(cells: &[f64]) -> Self {
        Self { cells: cells.to_vec() }
    }

    pub fn zero(dimension: usize) -> Self {
        Self { cells: vec![0.0; dimension] }
    }

    /// Uniformly random point in `[0, 1)^dimension`.
    pub fn random<R: Rng + ?Sized>(dimension: usize, rng: &mut R) -> Self {
        Self {
            cells: (0..dimension).map(|_| rng.gen::<f64>()).collect(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.cells.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.cells
    }

    pub fn get(&self, i: usize) -> f64 {
        self.cells[i]
    }

    pub fn set(&mut self, i: usize, value: f64) {
        self.cells[i] = value;
    }

    pub fn is_zero(&self) -> bool {
        self.cells.iter().all(|c| *c == 0.0)
    }

    fn check(&self, other: &Vector) -> Result<(), VectorError> {
        if self.cells.len() != other.cells.len() {
            return Err(VectorError::DimensionMismatch {
                left: self.cells.len(),
                right: other.cells.len(),
            });
        }
        Ok(())
    }

    fn require(&self, other: &Vector, op: &str) {
        if let Err(e) = self.check(other) {
            panic!("Vector::{}: {}", op, e);
        }
    }

    fn zip_with(&self, other: &Vector, f: impl Fn(f64, f64) -> f64) -> Vector {
        Vector {
            cells: self
                .cells
                .iter()
                .zip(&other.cells)
                .map(|(a, b)| f(*a, *b))
                .collect(),
        }
    }

    pub fn try_add(&self, other: &Vector) -> Result<Vector, VectorError> {
        self.check(other)?;
        Ok(self.zip_with(other, |a, b| a + b))
    }

    pub fn try_sub(&self, other: &Vector) -> Result<Vector, VectorError> {
        self.check(other)?;
        Ok(self.zip_with(other, |a, b| a - b))
    }

    /// Elementwise minimum.
    pub fn min(&self, other: &Vector) -> Vector {
        self.require(other, "min");
        self.zip_with(other, f64::min)
    }

    /// Elementwise maximum.
    pub fn max(&self, other: &Vector) -> Vector {
        self.require(other, "max");
        self.zip_with(other, f64::max)
    }

    pub fn min_assign(&mut self, other: &Vector) {
        self.require(other, "min_assign");
        for (a, b) in self.cells.iter_mut().zip(&other.cells) {
            *a = a.min(*b);
        }
    }

    pub fn max_assign(&mut self, other: &Vector) {
        self.require(other, "max_assign");
        for (a, b) in self.cells.iter_mut().zip(&other.cells) {
            *a = a.max(*b);
        }
    }

    pub fn scale(&self, s: f64) -> Vector {
        Vector {
            cells: self.cells.iter().map(|c| c * s).collect(),
        }
    }

    pub fn divide(&self, s: f64) -> Vector {
        Vector {
            cells: self.cells.iter().map(|c| c / s).collect(),
        }
    }

    pub fn euclidean_norm(&self) -> f64 {
        self.cells.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    pub fn manhattan_norm(&self) -> f64 {
        self.cells.iter().map(|c| c.abs()).sum()
    }

    pub fn norm(&self, norm: Norm) -> f64 {
        match norm {
            Norm::Euclidean => self.euclidean_norm(),
            Norm::Manhattan => self.manhattan_norm(),
        }
    }

    /// Length of `self - other` without allocating the difference.
    pub fn distance(&self, other: &Vector, norm: Norm) -> f64 {
        self.require(other, "distance");
        let diffs = self.cells.iter().zip(&other.cells).map(|(a, b)| a - b);
        let d = match norm {
            Norm::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            Norm::Manhattan => diffs.map(f64::abs).sum(),
        };
        debug_assert!(!d.is_nan(), "distance between {} and {} is NaN", self, other);
        d
    }

    /// Euclidean unit vector.
    pub fn unit(&self) -> Result<Vector, VectorError> {
        self.unit_by(Norm::Euclidean)
    }

    /// Vector of length 1 under `norm`, pointing the same way as `self`.
    pub fn unit_by(&self, norm: Norm) -> Result<Vector, VectorError> {
        let n = self.norm(norm);
        if n == 0.0 || !n.is_finite() {
            return Err(VectorError::DegenerateDirection);
        }
        Ok(self.divide(n))
    }
}

impl From<Vec<f64>> for Vector {
    fn from(cells: Vec<f64>) -> Self {
        Self::new(cells)
    }
}

impl From<[f64; 3]> for Vector {
    fn from(cells: [f64; 3]) -> Self {
        Self::from_slice(&cells)
    }
}

impl Index<usize> for Vector {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.cells[i]
    }
}

impl IndexMut<usize> for Vector {
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.cells[i]
    }
}

impl<'a> Add<&'a Vector> for &'a Vector {
    type Output = Vector;

    fn add(self, other: &'a Vector) -> Vector {
        self.require(other, "add");
        self.zip_with(other, |a, b| a + b)
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, other: Vector) -> Vector {
        &self + &other
    }
}

impl<'a> Sub<&'a Vector> for &'a Vector {
    type Output = Vector;

    fn sub(self, other: &'a Vector) -> Vector {
        self.require(other, "sub");
        self.zip_with(other, |a, b| a - b)
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, other: Vector) -> Vector {
        &self - &other
    }
}

impl AddAssign<&Vector> for Vector {
    fn add_assign(&mut self, other: &Vector) {
        self.require(other, "add_assign");
        for (a, b) in self.cells.iter_mut().zip(&other.cells) {
            *a += *b;
        }
    }
}

impl Mul<f64> for &Vector {
    type Output = Vector;

    fn mul(self, s: f64) -> Vector {
        self.scale(s)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, s: f64) -> Vector {
        self.scale(s)
    }
}

impl Div<f64> for &Vector {
    type Output = Vector;

    fn div(self, s: f64) -> Vector {
        self.divide(s)
    }
}

impl Div<f64> for Vector {
    type Output = Vector;

    fn div(self, s: f64) -> Vector {
        self.divide(s)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.3}", c)?;
        }
        write!(f, "]")
    }
}
