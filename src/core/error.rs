use thiserror::Error;

/// Failures of the vector primitives.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VectorError {
    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("degenerate direction: cannot take the unit of a zero-length vector")]
    DegenerateDirection,
}

/// Failures surfaced by the palette engine and its round driver.
#[derive(Debug, Error)]
pub enum QuantizeError {
    #[error("palette size must be between 1 and {max}, got {got}")]
    InvalidPaletteSize { got: usize, max: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("image has no pixels")]
    EmptyImage,

    #[error("pixel buffer holds {got} bytes, expected {expected} for {width}x{height} RGB")]
    DimensionMismatch {
        got: usize,
        expected: usize,
        width: usize,
        height: usize,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Vector(#[from] VectorError),
}
