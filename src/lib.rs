//! Adaptive palette quantization.
//!
//! Learns a fixed-size palette for an RGB image by repeated
//! classify / shift / split / reset rounds, then remaps every pixel to its
//! palette entry.

pub mod config;
pub mod core;
pub mod decoder;
pub mod renderer;

pub use crate::config::{QuantizeConfig, StopPolicy};
pub use crate::core::assignment::{AssignmentMap, Bounds};
pub use crate::core::error::{QuantizeError, VectorError};
pub use crate::core::palette::{Palette, PaletteOptions};
pub use crate::core::quantizer::{PaletteEntry, Quantization, Quantizer, RoundStats};
pub use crate::core::vector::{Norm, Vector};
pub use crate::decoder::PixelBuffer;
