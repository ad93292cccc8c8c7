pub mod reconstruct;

pub use reconstruct::{render, save_png};
