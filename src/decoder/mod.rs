pub mod image_loader;
pub mod pixel_buffer;

pub use pixel_buffer::PixelBuffer;
