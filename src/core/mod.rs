pub mod assignment;
pub mod error;
pub mod node;
pub mod palette;
pub mod processor;
pub mod quantizer;
pub mod vector;
