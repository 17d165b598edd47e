//! Document preparation stages.
//!
//! - **sniff**: Image format detection from magic bytes
//! - **normalize**: Enhance and re-encode an image for a vision model
//! - **rasterize**: Render PDF pages to images

pub mod normalize;
pub mod rasterize;
pub mod sniff;

pub use normalize::ImageNormalizer;
pub use rasterize::{PdftocairoRasterizer, RasterPages, Rasterizer};
