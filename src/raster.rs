//! Pixel output: frame and depth buffers, triangle filling and lines.

pub mod buffer;
pub mod line;
pub mod triangle;

pub use buffer::{FrameBuffer, ZBuffer};
pub use triangle::{draw_polygon, draw_triangle, Coverage, FillMode, RasterVertex};
