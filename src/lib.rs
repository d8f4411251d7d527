//! CPU software rasterizer.
//!
//! Objects are transformed local -> world -> camera, culled against the view
//! frustum, stripped of backfaces, lit, collected into a frame polygon list,
//! clipped against the near plane and scan converted into a framebuffer with
//! a z-buffer.

pub mod color;
pub mod config;
pub mod error;
pub mod math;
pub mod pipeline;
pub mod raster;
pub mod scene;

pub use color::Color;
pub use config::{load_scene_config, SceneConfig};
pub use error::RenderError;
pub use pipeline::{FrameStats, Pipeline, PipelineConfig};
pub use raster::{FrameBuffer, ZBuffer};
pub use scene::{Scene, SceneObject};
