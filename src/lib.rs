//! Rotating cube and pyramid lit by two Phong lights.
//!
//! The crate is split along the render pipeline: static geometry, shader
//! compilation and linking, named uniform resolution, and the per-frame
//! transform upload. Everything except [`render::native`] runs without a GPU
//! so the pipeline can be exercised from headless tests.

pub mod app;
pub mod geometry;
pub mod render;
pub mod scene;
pub mod shader;
pub mod transform;
pub mod uniforms;

pub use app::{FrameClock, Viewport, WindowInitError, WindowSettings};
pub use geometry::{scene_vertices, Vertex, VERTEX_COUNT};
pub use render::{start, FrameRenderer, FrameSubmission, RenderTarget, Renderer, Session};
pub use scene::{Camera, Light, Material, Scene};
pub use shader::{build_program, LinkedProgram, ShaderError, ShaderSources, ShaderStage};
pub use transform::TransformSet;
pub use uniforms::{UniformBindings, UniformLayout, UniformLocation, UniformStorage};
