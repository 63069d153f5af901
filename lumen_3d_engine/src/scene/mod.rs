//! Scene collaborators consumed by the renderer
//!
//! Models, camera and lights are owned by the caller. The renderer only reads
//! them each frame to fill its uniform and light buffers and to bind draws.

pub mod camera;
pub mod light;
pub mod model;

#[cfg(test)]
pub mod mock_model;

pub use camera::{Camera, CameraUniform};
pub use light::{clamp_lights, PointLight, MAX_LIGHTS};
pub use model::{Mesh, Model, TransformBinding, TransformUniform, Vertex};

/// Everything the renderer reads to draw one frame
#[derive(Clone, Copy)]
pub struct FrameInput<'a> {
    pub camera: &'a Camera,
    pub models: &'a [&'a dyn Model],
    pub lights: &'a [PointLight],
    /// Bumped by the caller whenever the model list or its meshes change
    pub scene_version: u64,
}
