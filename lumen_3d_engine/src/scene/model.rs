//! Model - drawable geometry supplied by the asset layer
//!
//! The renderer never creates or parses models. It writes the per-frame
//! transform through `transform_binding()` and binds the buffers and
//! descriptor sets exposed here.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use crate::device::{
    BufferHandle, DescriptorSet, Format, IndexType, MemoryHandle, VertexAttribute, VertexLayout,
};

/// Interleaved vertex consumed by the geometry pipelines
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Vertex>() as u32,
            attributes: vec![
                VertexAttribute { location: 0, format: Format::R32G32B32_SFLOAT, offset: 0 },
                VertexAttribute { location: 1, format: Format::R32G32B32_SFLOAT, offset: 12 },
                VertexAttribute { location: 2, format: Format::R32G32_SFLOAT, offset: 24 },
            ],
        }
    }
}

/// Per-model block bound at set 1
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformUniform {
    pub world: Mat4,
    /// Inverse transpose of `world`
    pub normal: Mat4,
}

impl TransformUniform {
    pub fn new(world: Mat4) -> Self {
        Self {
            world,
            normal: world.inverse().transpose(),
        }
    }
}

/// Where a model's transform lives for one frame slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformBinding {
    /// Set built from the renderer's transform layout
    pub set: DescriptorSet,
    /// Host-visible memory the set reads from
    pub memory: MemoryHandle,
    pub offset: u64,
}

/// Indexed draw range with its material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mesh {
    pub index_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    /// Set built from the renderer's material layout
    pub material_set: DescriptorSet,
}

pub trait Model {
    fn vertex_buffer(&self) -> BufferHandle;
    fn index_buffer(&self) -> BufferHandle;

    fn index_type(&self) -> IndexType {
        IndexType::U32
    }

    fn transform_binding(&self, frame: usize) -> TransformBinding;
    fn world_matrix(&self) -> Mat4;
    fn meshes(&self) -> &[Mesh];
}
