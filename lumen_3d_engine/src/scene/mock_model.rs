//! Mock Model for unit tests

use glam::Mat4;
use crate::device::{BufferHandle, DescriptorSet, MemoryHandle};
use crate::scene::{Mesh, Model, TransformBinding};
use crate::resource::MAX_FRAMES_IN_FLIGHT;

/// Model with fixed handles and one transform memory block per frame slot
pub struct MockModel {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub transforms: [TransformBinding; MAX_FRAMES_IN_FLIGHT],
    pub world: Mat4,
    pub meshes: Vec<Mesh>,
}

impl MockModel {
    /// Model whose transform for slot `i` points at `memory[i]`
    pub fn new(memory: [MemoryHandle; MAX_FRAMES_IN_FLIGHT], mesh_count: u32) -> Self {
        let transforms = memory.map(|memory| TransformBinding {
            set: DescriptorSet(900),
            memory,
            offset: 0,
        });
        Self {
            vertex_buffer: BufferHandle(800),
            index_buffer: BufferHandle(801),
            transforms,
            world: Mat4::IDENTITY,
            meshes: (0..mesh_count)
                .map(|i| Mesh {
                    index_count: 36,
                    first_index: i * 36,
                    vertex_offset: 0,
                    material_set: DescriptorSet(950 + i as u64),
                })
                .collect(),
        }
    }
}

impl Model for MockModel {
    fn vertex_buffer(&self) -> BufferHandle {
        self.vertex_buffer
    }

    fn index_buffer(&self) -> BufferHandle {
        self.index_buffer
    }

    fn transform_binding(&self, frame: usize) -> TransformBinding {
        self.transforms[frame]
    }

    fn world_matrix(&self) -> Mat4 {
        self.world
    }

    fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }
}
