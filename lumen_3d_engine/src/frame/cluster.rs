//! Light culling grid and light buffer layout

use bytemuck::{Pod, Zeroable};
use crate::config::CullingMode;
use crate::device::Extent2D;
use crate::scene::{PointLight, MAX_LIGHTS};

/// Tile edge in pixels for tiled culling
pub const TILE_SIZE: u32 = 16;
/// Cluster edge in pixels for clustered culling
pub const CLUSTER_SIZE: u32 = 32;
/// Depth slices of the clustered grid
pub const CLUSTER_DEPTH_SLICES: u32 = 12;
/// Light indices stored per tile or cluster
pub const MAX_LIGHTS_PER_CLUSTER: u32 = 128;

/// Number of tiles or clusters along each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClusterGrid {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl ClusterGrid {
    /// Grid covering `extent` for the given culling mode
    pub fn new(mode: CullingMode, extent: Extent2D) -> Self {
        match mode {
            CullingMode::Disabled => Self { x: 1, y: 1, z: 1 },
            CullingMode::Tiled => Self {
                x: extent.width.div_ceil(TILE_SIZE).max(1),
                y: extent.height.div_ceil(TILE_SIZE).max(1),
                z: 1,
            },
            CullingMode::Clustered => Self {
                x: extent.width.div_ceil(CLUSTER_SIZE).max(1),
                y: extent.height.div_ceil(CLUSTER_SIZE).max(1),
                z: CLUSTER_DEPTH_SLICES,
            },
        }
    }

    pub fn count(&self) -> u32 {
        self.x * self.y * self.z
    }

    /// Bytes of the per-cluster light lists (a count plus the indices)
    pub fn cluster_buffer_size(&self) -> u64 {
        self.count() as u64 * (MAX_LIGHTS_PER_CLUSTER as u64 + 1) * 4
    }

    /// Bytes of the shared frustum buffer
    pub fn frustum_buffer_size(&self, mode: CullingMode) -> u64 {
        self.count() as u64 * frustum_record_size(mode)
    }
}

/// Bytes of one frustum record: four planes per tile, or an AABB per cluster
pub fn frustum_record_size(mode: CullingMode) -> u64 {
    match mode {
        CullingMode::Tiled => 64,
        CullingMode::Clustered => 32,
        CullingMode::Disabled => 0,
    }
}

/// Header at the start of every light buffer (32 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct LightBufferHeader {
    /// Cluster grid x, y, z and the total count
    pub grid: [u32; 4],
    pub light_count: u32,
    pub _pad: [u32; 3],
}

impl LightBufferHeader {
    pub fn new(grid: ClusterGrid, light_count: u32) -> Self {
        Self {
            grid: [grid.x, grid.y, grid.z, grid.count()],
            light_count,
            _pad: [0; 3],
        }
    }
}

/// Bytes of one light buffer: the header followed by `MAX_LIGHTS` lights
pub const LIGHT_BUFFER_SIZE: u64 = (std::mem::size_of::<LightBufferHeader>()
    + MAX_LIGHTS * std::mem::size_of::<PointLight>()) as u64;

/// Header and lights as uploaded to a light buffer
pub fn light_buffer_bytes(grid: ClusterGrid, lights: &[PointLight]) -> Vec<u8> {
    let header = LightBufferHeader::new(grid, lights.len() as u32);
    let mut bytes = Vec::with_capacity(std::mem::size_of::<LightBufferHeader>() + std::mem::size_of_val(lights));
    bytes.extend_from_slice(bytemuck::bytes_of(&header));
    bytes.extend_from_slice(bytemuck::cast_slice(lights));
    bytes
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
