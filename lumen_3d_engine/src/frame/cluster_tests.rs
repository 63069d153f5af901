use crate::config::CullingMode;
use crate::device::Extent2D;
use crate::scene::{PointLight, MAX_LIGHTS};
use super::*;

// ============================================================================
// GRID SIZE
// ============================================================================

#[test]
fn test_disabled_grid_is_single_cell() {
    let grid = ClusterGrid::new(CullingMode::Disabled, Extent2D::new(1920, 1080));
    assert_eq!(grid, ClusterGrid { x: 1, y: 1, z: 1 });
}

#[test]
fn test_tiled_grid_rounds_up() {
    let grid = ClusterGrid::new(CullingMode::Tiled, Extent2D::new(800, 600));
    assert_eq!(grid, ClusterGrid { x: 50, y: 38, z: 1 });

    let grid = ClusterGrid::new(CullingMode::Tiled, Extent2D::new(17, 1));
    assert_eq!(grid, ClusterGrid { x: 2, y: 1, z: 1 });
}

#[test]
fn test_clustered_grid_has_depth_slices() {
    let grid = ClusterGrid::new(CullingMode::Clustered, Extent2D::new(1920, 1080));
    assert_eq!(grid, ClusterGrid { x: 60, y: 34, z: CLUSTER_DEPTH_SLICES });
    assert_eq!(grid.count(), 60 * 34 * 12);
}

#[test]
fn test_buffer_sizes() {
    let grid = ClusterGrid { x: 2, y: 2, z: 1 };
    assert_eq!(grid.cluster_buffer_size(), 4 * 129 * 4);
    assert_eq!(grid.frustum_buffer_size(CullingMode::Tiled), 4 * 64);
    assert_eq!(grid.frustum_buffer_size(CullingMode::Clustered), 4 * 32);
}

// ============================================================================
// LIGHT BUFFER
// ============================================================================

#[test]
fn test_header_layout() {
    assert_eq!(std::mem::size_of::<LightBufferHeader>(), 32);
    let header = LightBufferHeader::new(ClusterGrid { x: 3, y: 2, z: 1 }, 7);
    assert_eq!(header.grid, [3, 2, 1, 6]);
    assert_eq!(header.light_count, 7);
}

#[test]
fn test_light_buffer_size_holds_every_light() {
    assert_eq!(LIGHT_BUFFER_SIZE, 32 + MAX_LIGHTS as u64 * 32);
}

#[test]
fn test_light_buffer_bytes() {
    let lights = [PointLight { radius: 4.0, ..PointLight::default() }];
    let bytes = light_buffer_bytes(ClusterGrid { x: 1, y: 1, z: 1 }, &lights);

    assert_eq!(bytes.len(), 64);
    assert_eq!(&bytes[16..20], &1u32.to_ne_bytes());
    assert_eq!(&bytes[44..48], &4.0f32.to_ne_bytes());
}
