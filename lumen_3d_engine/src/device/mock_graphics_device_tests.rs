//! Unit tests for MockGraphicsDevice
//!
//! The rest of the crate's tests rely on the mock's bookkeeping, so it is
//! tested on its own first.

use crate::device::mock_graphics_device::{MockGraphicsDevice, MockObjectKind};
use crate::device::{
    BufferDesc, BufferUsage, CommandBuffer, DescriptorSetLayout, Extent2D, Fence, Format,
    FormatFeatures, GraphicsDevice, ImageDesc, ImageUsage, MemoryProperty, PipelineStage,
    QueueKind, Semaphore, SemaphoreWait, SharingMode, SubmitInfo,
};
use crate::error::Lumen3dError;
use std::path::Path;

fn buffer_desc(size: u64) -> BufferDesc {
    BufferDesc {
        size,
        usage: BufferUsage::UNIFORM,
        memory: MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT,
        sharing: SharingMode::Exclusive,
    }
}

// ============================================================================
// HANDLE AND LIFETIME TRACKING
// ============================================================================

#[test]
fn test_handles_are_unique_and_non_null() {
    let device = MockGraphicsDevice::new();
    let a = device.create_semaphore().unwrap();
    let b = device.create_semaphore().unwrap();

    assert!(!a.is_null());
    assert_ne!(a, b);
    assert_eq!(device.live_count(MockObjectKind::Semaphore), 2);
}

#[test]
fn test_destroy_tracks_liveness() {
    let device = MockGraphicsDevice::new();
    let fence = device.create_fence(true).unwrap();
    assert!(device.is_live(fence.raw()));

    device.destroy_fence(fence);
    assert!(!device.is_live(fence.raw()));
    assert!(device.misuse().is_empty());
}

#[test]
fn test_double_destroy_is_reported() {
    let device = MockGraphicsDevice::new();
    let fence = device.create_fence(true).unwrap();
    device.destroy_fence(fence);
    device.destroy_fence(fence);

    assert_eq!(device.misuse().len(), 1);
}

#[test]
fn test_null_destroy_is_ignored() {
    let device = MockGraphicsDevice::new();
    device.destroy_fence(Fence::NULL);
    device.destroy_semaphore(Semaphore::NULL);

    assert!(device.misuse().is_empty());
    assert!(device.events().is_empty());
}

#[test]
fn test_image_creates_image_and_memory() {
    let device = MockGraphicsDevice::new();
    let desc = ImageDesc {
        extent: Extent2D::new(64, 64),
        format: Format::D32_SFLOAT,
        usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT,
        samples: 1,
        memory: MemoryProperty::DEVICE_LOCAL,
        sharing: SharingMode::Exclusive,
    };
    let (image, memory) = device.create_image(&desc).unwrap();

    assert_eq!(device.live_count(MockObjectKind::Image), 1);
    assert_eq!(device.live_count(MockObjectKind::Memory), 1);
    assert_eq!(device.image_desc(image), Some(desc));
    assert!(device.is_live(memory.raw()));
}

// ============================================================================
// MEMORY WRITES
// ============================================================================

#[test]
fn test_write_memory_stores_bytes_at_offset() {
    let device = MockGraphicsDevice::new();
    let (_, memory) = device.create_buffer(&buffer_desc(16)).unwrap();

    device.write_memory(memory, 4, &[1, 2, 3]).unwrap();
    assert_eq!(device.memory_contents(memory), vec![0, 0, 0, 0, 1, 2, 3]);
}

#[test]
fn test_write_to_freed_memory_fails() {
    let device = MockGraphicsDevice::new();
    let (buffer, memory) = device.create_buffer(&buffer_desc(16)).unwrap();
    device.destroy_buffer(buffer);
    device.free_memory(memory);

    assert!(matches!(device.write_memory(memory, 0, &[1]), Err(Lumen3dError::InvalidResource(_))));
}

// ============================================================================
// COMMAND RECORDING AND SUBMISSION
// ============================================================================

#[test]
fn test_commands_recorded_per_command_buffer() {
    let device = MockGraphicsDevice::new();
    let cb = device.allocate_command_buffer(QueueKind::Compute).unwrap();

    device.begin_command_buffer(cb).unwrap();
    device.cmd_dispatch(cb, 4, 3, 1);
    device.end_command_buffer(cb).unwrap();

    assert_eq!(device.commands(cb), vec!["begin", "dispatch 4 3 1", "end"]);
    assert_eq!(device.begin_count(cb), 1);
    assert_eq!(device.command_buffer_queue(cb), Some(QueueKind::Compute));

    device.reset_command_buffer(cb).unwrap();
    assert!(device.commands(cb).is_empty());
}

#[test]
fn test_submit_rejects_dead_command_buffer() {
    let device = MockGraphicsDevice::new();
    let submit = SubmitInfo {
        command_buffers: vec![CommandBuffer(999)],
        ..SubmitInfo::default()
    };
    assert!(device.queue_submit(QueueKind::Graphics, &submit).is_err());
}

#[test]
fn test_submit_rejects_empty_stage_mask() {
    let device = MockGraphicsDevice::new();
    let cb = device.allocate_command_buffer(QueueKind::Graphics).unwrap();
    let semaphore = device.create_semaphore().unwrap();
    let submit = SubmitInfo {
        command_buffers: vec![cb],
        waits: vec![SemaphoreWait { semaphore, stage: PipelineStage::empty() }],
        ..SubmitInfo::default()
    };
    assert!(device.queue_submit(QueueKind::Graphics, &submit).is_err());
    assert!(device.submissions().is_empty());
}

// ============================================================================
// CONFIGURABLE FAILURES
// ============================================================================

#[test]
fn test_fence_timeout() {
    let device = MockGraphicsDevice::new();
    let fence = device.create_fence(true).unwrap();
    device.set_fence_timeout(true);

    assert_eq!(device.wait_for_fences(&[fence], 1), Err(Lumen3dError::FenceTimeout));
}

#[test]
fn test_missing_shader() {
    let device = MockGraphicsDevice::new();
    device.set_missing_shader("depth.vert.spv");

    assert!(matches!(
        device.load_shader(Path::new("shaders/depth.vert.spv")),
        Err(Lumen3dError::ShaderNotFound(_))
    ));
    assert!(device.load_shader(Path::new("shaders/forward.vert.spv")).is_ok());
}

#[test]
fn test_unsupported_format() {
    let device = MockGraphicsDevice::new();
    device.set_unsupported_format(Format::D32_SFLOAT);

    assert_eq!(device.format_features(Format::D32_SFLOAT), FormatFeatures::empty());
    assert_eq!(device.format_features(Format::D16_UNORM), FormatFeatures::all());
}

#[test]
fn test_descriptor_capacity() {
    let device = MockGraphicsDevice::new();
    device.set_descriptor_capacity(1);
    let layout: DescriptorSetLayout = device.create_descriptor_set_layout(&[]).unwrap();

    let first = device.allocate_descriptor_set(layout, &[]).unwrap();
    assert_eq!(device.allocate_descriptor_set(layout, &[]), Err(Lumen3dError::DescriptorPoolExhausted));

    device.free_descriptor_set(first);
    assert!(device.allocate_descriptor_set(layout, &[]).is_ok());
}
