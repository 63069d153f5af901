//! Unit tests for buffer.rs and image.rs

use std::sync::Arc;
use crate::device::mock_graphics_device::{MockGraphicsDevice, MockObjectKind};
use crate::device::{
    BufferDesc, BufferUsage, Extent2D, Format, GraphicsDevice, ImageAspect, ImageDesc, ImageUsage,
    MemoryProperty, SharingMode,
};
use crate::error::Lumen3dError;
use crate::resource::{Buffer, Image};

fn setup() -> (Arc<MockGraphicsDevice>, Arc<dyn GraphicsDevice>) {
    let mock = Arc::new(MockGraphicsDevice::new());
    let device: Arc<dyn GraphicsDevice> = mock.clone();
    (mock, device)
}

fn depth_desc() -> ImageDesc {
    ImageDesc {
        extent: Extent2D::new(320, 240),
        format: Format::D32_SFLOAT,
        usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::SAMPLED,
        samples: 1,
        memory: MemoryProperty::DEVICE_LOCAL,
        sharing: SharingMode::Exclusive,
    }
}

// ============================================================================
// IMAGE TESTS
// ============================================================================

#[test]
fn test_image_owns_view_image_and_memory() {
    let (mock, device) = setup();
    let image = Image::new(&device, &depth_desc(), ImageAspect::DEPTH).unwrap();

    assert!(!image.is_null());
    assert!(mock.is_live(image.view().raw()));
    assert!(mock.is_live(image.handle().raw()));
    assert!(mock.is_live(image.memory().raw()));
    assert_eq!(image.format(), Some(Format::D32_SFLOAT));
    assert_eq!(image.extent(), Extent2D::new(320, 240));
}

#[test]
fn test_image_drop_order_view_image_memory() {
    let (mock, device) = setup();
    let image = Image::new(&device, &depth_desc(), ImageAspect::DEPTH).unwrap();
    let (view, handle, memory) = (image.view(), image.handle(), image.memory());
    mock.clear_events();

    drop(image);

    assert_eq!(
        mock.events(),
        vec![
            format!("destroy ImageView {}", view.raw()),
            format!("destroy Image {}", handle.raw()),
            format!("destroy Memory {}", memory.raw()),
        ]
    );
}

#[test]
fn test_image_creation_failure_leaks_nothing() {
    let (mock, device) = setup();
    let desc = ImageDesc { extent: Extent2D::new(0, 0), ..depth_desc() };

    assert!(Image::new(&device, &desc, ImageAspect::DEPTH).is_err());
    assert_eq!(mock.total_live(), 0);
}

#[test]
fn test_null_image() {
    let image = Image::null();
    assert!(image.is_null());
    assert!(image.view().is_null());
    assert_eq!(image.format(), None);
}

// ============================================================================
// BUFFER TESTS
// ============================================================================

#[test]
fn test_buffer_write_and_drop() {
    let (mock, device) = setup();
    let desc = BufferDesc {
        size: 8,
        usage: BufferUsage::STORAGE,
        memory: MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT,
        sharing: SharingMode::Exclusive,
    };
    let buffer = Buffer::new(&device, &desc).unwrap();
    buffer.write(2, &[7, 7]).unwrap();
    assert_eq!(mock.memory_contents(buffer.memory()), vec![0, 0, 7, 7]);

    let (handle, memory) = (buffer.handle(), buffer.memory());
    drop(buffer);

    let buffer_pos = mock.event_position(&format!("destroy Buffer {}", handle.raw())).unwrap();
    let memory_pos = mock.event_position(&format!("destroy Memory {}", memory.raw())).unwrap();
    assert!(buffer_pos < memory_pos);
    assert_eq!(mock.live_count(MockObjectKind::Buffer), 0);
}

#[test]
fn test_buffer_write_overflow_rejected() {
    let (_mock, device) = setup();
    let desc = BufferDesc {
        size: 4,
        usage: BufferUsage::UNIFORM,
        memory: MemoryProperty::HOST_VISIBLE,
        sharing: SharingMode::Exclusive,
    };
    let buffer = Buffer::new(&device, &desc).unwrap();
    assert!(matches!(buffer.write(2, &[0; 4]), Err(Lumen3dError::InvalidResource(_))));
}

#[test]
fn test_null_buffer_write_rejected() {
    assert!(matches!(Buffer::null().write(0, &[1]), Err(Lumen3dError::InvalidResource(_))));
}
