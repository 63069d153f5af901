//! Unit tests for attachment.rs

use std::sync::Arc;
use crate::device::mock_graphics_device::{MockGraphicsDevice, MockObjectKind};
use crate::device::{
    BufferUsage, Extent2D, Format, GraphicsDevice, ImageAspect, ImageUsage, MemoryProperty,
    SharingMode,
};
use crate::resource::{
    BufferAttachment, BufferAttachmentDesc, TextureAttachment, TextureAttachmentDesc,
    MAX_FRAMES_IN_FLIGHT,
};

fn setup() -> (Arc<MockGraphicsDevice>, Arc<dyn GraphicsDevice>) {
    let mock = Arc::new(MockGraphicsDevice::new());
    let device: Arc<dyn GraphicsDevice> = mock.clone();
    (mock, device)
}

fn depth_desc(queue_families: Vec<u32>) -> TextureAttachmentDesc {
    TextureAttachmentDesc {
        usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::SAMPLED,
        format: Format::D32_SFLOAT,
        aspect: ImageAspect::DEPTH,
        samples: 1,
        memory: MemoryProperty::DEVICE_LOCAL,
        queue_families,
    }
}

fn light_desc(queue_families: Vec<u32>) -> BufferAttachmentDesc {
    BufferAttachmentDesc {
        size: 256,
        usage: BufferUsage::STORAGE,
        memory: MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT,
        queue_families,
    }
}

// ============================================================================
// SHARING MODE
// ============================================================================

#[test]
fn test_sharing_mode_deduplicates_families() {
    assert_eq!(depth_desc(vec![]).sharing_mode(), SharingMode::Exclusive);
    assert_eq!(depth_desc(vec![0]).sharing_mode(), SharingMode::Exclusive);
    assert_eq!(depth_desc(vec![0, 0, 0]).sharing_mode(), SharingMode::Exclusive);
    assert_eq!(depth_desc(vec![2, 0, 2]).sharing_mode(), SharingMode::Concurrent(vec![0, 2]));
    assert_eq!(light_desc(vec![1, 1]).sharing_mode(), SharingMode::Exclusive);
    assert_eq!(light_desc(vec![1, 0]).sharing_mode(), SharingMode::Concurrent(vec![0, 1]));
}

#[test]
fn test_created_images_carry_sharing_mode() {
    let (mock, device) = setup();
    let attachment =
        TextureAttachment::new(&device, &depth_desc(vec![0, 0]), Extent2D::new(8, 8), 1).unwrap();
    let desc = mock.image_desc(attachment.image(0)).unwrap();
    assert_eq!(desc.sharing, SharingMode::Exclusive);

    let attachment =
        TextureAttachment::new(&device, &depth_desc(vec![0, 1]), Extent2D::new(8, 8), 1).unwrap();
    let desc = mock.image_desc(attachment.image(0)).unwrap();
    assert_eq!(desc.sharing, SharingMode::Concurrent(vec![0, 1]));
}

// ============================================================================
// SLOT MANAGEMENT
// ============================================================================

#[test]
fn test_texture_attachment_tail_is_null() {
    let (mock, device) = setup();
    let attachment =
        TextureAttachment::new(&device, &depth_desc(vec![0]), Extent2D::new(64, 32), 2).unwrap();

    assert!(attachment.is_present(0));
    assert!(attachment.is_present(1));
    assert!(!attachment.is_present(2));
    assert!(attachment.view(2).is_null());
    assert!(attachment.view(MAX_FRAMES_IN_FLIGHT + 4).is_null());
    assert_eq!(attachment.live_slots(), 2);
    assert_eq!(mock.live_count(MockObjectKind::Image), 2);
    assert_ne!(attachment.image(0), attachment.image(1));
}

#[test]
fn test_recreate_slot_releases_previous_image() {
    let (mock, device) = setup();
    let desc = depth_desc(vec![0]);
    let mut attachment = TextureAttachment::new(&device, &desc, Extent2D::new(64, 32), 2).unwrap();
    let old = attachment.image(1);
    let untouched = attachment.image(0);

    attachment.recreate_slot(&device, 1, &desc, Extent2D::new(128, 64)).unwrap();

    assert!(!mock.is_live(old.raw()));
    assert_eq!(attachment.image(0), untouched);
    assert_eq!(mock.image_desc(attachment.image(1)).unwrap().extent, Extent2D::new(128, 64));
    assert_eq!(mock.live_count(MockObjectKind::Image), 2);
}

#[test]
fn test_clear_slot() {
    let (mock, device) = setup();
    let mut attachment =
        TextureAttachment::new(&device, &depth_desc(vec![0]), Extent2D::new(4, 4), 3).unwrap();

    attachment.clear_slot(2);
    attachment.clear_slot(2);
    attachment.clear_slot(7);

    assert_eq!(attachment.live_slots(), 2);
    assert_eq!(mock.live_count(MockObjectKind::ImageView), 2);
    assert!(mock.misuse().is_empty());
}

#[test]
fn test_out_of_range_slot_rejected() {
    let (_mock, device) = setup();
    let mut attachment = TextureAttachment::null();
    assert!(attachment
        .recreate_slot(&device, MAX_FRAMES_IN_FLIGHT, &depth_desc(vec![0]), Extent2D::new(4, 4))
        .is_err());
}

#[test]
fn test_buffer_attachment_slots() {
    let (mock, device) = setup();
    let mut attachment = BufferAttachment::new(&device, &light_desc(vec![0]), 3).unwrap();
    assert_eq!(attachment.live_slots(), 3);

    attachment.write(1, 0, &[9; 4]).unwrap();
    assert_eq!(mock.memory_contents(attachment.memory(1)), vec![9; 4]);

    attachment.clear_slot(2);
    assert!(attachment.write(2, 0, &[1]).is_err());
    assert_eq!(attachment.size(2), 0);
    assert_eq!(mock.live_count(MockObjectKind::Buffer), 2);
}

#[test]
fn test_drop_releases_everything() {
    let (mock, device) = setup();
    {
        let _t = TextureAttachment::new(&device, &depth_desc(vec![0]), Extent2D::new(4, 4), 3).unwrap();
        let _b = BufferAttachment::new(&device, &light_desc(vec![0]), 3).unwrap();
    }
    assert_eq!(mock.total_live(), 0);
    assert!(mock.misuse().is_empty());
}
