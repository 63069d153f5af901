//! Per-frame attachments
//!
//! An attachment holds one independent resource per frame slot. Slots beyond
//! the live frame count stay null so callers can test "not present" on the
//! handle itself.

use std::sync::Arc;
use crate::error::{Lumen3dError, Lumen3dResult};
use crate::device::{
    BufferDesc, BufferHandle, BufferUsage, Extent2D, Format, GraphicsDevice, ImageAspect,
    ImageDesc, ImageHandle, ImageUsage, ImageView, MemoryHandle, MemoryProperty, SharingMode,
};
use crate::resource::{Buffer, Image};

/// Upper bound on frames in flight (triple buffering)
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

fn check_slot(slot: usize) -> Lumen3dResult<()> {
    if slot >= MAX_FRAMES_IN_FLIGHT {
        return Err(Lumen3dError::InvalidResource(format!(
            "frame slot {} out of range (max {})",
            slot, MAX_FRAMES_IN_FLIGHT
        )));
    }
    Ok(())
}

// ===== TEXTURE ATTACHMENT =====

/// Shape of every image of a texture attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureAttachmentDesc {
    pub usage: ImageUsage,
    pub format: Format,
    pub aspect: ImageAspect,
    pub samples: u32,
    pub memory: MemoryProperty,
    /// Queue families accessing the image (duplicates allowed)
    pub queue_families: Vec<u32>,
}

impl TextureAttachmentDesc {
    pub fn sharing_mode(&self) -> SharingMode {
        SharingMode::for_families(&self.queue_families)
    }

    pub fn image_desc(&self, extent: Extent2D) -> ImageDesc {
        ImageDesc {
            extent,
            format: self.format,
            usage: self.usage,
            samples: self.samples,
            memory: self.memory,
            sharing: self.sharing_mode(),
        }
    }
}

/// One image + view + memory triple per frame slot
#[derive(Debug, Default)]
pub struct TextureAttachment {
    slots: [Image; MAX_FRAMES_IN_FLIGHT],
}

impl TextureAttachment {
    pub fn null() -> Self {
        Self::default()
    }

    /// Create `frame_count` independent images; the tail stays null
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        desc: &TextureAttachmentDesc,
        extent: Extent2D,
        frame_count: usize,
    ) -> Lumen3dResult<Self> {
        let mut attachment = Self::null();
        for slot in 0..frame_count.min(MAX_FRAMES_IN_FLIGHT) {
            attachment.recreate_slot(device, slot, desc, extent)?;
        }
        Ok(attachment)
    }

    /// Replace the image of `slot`, releasing the previous one first
    pub fn recreate_slot(
        &mut self,
        device: &Arc<dyn GraphicsDevice>,
        slot: usize,
        desc: &TextureAttachmentDesc,
        extent: Extent2D,
    ) -> Lumen3dResult<()> {
        check_slot(slot)?;
        self.slots[slot] = Image::null();
        self.slots[slot] = Image::new(device, &desc.image_desc(extent), desc.aspect)?;
        Ok(())
    }

    /// Release the image of `slot`, leaving it null
    pub fn clear_slot(&mut self, slot: usize) {
        if slot < MAX_FRAMES_IN_FLIGHT {
            self.slots[slot] = Image::null();
        }
    }

    pub fn is_present(&self, slot: usize) -> bool {
        self.slots.get(slot).map_or(false, |image| !image.is_null())
    }

    pub fn image(&self, slot: usize) -> ImageHandle {
        self.slots.get(slot).map(Image::handle).unwrap_or_default()
    }

    pub fn view(&self, slot: usize) -> ImageView {
        self.slots.get(slot).map(Image::view).unwrap_or_default()
    }

    pub fn memory(&self, slot: usize) -> MemoryHandle {
        self.slots.get(slot).map(Image::memory).unwrap_or_default()
    }

    pub fn live_slots(&self) -> usize {
        self.slots.iter().filter(|image| !image.is_null()).count()
    }
}

// ===== BUFFER ATTACHMENT =====

/// Shape of every buffer of a buffer attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferAttachmentDesc {
    pub size: u64,
    pub usage: BufferUsage,
    pub memory: MemoryProperty,
    pub queue_families: Vec<u32>,
}

impl BufferAttachmentDesc {
    pub fn sharing_mode(&self) -> SharingMode {
        SharingMode::for_families(&self.queue_families)
    }

    pub fn buffer_desc(&self) -> BufferDesc {
        BufferDesc {
            size: self.size,
            usage: self.usage,
            memory: self.memory,
            sharing: self.sharing_mode(),
        }
    }
}

/// One buffer per frame slot
#[derive(Debug, Default)]
pub struct BufferAttachment {
    slots: [Buffer; MAX_FRAMES_IN_FLIGHT],
}

impl BufferAttachment {
    pub fn null() -> Self {
        Self::default()
    }

    /// Create `frame_count` independent buffers; the tail stays null
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        desc: &BufferAttachmentDesc,
        frame_count: usize,
    ) -> Lumen3dResult<Self> {
        let mut attachment = Self::null();
        for slot in 0..frame_count.min(MAX_FRAMES_IN_FLIGHT) {
            attachment.recreate_slot(device, slot, desc)?;
        }
        Ok(attachment)
    }

    pub fn recreate_slot(
        &mut self,
        device: &Arc<dyn GraphicsDevice>,
        slot: usize,
        desc: &BufferAttachmentDesc,
    ) -> Lumen3dResult<()> {
        check_slot(slot)?;
        self.slots[slot] = Buffer::null();
        self.slots[slot] = Buffer::new(device, &desc.buffer_desc())?;
        Ok(())
    }

    pub fn clear_slot(&mut self, slot: usize) {
        if slot < MAX_FRAMES_IN_FLIGHT {
            self.slots[slot] = Buffer::null();
        }
    }

    pub fn is_present(&self, slot: usize) -> bool {
        self.slots.get(slot).map_or(false, |buffer| !buffer.is_null())
    }

    pub fn slot(&self, slot: usize) -> Option<&Buffer> {
        self.slots.get(slot).filter(|buffer| !buffer.is_null())
    }

    pub fn handle(&self, slot: usize) -> BufferHandle {
        self.slots.get(slot).map(Buffer::handle).unwrap_or_default()
    }

    pub fn memory(&self, slot: usize) -> MemoryHandle {
        self.slots.get(slot).map(Buffer::memory).unwrap_or_default()
    }

    pub fn size(&self, slot: usize) -> u64 {
        self.slots.get(slot).map(Buffer::size).unwrap_or(0)
    }

    /// Write into the host-visible buffer of `slot`
    pub fn write(&self, slot: usize, offset: u64, data: &[u8]) -> Lumen3dResult<()> {
        match self.slot(slot) {
            Some(buffer) => buffer.write(offset, data),
            None => Err(Lumen3dError::InvalidResource(format!("buffer slot {} is not present", slot))),
        }
    }

    pub fn live_slots(&self) -> usize {
        self.slots.iter().filter(|buffer| !buffer.is_null()).count()
    }
}

#[cfg(test)]
#[path = "attachment_tests.rs"]
mod tests;
