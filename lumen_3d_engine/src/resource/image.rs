//! Image with its view and backing memory

use std::sync::Arc;
use crate::error::Lumen3dResult;
use crate::device::{
    Extent2D, Format, GraphicsDevice, ImageAspect, ImageDesc, ImageHandle, ImageView, MemoryHandle,
};
use crate::resource::Owned;

/// GPU image, its default view and the memory bound to it
///
/// Field order is drop order: view, then image, then memory.
#[derive(Debug, Default)]
pub struct Image {
    view: Owned<ImageView>,
    image: Owned<ImageHandle>,
    memory: Owned<MemoryHandle>,
    format: Option<Format>,
    extent: Extent2D,
}

impl Image {
    pub fn new(device: &Arc<dyn GraphicsDevice>, desc: &ImageDesc, aspect: ImageAspect) -> Lumen3dResult<Self> {
        let (image, memory) = device.create_image(desc)?;
        let mut created = Self {
            view: Owned::null(),
            image: Owned::new(device, image),
            memory: Owned::new(device, memory),
            format: Some(desc.format),
            extent: desc.extent,
        };
        created.view = Owned::new(device, device.create_image_view(image, desc.format, aspect)?);
        Ok(created)
    }

    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.image.is_null()
    }

    pub fn handle(&self) -> ImageHandle {
        self.image.handle()
    }

    pub fn view(&self) -> ImageView {
        self.view.handle()
    }

    pub fn memory(&self) -> MemoryHandle {
        self.memory.handle()
    }

    pub fn format(&self) -> Option<Format> {
        self.format
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}
