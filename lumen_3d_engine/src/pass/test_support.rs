//! Shared fixture of the pass tests

use std::sync::Arc;
use crate::config::Configuration;
use crate::device::mock_graphics_device::MockGraphicsDevice;
use crate::device::mock_surface::MockSurface;
use crate::device::{Extent2D, GraphicsDevice, MemoryHandle};
use crate::frame::{AttachmentSet, ClusterGrid};
use crate::pass::{PassContext, RecordContext, ShaderLibrary};
use crate::scene::mock_model::MockModel;
use crate::scene::Model;
use crate::swapchain::Swapchain;

pub const WIDTH: u32 = 320;
pub const HEIGHT: u32 = 200;

/// Everything a pass is built from, for one configuration
pub struct PassFixture {
    pub attachments: AttachmentSet,
    pub swapchain: Swapchain,
    pub surface: MockSurface,
    pub shaders: ShaderLibrary,
    pub config: Configuration,
    pub frame_count: usize,
    pub grid: ClusterGrid,
    pub mock: Arc<MockGraphicsDevice>,
    pub device: Arc<dyn GraphicsDevice>,
}

impl PassFixture {
    pub fn new(config: Configuration) -> Self {
        let mock = Arc::new(MockGraphicsDevice::new());
        let device: Arc<dyn GraphicsDevice> = mock.clone();
        let surface = MockSurface::new();
        let mut swapchain = Swapchain::new(device.clone(), Box::new(surface.clone()));
        let config = swapchain.recreate(&config, WIDTH, HEIGHT).unwrap();
        let frame_count = config.frame_count();
        let extent = swapchain.extent();
        let grid = ClusterGrid::new(config.culling_mode, extent);
        let mut attachments = AttachmentSet::new(&device).unwrap();
        attachments
            .recreate(&device, &config, frame_count, extent, swapchain.format().format, grid)
            .unwrap();

        Self {
            attachments,
            swapchain,
            surface,
            shaders: ShaderLibrary::new("shaders"),
            config,
            frame_count,
            grid,
            mock,
            device,
        }
    }

    pub fn context(&self) -> PassContext<'_> {
        PassContext {
            device: &self.device,
            config: &self.config,
            frame_count: self.frame_count,
            attachments: &self.attachments,
            swapchain: &self.swapchain,
            shaders: &self.shaders,
            grid: self.grid,
        }
    }

    pub fn record_context<'a>(
        &'a self,
        frame: usize,
        version: u64,
        image_index: u32,
        models: &'a [&'a dyn Model],
    ) -> RecordContext<'a> {
        RecordContext {
            device: self.device.as_ref(),
            frame,
            version,
            image_index,
            extent: self.extent(),
            attachments: &self.attachments,
            models,
        }
    }

    pub fn extent(&self) -> Extent2D {
        self.swapchain.extent()
    }
}

/// Model with two meshes; transform memory is never written by the passes
pub fn model() -> MockModel {
    MockModel::new([MemoryHandle(700), MemoryHandle(701), MemoryHandle(702)], 2)
}
