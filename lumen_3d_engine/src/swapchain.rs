//! Swapchain - presentable images of a window surface
//!
//! The swapchain is re-derived from the surface capabilities and the active
//! configuration on every `recreate()`. The old swapchain is handed to the
//! platform for reuse and destroyed only once its successor exists.

use std::sync::Arc;
use crate::error::{Lumen3dError, Lumen3dResult};
use crate::config::Configuration;
use crate::device::{
    AcquireOutcome, ColorSpace, Extent2D, Format, GraphicsDevice, ImageAspect, ImageHandle,
    ImageUsage, ImageView, PresentMode, PresentOutcome, PresentationSurface, QueueKind,
    Semaphore, SharingMode, SurfaceCapabilities, SurfaceFormat, SwapchainCreateInfo,
    SwapchainHandle, FENCE_TIMEOUT_NS,
};
use crate::resource::Owned;
use crate::{engine_error, engine_info, engine_warn};

/// Surface formats accepted for presentation, in order of preference
pub const ACCEPTED_SURFACE_FORMATS: [SurfaceFormat; 4] = [
    SurfaceFormat { format: Format::B8G8R8A8_SRGB, color_space: ColorSpace::SrgbNonlinear },
    SurfaceFormat { format: Format::R8G8B8A8_SRGB, color_space: ColorSpace::SrgbNonlinear },
    SurfaceFormat { format: Format::B8G8R8A8_UNORM, color_space: ColorSpace::SrgbNonlinear },
    SurfaceFormat { format: Format::R8G8B8A8_UNORM, color_space: ColorSpace::SrgbNonlinear },
];

// ============================================================================
// Selection helpers
// ============================================================================

/// Extent imposed by the platform, or the requested one clamped to the surface limits
pub fn choose_extent(capabilities: &SurfaceCapabilities, width: u32, height: u32) -> Extent2D {
    if let Some(extent) = capabilities.current_extent {
        return extent;
    }
    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    Extent2D::new(
        width.clamp(min.width, max.width.max(min.width)),
        height.clamp(min.height, max.height.max(min.height)),
    )
}

/// Frame count clamped to the surface image count range (max 0 = unbounded)
pub fn choose_image_count(capabilities: &SurfaceCapabilities, frame_count: u32) -> u32 {
    let count = frame_count.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Present mode for the vsync / low-latency pair
///
/// Returns the mode and whether low latency survived. Low latency maps to
/// `Mailbox` with vsync and `Immediate` without; when the platform lacks that
/// mode, low latency is dropped and the regular mode is used.
pub fn choose_present_mode(supported: &[PresentMode], vsync: bool, low_latency: bool) -> (PresentMode, bool) {
    if low_latency {
        let wanted = if vsync { PresentMode::Mailbox } else { PresentMode::Immediate };
        if supported.contains(&wanted) {
            return (wanted, true);
        }
    }
    let mode = if vsync || !supported.contains(&PresentMode::FifoRelaxed) {
        PresentMode::Fifo
    } else {
        PresentMode::FifoRelaxed
    };
    (mode, false)
}

/// First supported format that is one of the accepted pairs
pub fn choose_surface_format(supported: &[SurfaceFormat]) -> Lumen3dResult<SurfaceFormat> {
    supported
        .iter()
        .copied()
        .find(|format| ACCEPTED_SURFACE_FORMATS.contains(format))
        .ok_or_else(|| {
            engine_error!("lumen3d::Swapchain", "No accepted surface format among {:?}", supported);
            Lumen3dError::NoSupportedFormat("surface color format".to_string())
        })
}

// ============================================================================
// Swapchain
// ============================================================================

/// Swapchain and the views of its images
///
/// Field order is drop order: views go before the swapchain that owns the images.
pub struct Swapchain {
    views: Vec<Owned<ImageView>>,
    images: Vec<ImageHandle>,
    handle: SwapchainHandle,
    surface: Box<dyn PresentationSurface>,
    device: Arc<dyn GraphicsDevice>,
    format: SurfaceFormat,
    extent: Extent2D,
    present_mode: PresentMode,
}

impl Swapchain {
    /// Bind a surface; no swapchain exists until the first `recreate()`
    pub fn new(device: Arc<dyn GraphicsDevice>, surface: Box<dyn PresentationSurface>) -> Self {
        Self {
            views: Vec::new(),
            images: Vec::new(),
            handle: SwapchainHandle::NULL,
            surface,
            device,
            format: ACCEPTED_SURFACE_FORMATS[0],
            extent: Extent2D::default(),
            present_mode: PresentMode::Fifo,
        }
    }

    /// Rebuild the swapchain for `requested` at `width` x `height`
    ///
    /// Returns the configuration actually in effect: `low_latency` is cleared
    /// when the platform cannot honor it.
    pub fn recreate(&mut self, requested: &Configuration, width: u32, height: u32) -> Lumen3dResult<Configuration> {
        let capabilities = self.surface.capabilities()?;
        let extent = choose_extent(&capabilities, width, height);
        let image_count = choose_image_count(&capabilities, requested.frame_count() as u32);

        let mut effective = *requested;
        let present_modes = self.surface.supported_present_modes()?;
        let (present_mode, low_latency) =
            choose_present_mode(&present_modes, requested.vsync, requested.low_latency);
        if requested.low_latency && !low_latency {
            engine_warn!(
                "lumen3d::Swapchain",
                "Low latency unsupported with vsync={}, falling back to {:?}",
                requested.vsync, present_mode
            );
            effective = effective.without_low_latency();
        }

        let format = choose_surface_format(&self.surface.supported_formats()?)?;

        let queues = self.device.queue_assignment();
        let sharing = SharingMode::for_families(&[
            queues.family(QueueKind::Graphics),
            queues.family(QueueKind::Present),
        ]);

        let info = SwapchainCreateInfo {
            min_image_count: image_count,
            format,
            extent,
            present_mode,
            image_usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSFER_DST,
            sharing,
            old_swapchain: self.handle,
        };
        let new_handle = self.surface.create_swapchain(&info)?;

        // The old views reference images of the old swapchain
        self.views.clear();
        self.images.clear();
        let old_handle = std::mem::replace(&mut self.handle, new_handle);
        self.surface.destroy_swapchain(old_handle);

        self.images = self.surface.swapchain_images(new_handle)?;
        for &image in &self.images {
            let view = self.device.create_image_view(image, format.format, ImageAspect::COLOR)?;
            self.views.push(Owned::new(&self.device, view));
        }

        self.format = format;
        self.extent = extent;
        self.present_mode = present_mode;

        engine_info!(
            "lumen3d::Swapchain",
            "Swapchain {}x{} with {} images, {:?}, {:?}",
            extent.width, extent.height, self.images.len(), format.format, present_mode
        );
        Ok(effective)
    }

    /// Acquire the next image, signaling `signal` once it can be rendered to
    pub fn acquire(&mut self, signal: Semaphore) -> Lumen3dResult<AcquireOutcome> {
        self.surface.acquire_next_image(self.handle, FENCE_TIMEOUT_NS, signal)
    }

    /// Present `image_index` once every semaphore of `waits` is signaled
    pub fn present(&mut self, image_index: u32, waits: &[Semaphore]) -> Lumen3dResult<PresentOutcome> {
        self.surface.present(self.handle, image_index, waits)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn view(&self, index: usize) -> ImageView {
        self.views.get(index).map(Owned::handle).unwrap_or_default()
    }

    pub fn views(&self) -> Vec<ImageView> {
        self.views.iter().map(Owned::handle).collect()
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn format(&self) -> SurfaceFormat {
        self.format
    }

    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    pub fn handle(&self) -> SwapchainHandle {
        self.handle
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.views.clear();
        let handle = std::mem::take(&mut self.handle);
        self.surface.destroy_swapchain(handle);
    }
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
