//! PresentationSurface trait - window surface and swapchain objects
//!
//! Out-of-date and suboptimal results are not errors: they are reported as
//! outcomes so the renderer can recreate the swapchain and carry on.

use crate::error::Lumen3dResult;
use crate::device::{
    Extent2D, ImageHandle, ImageUsage, Semaphore, SharingMode, SurfaceFormat, SwapchainHandle,
};

/// Presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    /// No vsync, tearing allowed
    Immediate,
    /// Vsync, newest frame replaces the queued one
    Mailbox,
    /// Vsync, strict queue
    Fifo,
    /// Vsync, late frames are presented immediately
    FifoRelaxed,
}

/// Surface limits reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// 0 means unbounded
    pub max_image_count: u32,
    /// Fixed extent imposed by the platform, if any
    pub current_extent: Option<Extent2D>,
    pub min_image_extent: Extent2D,
    pub max_image_extent: Extent2D,
}

/// Swapchain creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainCreateInfo {
    pub min_image_count: u32,
    pub format: SurfaceFormat,
    pub extent: Extent2D,
    pub present_mode: PresentMode,
    pub image_usage: ImageUsage,
    pub sharing: SharingMode,
    /// Previous swapchain for resource reuse (`NULL` on first creation)
    pub old_swapchain: SwapchainHandle,
}

/// Result of acquiring a presentable image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Image { index: u32, suboptimal: bool },
    OutOfDate,
}

/// Result of presenting an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

/// Presentation surface bound to a window
pub trait PresentationSurface: Send {
    fn capabilities(&self) -> Lumen3dResult<SurfaceCapabilities>;
    fn supported_formats(&self) -> Lumen3dResult<Vec<SurfaceFormat>>;
    fn supported_present_modes(&self) -> Lumen3dResult<Vec<PresentMode>>;

    fn create_swapchain(&mut self, info: &SwapchainCreateInfo) -> Lumen3dResult<SwapchainHandle>;
    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle);

    /// Images owned by the swapchain (not destroyed by the caller)
    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Lumen3dResult<Vec<ImageHandle>>;

    /// Acquire the next image, signaling `signal` when it is ready for rendering
    fn acquire_next_image(
        &mut self,
        swapchain: SwapchainHandle,
        timeout_ns: u64,
        signal: Semaphore,
    ) -> Lumen3dResult<AcquireOutcome>;

    /// Queue `image_index` for presentation after `waits` are signaled
    fn present(
        &mut self,
        swapchain: SwapchainHandle,
        image_index: u32,
        waits: &[Semaphore],
    ) -> Lumen3dResult<PresentOutcome>;
}
