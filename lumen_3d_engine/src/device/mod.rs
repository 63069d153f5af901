//! Graphics device abstraction
//!
//! Backends implement `GraphicsDevice` and `PresentationSurface`; the rest of
//! the engine only talks to these traits and the opaque handles they return.

pub mod handle;
pub mod types;
pub mod graphics_device;
pub mod surface;
pub mod queue_family;
pub mod format;

#[cfg(test)]
pub mod mock_graphics_device;
#[cfg(test)]
pub mod mock_surface;

pub use handle::*;
pub use types::*;
pub use graphics_device::{GraphicsDevice, FENCE_TIMEOUT_NS};
pub use surface::{
    PresentationSurface, PresentMode, SurfaceCapabilities, SwapchainCreateInfo,
    AcquireOutcome, PresentOutcome,
};
pub use queue_family::{QueueAssignment, QueueFamilyInfo, QueueSelector, QueueSlot};
pub use format::{select_format, select_image_format, select_buffer_format};
